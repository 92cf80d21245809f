mod align;
mod deserialize;
pub mod msg;
mod receiver;
mod sender;
mod serialize;
pub mod specs;

use tokio::io::{AsyncRead, AsyncWrite};

pub use align::Word;
pub use deserialize::Deserialize;
pub use receiver::FrameReceiver;
pub use sender::FrameSender;
pub use serialize::Serialize;

/// The frame length prefix.
type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// Splits a parameter store link into its framed halves.
///
/// # Arguments
/// * `rx` - The reading half of the link.
/// * `tx` - The writing half of the link.
pub fn channel<R, W>(rx: R, tx: W) -> (FrameReceiver<R>, FrameSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (FrameReceiver::new(rx), FrameSender::new(tx))
}
