//! Reading frames off a parameter store link.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Word, Deserialize, LEN_TYPE_SIZE, LenType};

/// The reading half of a link, decodes one message per frame.
///
/// Keeps its own word buffer so that `recv` doesn't allocate once it has grown to the largest
/// frame seen.
pub struct FrameReceiver<R: AsyncRead + Unpin> {
    rx: R,
    buf: Vec<u32>,
}

impl<R: AsyncRead + Unpin> FrameReceiver<R> {
    /// Wraps `rx`, see `comms::channel`.
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            buf: Vec::new(),
        }
    }

    /// Waits for the next frame and decodes it out of the receiver's own buffer.
    ///
    /// # Returns
    /// The decoded message, borrowing from the receiver until it's dropped.
    pub async fn recv<'a, T>(&'a mut self) -> io::Result<T>
    where
        T: Deserialize<'a>,
    {
        let Self { rx, buf } = self;
        read_frame(rx, buf).await
    }

    /// Waits for the next frame and decodes it out of `buf`.
    ///
    /// Lets the caller keep a message such as a `Values` payload while the receiver is used
    /// again.
    ///
    /// # Arguments
    /// * `buf` - The words the frame is read into, the message borrows from them.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Word,
    {
        read_frame(&mut self.rx, buf).await
    }
}

/// Reads one length prefixed frame from `rx` into `buf` and deserializes it.
async fn read_frame<'buf, R, T, B>(rx: &mut R, buf: &'buf mut Vec<B>) -> io::Result<T>
where
    R: AsyncRead + Unpin,
    T: Deserialize<'buf>,
    B: Word,
{
    let mut size_buf = [0; LEN_TYPE_SIZE];
    rx.read_exact(&mut size_buf).await?;
    let len = LenType::from_be_bytes(size_buf) as usize;

    buf.clear();
    buf.resize(len.div_ceil(size_of::<B>()), B::zeroed());

    let view: &mut [u8] = bytemuck::cast_slice_mut(buf.as_mut_slice());
    let body = &mut view[..len];
    rx.read_exact(body).await?;

    T::deserialize(body)
}
