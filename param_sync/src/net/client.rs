use std::io;

use comms::{
    FrameReceiver, FrameSender,
    msg::{Command, Msg, Payload},
};
use parameter_server::{ParamStore, StoreErr};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        TcpStream, ToSocketAddrs,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::Mutex,
};

type StoreResult<T> = std::result::Result<T, StoreErr>;

struct Conn<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: FrameReceiver<R>,
    tx: FrameSender<W>,
    closed: bool,
}

impl<R, W> Conn<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Sends `msg` and waits for an `Ack`.
    async fn request(&mut self, msg: &Msg<'_>) -> StoreResult<()> {
        self.send(msg).await?;

        let reply: Msg = self.rx.recv().await?;
        match reply {
            Msg::Control(Command::Ack) => Ok(()),
            other => Err(unexpected_reply(other)),
        }
    }

    async fn send(&mut self, msg: &Msg<'_>) -> StoreResult<()> {
        if self.closed {
            return Err(StoreErr::Closed);
        }

        self.tx.send(msg).await?;
        Ok(())
    }
}

/// A parameter store served by a remote `StoreServer`.
///
/// Requests are serialized over a single connection, each one waits for its reply.
pub struct RemoteStore<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    conn: Mutex<Conn<R, W>>,
}

impl RemoteStore<OwnedReadHalf, OwnedWriteHalf> {
    /// Connects to the store server listening at `addr`.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        Ok(Self::new(rx, tx))
    }
}

impl<R, W> RemoteStore<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `RemoteStore` over an established channel.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn new(rx: FrameReceiver<R>, tx: FrameSender<W>) -> Self {
        Self {
            conn: Mutex::new(Conn {
                rx,
                tx,
                closed: false,
            }),
        }
    }
}

impl<R, W> ParamStore for RemoteStore<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn create_table(&self, table: u32, shard_sizes: &[usize]) -> StoreResult<()> {
        let msg = Msg::Control(Command::CreateTable {
            table,
            shard_sizes: shard_sizes.to_vec(),
        });

        self.conn.lock().await.request(&msg).await
    }

    async fn add(&self, table: u32, shard: u32, values: &[f32], weight: f32) -> StoreResult<()> {
        let msg = Msg::Data(Payload::Add {
            table,
            shard,
            weight,
            values,
        });

        self.conn.lock().await.request(&msg).await
    }

    async fn batch_load(&self, table: u32, out: &mut [f32]) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;
        conn.send(&Msg::Control(Command::BatchLoad { table })).await?;

        let reply: Msg = conn.rx.recv().await?;
        let Msg::Data(Payload::Values(values)) = reply else {
            return Err(unexpected_reply(reply));
        };

        if values.len() != out.len() {
            return Err(StoreErr::SizeMismatch {
                what: "loaded table",
                got: values.len(),
                expected: out.len(),
            });
        }

        out.copy_from_slice(values);
        Ok(())
    }

    async fn barrier(&self) -> StoreResult<()> {
        self.conn
            .lock()
            .await
            .request(&Msg::Control(Command::Barrier))
            .await
    }

    async fn close(&self) -> StoreResult<()> {
        let mut conn = self.conn.lock().await;
        if conn.closed {
            return Ok(());
        }

        conn.send(&Msg::Control(Command::Disconnect)).await?;
        conn.closed = true;
        conn.tx.shutdown().await?;

        Ok(())
    }
}

fn unexpected_reply(msg: Msg<'_>) -> StoreErr {
    match msg {
        Msg::Err(e) => StoreErr::Remote(e.into_owned()),
        other => StoreErr::Remote(format!("unexpected reply {}", other.kind())),
    }
}
