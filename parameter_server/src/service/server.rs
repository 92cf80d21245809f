use std::{borrow::Cow, io, net::SocketAddr, sync::Arc};

use comms::{
    FrameReceiver, FrameSender,
    msg::{Command, Msg, Payload},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    task::JoinSet,
};

use crate::storage::{MemoryStore, ParamStore, StoreErr};

/// Serves a `MemoryStore` to remote workers, one task per connection.
pub struct StoreServer {
    store: Arc<MemoryStore>,
    tasks: JoinSet<io::Result<()>>,
}

impl StoreServer {
    /// Creates a new `StoreServer`.
    ///
    /// # Arguments
    /// * `store` - The store shared by every connection.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            tasks: JoinSet::new(),
        }
    }

    /// Accepts one connection per worker of the store and serves them until they disconnect.
    ///
    /// # Arguments
    /// * `listener` - A bound listener.
    pub async fn serve(mut self, listener: TcpListener) -> io::Result<()> {
        for _ in 0..self.store.workers().get() {
            let (stream, addr) = listener.accept().await?;
            info!("worker connected from {addr}");

            let (rx, tx) = stream.into_split();
            let (rx, tx) = comms::channel(rx, tx);
            self.spawn(rx, tx, Some(addr));
        }

        self.run().await
    }

    /// Waits for every connection task to finish.
    pub async fn run(&mut self) -> io::Result<()> {
        while let Some(res) = self.tasks.join_next().await {
            res??
        }

        Ok(())
    }

    /// Binds a new connection to this server and spawns its own serving task.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    /// * `peer` - The address of the peer, used for logging.
    pub fn spawn<R, W>(&mut self, rx: FrameReceiver<R>, tx: FrameSender<W>, peer: Option<SocketAddr>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        self.tasks.spawn(serve_connection(store, rx, tx, peer));
    }
}

/// Answers the requests of a single connection until it disconnects.
async fn serve_connection<R, W>(
    store: Arc<MemoryStore>,
    mut rx: FrameReceiver<R>,
    mut tx: FrameSender<W>,
    peer: Option<SocketAddr>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        let msg: Msg = match rx.recv().await {
            Ok(msg) => msg,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!("connection closed without disconnecting: peer={peer:?}");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        debug!(kind = msg.kind(); "received message");

        let res = match msg {
            Msg::Control(Command::Disconnect) => {
                info!("worker disconnected: peer={peer:?}");
                return tx.shutdown().await;
            }
            Msg::Control(Command::CreateTable { table, shard_sizes }) => {
                store.create_table(table, &shard_sizes).await
            }
            Msg::Control(Command::Barrier) => store.barrier().await,
            Msg::Control(Command::BatchLoad { table }) => {
                match load_into(&store, table, &mut buf).await {
                    Ok(()) => {
                        let reply = Msg::Data(Payload::Values(&buf));
                        tx.send(&reply).await?;
                        continue;
                    }
                    Err(e) => Err(e),
                }
            }
            Msg::Data(Payload::Add {
                table,
                shard,
                weight,
                values,
            }) => store.add(table, shard, values, weight).await,
            msg => Err(StoreErr::Remote(format!(
                "unexpected message kind {}",
                msg.kind()
            ))),
        };

        let reply = match res {
            Ok(()) => Msg::Control(Command::Ack),
            Err(e) => {
                warn!("request failed: peer={peer:?} error={e}");
                Msg::Err(Cow::Owned(e.to_string()))
            }
        };

        tx.send(&reply).await?;
    }
}

async fn load_into(store: &MemoryStore, table: u32, out: &mut Vec<f32>) -> Result<(), StoreErr> {
    out.resize(store.table_len(table)?, 0.);
    store.batch_load(table, out).await
}
