use std::{env, io, num::NonZeroUsize, sync::Arc};

use log::info;
use parameter_server::{MemoryStore, StoreServer};
use tokio::{net::TcpListener, signal};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8765";

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string()),
    );

    let workers = env::var("WORKERS")
        .map_err(io::Error::other)?
        .parse()
        .map_err(io::Error::other)?;

    let Some(workers) = NonZeroUsize::new(workers) else {
        return Err(io::Error::other("WORKERS must be at least 1"));
    };

    let list = TcpListener::bind(&addr).await?;
    info!("listening at {addr}, waiting for {workers} workers");

    let server = StoreServer::new(Arc::new(MemoryStore::new(workers)));

    tokio::select! {
        ret = server.serve(list) => {
            ret?;
            info!("every worker disconnected, shutting down");
        }
        _ = signal::ctrl_c() => {
            info!("received SIGTERM");
        }
    }

    Ok(())
}
