use std::{num::NonZeroUsize, sync::Arc};

use parameter_server::{MemoryStore, ParamStore, StoreErr, StoreServer};
use param_sync::{ParamSync, RemoteStore, SyncBuilder};
use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};

type DuplexStore = RemoteStore<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

fn serve(workers: usize) -> (Arc<MemoryStore>, StoreServer, Vec<DuplexStore>) {
    const BUF_SIZE: usize = 4096;

    let store = Arc::new(MemoryStore::new(NonZeroUsize::new(workers).unwrap()));
    let mut server = StoreServer::new(Arc::clone(&store));
    let mut clients = Vec::new();

    for _ in 0..workers {
        let (sv_stream, wk_stream) = io::duplex(BUF_SIZE);

        let (rx, tx) = io::split(sv_stream);
        let (rx, tx) = comms::channel(rx, tx);
        server.spawn(rx, tx, None);

        let (rx, tx) = io::split(wk_stream);
        let (rx, tx) = comms::channel(rx, tx);
        clients.push(RemoteStore::new(rx, tx));
    }

    (store, server, clients)
}

async fn train_remotely(
    mut sync: ParamSync<DuplexStore>,
    mut params: Vec<Vec<f32>>,
    rounds: usize,
) -> Vec<Vec<f32>> {
    sync.initialize(&mut params).await.unwrap();

    for _ in 0..rounds {
        params.iter_mut().flatten().for_each(|v| *v += 1.);
        sync.sync_round(&mut params).await.unwrap();
    }

    sync.shutdown().await.unwrap();
    params
}

#[tokio::test]
async fn two_remote_workers_share_their_progress() {
    const ROUNDS: usize = 3;

    let (store, mut server, mut clients) = serve(2);
    let spec = || serde_json::from_str(r#"{ "workers": 2 }"#).unwrap();

    let b = SyncBuilder::build(spec(), Arc::new(clients.pop().unwrap())).unwrap();
    let a = SyncBuilder::build(spec(), Arc::new(clients.pop().unwrap())).unwrap();

    let (pa, pb) = tokio::join!(
        train_remotely(a, vec![vec![0., 0.]], ROUNDS),
        train_remotely(b, vec![vec![2., 2.]], ROUNDS),
    );

    server.run().await.unwrap();

    assert_eq!(pa.len(), 1);
    assert_eq!(pb.len(), 1);

    let mut out = [0.; 2];
    store.batch_load(0, &mut out).await.unwrap();
    assert_eq!(out, [1. + 2. * ROUNDS as f32; 2]);
}

#[tokio::test]
async fn remote_errors_are_surfaced() {
    let (_, mut server, mut clients) = serve(1);
    let remote = clients.pop().unwrap();

    let err = remote.batch_load(5, &mut [0.; 2]).await.unwrap_err();
    assert!(matches!(err, StoreErr::Remote(_)));

    remote.create_table(0, &[2]).await.unwrap();
    let err = remote.add(0, 0, &[1.], 1.).await.unwrap_err();
    assert!(matches!(err, StoreErr::Remote(_)));

    remote.close().await.unwrap();
    let err = remote.barrier().await.unwrap_err();
    assert!(matches!(err, StoreErr::Closed));

    server.run().await.unwrap();
}
