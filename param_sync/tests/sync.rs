use std::{num::NonZeroUsize, sync::Arc};

use comms::specs::sync::SyncSpec;
use ndarray::{Array2, array};
use param_sync::{ParamSync, SyncBuilder, SyncErr};
use parameter_server::{MemoryStore, ParamStore};
use rand::Rng;

fn spec(json: &str) -> SyncSpec {
    serde_json::from_str(json).unwrap()
}

fn memory(workers: usize) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(NonZeroUsize::new(workers).unwrap()))
}

fn client(json: &str, store: &Arc<MemoryStore>) -> ParamSync<MemoryStore> {
    SyncBuilder::build(spec(json), Arc::clone(store)).unwrap()
}

fn train(params: &mut [Vec<f32>], step: f32) {
    params.iter_mut().flatten().for_each(|v| *v += step);
}

async fn server_values(store: &MemoryStore, len: usize) -> Vec<f32> {
    let mut out = vec![0.; len];
    store.batch_load(0, &mut out).await.unwrap();
    out
}

#[tokio::test]
async fn workers_start_from_the_average() {
    let store = memory(2);
    let mut a = client(r#"{ "workers": 2 }"#, &store);
    let mut b = client(r#"{ "workers": 2 }"#, &store);

    let mut pa: Vec<Vec<f32>> = vec![vec![1., 2.], vec![3.]];
    let mut pb: Vec<Vec<f32>> = vec![vec![3., 4.], vec![5.]];

    let (ra, rb) = tokio::join!(a.initialize(&mut pa), b.initialize(&mut pb));
    ra.unwrap();
    rb.unwrap();

    let expected = vec![vec![2., 3.], vec![4.]];
    assert_eq!(pa, expected);
    assert_eq!(pb, expected);
    assert_eq!(server_values(&store, 3).await, [2., 3., 4.]);
}

#[tokio::test]
async fn random_initial_values_are_averaged() {
    const LEN: usize = 257;

    let mut rng = rand::rng();
    let init_a: Vec<f32> = (0..LEN).map(|_| rng.random_range(-1.0..1.0)).collect();
    let init_b: Vec<f32> = (0..LEN).map(|_| rng.random_range(-1.0..1.0)).collect();

    let store = memory(2);
    let mut a = client(r#"{ "workers": 2, "pipeline": false }"#, &store);
    let mut b = client(r#"{ "workers": 2, "pipeline": false }"#, &store);

    let mut pa = vec![init_a.clone()];
    let mut pb = vec![init_b.clone()];

    let (ra, rb) = tokio::join!(a.initialize(&mut pa), b.initialize(&mut pb));
    ra.unwrap();
    rb.unwrap();

    for i in 0..LEN {
        let avg = (init_a[i] + init_b[i]) / 2.;
        assert!((pa[0][i] - avg).abs() < 1e-6, "mismatch at {i}");
        assert_eq!(pa[0][i], pb[0][i]);
    }
}

#[tokio::test]
async fn plain_rounds_adopt_the_server_values() {
    let store = memory(1);
    let mut sync = client(r#"{ "workers": 1, "pipeline": false }"#, &store);
    let mut params: Vec<Vec<f32>> = vec![vec![0., 0.], vec![1.]];

    sync.initialize(&mut params).await.unwrap();

    for round in 1..=3 {
        train(&mut params, 1.);
        sync.sync_round(&mut params).await.unwrap();

        let r = round as f32;
        assert_eq!(params, vec![vec![r, r], vec![1. + r]]);
        assert_eq!(server_values(&store, 3).await, [r, r, 1. + r]);
    }

    assert_eq!(sync.round(), 3);
    sync.shutdown().await.unwrap();
}

#[tokio::test]
async fn pipelined_rounds_lag_by_one() {
    const ROUNDS: usize = 4;

    let store = memory(1);
    let mut sync = client(r#"{ "workers": 1 }"#, &store);
    let mut params: Vec<Vec<f32>> = vec![vec![0.; 3]];

    sync.initialize(&mut params).await.unwrap();

    for round in 1..=ROUNDS {
        train(&mut params, 1.);
        sync.sync_round(&mut params).await.unwrap();

        let lagged = (round - 1) as f32;
        assert_eq!(params, vec![vec![lagged; 3]]);
    }

    sync.shutdown().await.unwrap();
    assert_eq!(server_values(&store, 3).await, [ROUNDS as f32; 3]);
}

/// Runs `workers` clients for `rounds` rounds of `+2` steps and returns the server values.
async fn final_server_values(json: &str, workers: usize, rounds: usize) -> Vec<f32> {
    let store = memory(workers);
    let mut handles = Vec::new();

    for w in 0..workers {
        let mut sync = client(json, &store);
        handles.push(tokio::spawn(async move {
            let mut params: Vec<Vec<f32>> = vec![vec![w as f32, 0.]];
            sync.initialize(&mut params).await.unwrap();

            for _ in 0..rounds {
                train(&mut params, 2.);
                sync.sync_round(&mut params).await.unwrap();
            }

            sync.shutdown().await.unwrap();
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    server_values(&store, 2).await
}

fn with_pipeline(json: &str, pipeline: bool) -> String {
    let fields = json.trim().trim_start_matches('{').trim_end_matches('}');
    format!(r#"{{ "pipeline": {pipeline}, {fields} }}"#)
}

async fn assert_pipelining_converges_alike(json: &str, workers: usize) {
    const ROUNDS: usize = 20;

    let inline = final_server_values(&with_pipeline(json, false), workers, ROUNDS).await;
    let pipelined = final_server_values(&with_pipeline(json, true), workers, ROUNDS).await;

    for (a, b) in inline.iter().zip(&pipelined) {
        assert!((a - b).abs() < 1e-3, "{json}: inline {inline:?}, pipelined {pipelined:?}");
    }
}

#[tokio::test]
async fn pipelining_does_not_lose_plain_progress() {
    assert_pipelining_converges_alike(r#"{ "workers": 1 }"#, 1).await;
    assert_pipelining_converges_alike(r#"{ "workers": 2 }"#, 2).await;
}

#[tokio::test]
async fn pipelining_does_not_lose_momentum_progress() {
    assert_pipelining_converges_alike(r#"{ "workers": 1, "momentum": 0.5 }"#, 1).await;
    assert_pipelining_converges_alike(r#"{ "workers": 2, "momentum": 0.5 }"#, 2).await;
}

#[tokio::test]
async fn pipelining_does_not_lose_elastic_progress() {
    let json = r#"{ "workers": 1, "elastic": 0.5 }"#;
    assert_pipelining_converges_alike(json, 1).await;

    let pipelined = final_server_values(&with_pipeline(json, true), 1, 20).await;
    assert_eq!(pipelined, [20., 20.]);
}

#[tokio::test]
async fn elastic_pulls_both_sides_together() {
    let store = memory(1);
    let mut sync = client(
        r#"{ "workers": 1, "pipeline": false, "elastic": 0.5 }"#,
        &store,
    );
    let mut params: Vec<Vec<f32>> = vec![vec![0.]];

    sync.initialize(&mut params).await.unwrap();
    train(&mut params, 2.);
    sync.sync_round(&mut params).await.unwrap();

    assert_eq!(params, vec![vec![1.]]);
    assert_eq!(server_values(&store, 1).await, [1.]);
}

#[tokio::test]
async fn momentum_accumulates_velocity() {
    let store = memory(1);
    let mut sync = client(
        r#"{ "workers": 1, "pipeline": false, "momentum": 0.5 }"#,
        &store,
    );
    let mut params: Vec<Vec<f32>> = vec![vec![0.]];

    sync.initialize(&mut params).await.unwrap();

    train(&mut params, 1.);
    sync.sync_round(&mut params).await.unwrap();
    assert_eq!(params, vec![vec![1.]]);

    train(&mut params, 1.);
    sync.sync_round(&mut params).await.unwrap();
    assert_eq!(params, vec![vec![2.5]]);
    assert_eq!(server_values(&store, 1).await, [2.5]);
}

#[tokio::test]
async fn warmup_damps_the_first_rounds() {
    let store = memory(1);
    let json = r#"{
        "workers": 1,
        "pipeline": false,
        "warmup": { "policy": "linearly", "coef": 0.5, "rounds": 2 }
    }"#;
    let mut sync = client(json, &store);
    let mut params: Vec<Vec<f32>> = vec![vec![0.]];

    sync.initialize(&mut params).await.unwrap();

    train(&mut params, 4.);
    sync.sync_round(&mut params).await.unwrap();
    assert_eq!(params, vec![vec![3.]]);

    train(&mut params, 4.);
    sync.sync_round(&mut params).await.unwrap();
    assert_eq!(params, vec![vec![7.]]);
}

#[tokio::test]
async fn server_values_can_be_loaded_and_restored() {
    let store = memory(1);
    let mut sync = client(r#"{ "workers": 1 }"#, &store);
    let mut params: Vec<Vec<f32>> = vec![vec![1., 2.]];

    sync.initialize(&mut params).await.unwrap();
    train(&mut params, 10.);

    sync.load_server(&mut params).await.unwrap();
    assert_eq!(params, vec![vec![1., 2.]]);

    sync.load_server(&mut params).await.unwrap();
    sync.restore_local(&mut params).unwrap();
    assert_eq!(params, vec![vec![11., 12.]]);

    let err = sync.restore_local(&mut params).unwrap_err();
    assert!(matches!(err, SyncErr::State { .. }));
}

#[tokio::test]
async fn ndarray_parameters_are_synchronized() {
    let store = memory(1);
    let mut sync = client(r#"{ "workers": 1, "pipeline": false }"#, &store);
    let mut params: Vec<Array2<f32>> = vec![
        array![[1., 2.], [3., 4.]],
        Array2::zeros((1, 3)),
    ];

    sync.initialize(&mut params).await.unwrap();
    params.iter_mut().for_each(|p| *p += 1.);
    sync.sync_round(&mut params).await.unwrap();

    assert_eq!(params[0], array![[2., 3.], [4., 5.]]);
    assert_eq!(params[1], Array2::<f32>::ones((1, 3)));
    assert_eq!(
        server_values(&store, 7).await,
        [2., 3., 4., 5., 1., 1., 1.]
    );
}

#[tokio::test]
async fn lifecycle_is_enforced() {
    let store = memory(1);
    let mut sync = client(r#"{ "workers": 1 }"#, &store);
    let mut params: Vec<Vec<f32>> = vec![vec![0.; 2]];

    let err = sync.sync_round(&mut params).await.unwrap_err();
    assert!(matches!(err, SyncErr::State { state: "uninitialized", .. }));

    sync.initialize(&mut params).await.unwrap();
    let err = sync.initialize(&mut params).await.unwrap_err();
    assert!(matches!(err, SyncErr::State { state: "initialized", .. }));

    let mut wrong: Vec<Vec<f32>> = vec![vec![0.; 3]];
    let err = sync.sync_round(&mut wrong).await.unwrap_err();
    assert!(matches!(err, SyncErr::SizeMismatch { got: 3, expected: 2, .. }));

    sync.sync_round(&mut params).await.unwrap();
    sync.shutdown().await.unwrap();
    sync.shutdown().await.unwrap();

    let err = sync.sync_round(&mut params).await.unwrap_err();
    assert!(matches!(err, SyncErr::State { state: "closed", .. }));
}

#[tokio::test]
async fn exclusive_corrections_fail_at_construction() {
    let store = memory(1);

    let res = SyncBuilder::build(
        spec(r#"{ "workers": 1, "momentum": 0.9, "elastic": 0.5 }"#),
        Arc::clone(&store),
    );

    assert!(matches!(res, Err(SyncErr::ExclusiveCorrections { .. })));
}
