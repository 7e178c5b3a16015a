//! Concurrent increments never lose updates.

use std::sync::Arc;

use mesh_gateway::config::{MeshConfig, Role};
use mesh_gateway::counter::{CounterStore, CounterView};

mod common;

async fn hammer(store: Arc<CounterStore>, n: usize) -> Vec<i64> {
    let handles: Vec<_> = (0..n)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.increment("hits") })
        })
        .collect();

    let mut previous = Vec::with_capacity(n);
    for handle in handles {
        previous.push(handle.await.unwrap());
    }
    previous.sort_unstable();
    previous
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_increments_are_linearizable() {
    for n in [10usize, 100, 1000] {
        let store = Arc::new(CounterStore::new());
        let previous = hammer(store.clone(), n).await;

        let expected: Vec<i64> = (0..n as i64).collect();
        assert_eq!(previous, expected, "every prior value observed exactly once (n={})", n);
        assert_eq!(store.get("hits"), n as i64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_over_http() {
    let mut config = MeshConfig::default();
    config.service.name = "m3-service".into();
    config.service.role = Role::Counter;
    let (addr, shutdown) = common::start_server(config).await;

    let client = common::client();
    let n = 100;
    let handles: Vec<_> = (0..n)
        .map(|_| {
            let client = client.clone();
            let url = format!("http://{}/counters/m1-service", addr);
            tokio::spawn(async move {
                let view: CounterView = client.post(url).send().await.unwrap().json().await.unwrap();
                view.value
            })
        })
        .collect();

    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap());
    }
    values.sort_unstable();
    assert_eq!(values, (1..=n as i64).collect::<Vec<_>>());

    let view: CounterView = client
        .get(format!("http://{}/counters/m1-service", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view.value, n as i64);

    shutdown.trigger();
}

#[tokio::test]
async fn test_reset_all_clears_every_counter() {
    let mut config = MeshConfig::default();
    config.service.role = Role::Counter;
    let (addr, shutdown) = common::start_server(config).await;
    let client = common::client();

    for key in ["a", "b", "a"] {
        client.post(format!("http://{}/counters/{}", addr, key)).send().await.unwrap();
    }
    let res = client.delete(format!("http://{}/counters", addr)).send().await.unwrap();
    assert_eq!(res.status(), 204);

    let all: Vec<CounterView> = client
        .get(format!("http://{}/counters", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(all.iter().all(|c| c.value == 0));

    shutdown.trigger();
}
