//! Integration tests for WorkerPick
//!
//! These drive coordinators end to end against an in-memory pool.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use workerpick::{
    Config, Coordinator, CoordinatorConfig, CoordinatorHandle, InMemoryPool, PickError, PickMode, PoolServices,
    Selection, Setting, Strategy, Topic, TopicRouter, TopicSettings, WorkerHandle,
};

fn w(id: &str) -> WorkerHandle {
    WorkerHandle::new(id)
}

fn fast_ticks() -> CoordinatorConfig {
    CoordinatorConfig {
        tick_interval_ms: 20,
        ..Default::default()
    }
}

fn spawn(pool: &Arc<InMemoryPool>, topic: &str, strategy: Strategy, max_buffer_size: u64) -> CoordinatorHandle {
    Coordinator::spawn(
        Topic::named(topic),
        TopicSettings {
            strategy,
            max_buffer_size,
        },
        PoolServices::in_memory(pool.clone()),
        fast_ticks(),
    )
    .expect("Failed to spawn coordinator")
}

async fn pick_async(handle: &CoordinatorHandle) -> Selection {
    let (done_tx, done_rx) = oneshot::channel();
    handle
        .pick_async(&handle.topic().clone(), move |result| {
            let _ = done_tx.send(result);
        })
        .await
        .expect("Failed to queue pick");
    done_rx.await.expect("Callback dropped")
}

// =============================================================================
// Cold start
// =============================================================================

#[tokio::test]
async fn test_cold_start_bootstraps_then_selects() {
    let pool = Arc::new(InMemoryPool::new());
    let handle = spawn(&pool, "t", Strategy::Random, 100);
    let topic = Topic::named("t");

    let result = handle.pick_sync(&topic).await;
    assert_eq!(result, Err(PickError::Picking { topic: "t".to_string() }));
    assert_eq!(pool.provision_count(), 1);

    let info = handle.info().await.unwrap();
    assert_eq!(info.error_tally.get("t"), Some(&1));
    assert!(info.current_worker.is_none());

    // Provisioned but empty: warming up, no second bootstrap
    let result = handle.pick_sync(&topic).await;
    assert!(matches!(result, Err(PickError::Bootstrapping { .. })));
    assert_eq!(pool.provision_count(), 1);

    pool.register("t", vec![w("w1")]);
    assert_eq!(handle.pick_sync(&topic).await, Ok(w("w1")));

    let info = handle.info().await.unwrap();
    assert_eq!(info.current_worker, Some(w("w1")));
    assert!(info.timer_armed);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_async_pick_before_assignment_is_not_fatal() {
    let pool = Arc::new(InMemoryPool::new());
    let handle = spawn(&pool, "t", Strategy::StrictRoundRobin, 100);

    let result = pick_async(&handle).await;
    assert!(matches!(result, Err(PickError::Picking { .. })));

    // Coordinator is still serving
    assert!(handle.info().await.is_ok());
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_tick_bootstraps_once_while_warming() {
    let pool = Arc::new(InMemoryPool::new());
    let handle = spawn(&pool, "t", Strategy::Random, 100);

    handle.set_worker(w("seed")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // First forced pick hits NotRegistered, later ones see NotReady
    assert_eq!(pool.provision_count(), 1);
    let info = handle.info().await.unwrap();
    assert_eq!(info.current_worker, Some(w("seed")));
    assert!(info.metrics.bootstrapping_errors >= 1);
    assert_eq!(info.metrics.picking_errors, 1);

    handle.shutdown().await.unwrap();
}

// =============================================================================
// Strategies
// =============================================================================

#[tokio::test]
async fn test_strict_round_robin_rotation() {
    let pool = Arc::new(InMemoryPool::new());
    pool.register("t", vec![w("a"), w("b"), w("c")]);
    let handle = spawn(&pool, "t", Strategy::StrictRoundRobin, 100);

    handle.set_worker(w("a")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.info().await.unwrap().worker_queue.len(), 3);

    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(pick_async(&handle).await.unwrap());
    }
    let distinct: HashSet<_> = seen.iter().cloned().collect();
    assert_eq!(distinct.len(), 3);
    assert_eq!(pick_async(&handle).await.unwrap(), seen[0]);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_membership_change_replaces_queue() {
    let pool = Arc::new(InMemoryPool::new());
    pool.register("t", vec![w("a"), w("b"), w("c")]);
    let handle = spawn(&pool, "t", Strategy::StrictRoundRobin, 100);

    handle.set_worker(w("a")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    pool.remove_member("t", &w("b"));
    pool.add_member("t", w("d"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let info = handle.info().await.unwrap();
    let queue: HashSet<_> = info.worker_queue.into_iter().collect();
    assert_eq!(queue, HashSet::from([w("a"), w("c"), w("d")]));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_sticky_stays_until_threshold() {
    let pool = Arc::new(InMemoryPool::new());
    pool.register("t", vec![w("b")]);
    let handle = Coordinator::spawn(
        Topic::named("t"),
        TopicSettings {
            strategy: Strategy::StickyRoundRobin,
            max_buffer_size: 2,
        },
        PoolServices::in_memory(pool.clone()),
        CoordinatorConfig {
            tick_interval_ms: 200,
            ..Default::default()
        },
    )
    .unwrap();

    handle.set_worker(w("a")).await.unwrap();
    for _ in 0..3 {
        assert_eq!(pick_async(&handle).await, Ok(w("a")));
    }

    tokio::time::sleep(Duration::from_millis(400)).await;

    let info = handle.info().await.unwrap();
    assert_eq!(info.current_worker, Some(w("b")));
    assert_eq!(info.sticky_counter, 0);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_runtime_settings() {
    let pool = Arc::new(InMemoryPool::new());
    let handle = spawn(&pool, "t", Strategy::Random, 100);

    handle
        .set(Setting::from_key_value("strategy", "sticky_round_robin").unwrap())
        .await
        .unwrap();
    handle.set_max_buffer_size(5).await.unwrap();
    handle.set(Setting::from_key_value("compression", "gzip").unwrap()).await.unwrap();
    handle.notify(Setting::Strategy(Strategy::StrictRoundRobin)).await.unwrap();

    let info = handle.info().await.unwrap();
    assert_eq!(info.strategy, Strategy::StrictRoundRobin);
    assert_eq!(info.sticky_threshold, 5);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pick_modes() {
    let pool = Arc::new(InMemoryPool::new());
    pool.register("t", vec![w("a")]);
    let handle = spawn(&pool, "t", Strategy::Random, 100);
    let topic = Topic::named("t");

    let (tx, rx) = oneshot::channel();
    handle
        .pick(&topic, PickMode::Sync, move |r| {
            let _ = tx.send(r);
        })
        .await
        .unwrap();
    assert_eq!(rx.await.unwrap(), Ok(w("a")));

    let (tx, rx) = oneshot::channel();
    handle
        .pick(&topic, PickMode::Async, move |r| {
            let _ = tx.send(r);
        })
        .await
        .unwrap();
    assert_eq!(rx.await.unwrap(), Ok(w("a")));

    handle.shutdown().await.unwrap();
}

// =============================================================================
// Router
// =============================================================================

#[tokio::test]
async fn test_router_independent_topics() {
    let pool = Arc::new(InMemoryPool::new());
    pool.register("clicks", vec![w("c1")]);
    pool.register("views", vec![w("v1")]);

    let mut config = Config::default();
    config.coordinator = fast_ticks();
    let mut router = TopicRouter::new(config, PoolServices::in_memory(pool.clone())).unwrap();

    assert_eq!(router.pick_sync(&Topic::named("clicks")).await.unwrap(), Ok(w("c1")));
    assert_eq!(router.pick_sync(&Topic::named("views")).await.unwrap(), Ok(w("v1")));

    let result = router.pick_sync(&Topic::named("orders")).await.unwrap();
    assert!(matches!(result, Err(PickError::Picking { .. })));
    assert!(pool.is_registered("orders"));

    router.shutdown_all().await;
}

#[tokio::test]
async fn test_catch_all_coordinator() {
    let pool = Arc::new(InMemoryPool::new());
    pool.register("clicks", vec![w("c1")]);

    let mut router = TopicRouter::new(Config::default(), PoolServices::in_memory(pool.clone())).unwrap();
    let any = router.handle_for(&Topic::Any).unwrap();

    assert_eq!(any.pick_sync(&Topic::named("clicks")).await, Ok(w("c1")));

    let scoped = router.handle_for(&Topic::named("clicks")).unwrap();
    let result = scoped.pick_sync(&Topic::named("views")).await;
    assert!(matches!(result, Err(PickError::Malformed(_))));

    router.shutdown_all().await;
}

#[tokio::test]
async fn test_many_topics_concurrently() {
    let pool = Arc::new(InMemoryPool::new());
    let mut handles = Vec::new();
    for i in 0..10 {
        let name = format!("topic-{}", i);
        pool.register(&name, vec![w(&format!("w{}", i))]);
        handles.push(spawn(&pool, &name, Strategy::Random, 100));
    }

    let tasks: Vec<_> = handles
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, handle)| {
            tokio::spawn(async move {
                let topic = handle.topic().clone();
                let result = handle.pick_sync(&topic).await;
                (i, result)
            })
        })
        .collect();

    for task in tasks {
        let (i, result) = task.await.unwrap();
        assert_eq!(result, Ok(w(&format!("w{}", i))));
    }

    for handle in handles {
        handle.shutdown().await.unwrap();
    }
}
