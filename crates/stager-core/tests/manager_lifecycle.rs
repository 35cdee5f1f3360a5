//! Exercises `Manager` + `supervisor::run` against real child processes:
//! cold start, idle reap, errored child, and concurrent first touch.

use std::sync::Arc;
use std::time::Duration;

use stager_core::config::Config;
use stager_core::manager::Manager;
use stager_core::supervisor;
use stager_core::worker::WorkerState;

fn responder_path() -> String {
    env!("CARGO_BIN_EXE_fixture_responder").to_string()
}

fn config(base_port: u16, max_instances: usize, init_command: Vec<String>) -> Arc<Config> {
    Arc::new(Config {
        base_port,
        max_instances,
        init_command,
        check_delay: Duration::from_millis(20),
        check_attempts: 200,
        idle_check: Duration::from_millis(50),
        idle_time: Duration::from_millis(150),
        ..Default::default()
    })
}

async fn wait_for_state(worker: &stager_core::worker::Worker, target: WorkerState, timeout: Duration) {
    tokio::time::timeout(timeout, async {
        while worker.state.load() != target {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("worker never reached {target:?}"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cold_start_reaches_running_via_real_child() {
    let (manager, notify_rx) = Manager::new(config(23_000, 2, vec![responder_path()]));
    tokio::spawn(supervisor::run(manager.clone(), notify_rx));

    let worker = manager.get("a").await.unwrap();
    assert_eq!(worker.state.load(), WorkerState::Started);

    wait_for_state(&worker, WorkerState::Running, Duration::from_secs(5)).await;
    assert!(worker.ready_signal.is_fired());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn idle_worker_is_interrupted_and_port_is_returned() {
    let (manager, notify_rx) = Manager::new(config(23_100, 1, vec![responder_path()]));
    tokio::spawn(supervisor::run(manager.clone(), notify_rx));

    let worker = manager.get("x").await.unwrap();
    let port = worker.port;
    wait_for_state(&worker, WorkerState::Running, Duration::from_secs(5)).await;

    // idle_time is 150ms; give the idle scan (every 50ms) time to catch it.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if manager.lookup("x").await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("worker was never reaped after going idle");

    // A fresh request reuses the now-returned port.
    let second = manager.get("y").await.unwrap();
    assert_eq!(second.port, port);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn errored_child_is_eventually_reaped() {
    let (manager, notify_rx) = Manager::new(config(
        23_200,
        1,
        vec!["sh".to_string(), "-c".to_string(), "exit 1".to_string()],
    ));
    tokio::spawn(supervisor::run(manager.clone(), notify_rx));

    let worker = manager.get("bad").await.unwrap();
    wait_for_state(&worker, WorkerState::Errored, Duration::from_secs(5)).await;

    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if manager.lookup("bad").await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("errored worker was never reaped");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_concurrent_first_touches_spawn_exactly_one_worker() {
    let (manager, notify_rx) = Manager::new(config(23_300, 4, vec![responder_path()]));
    tokio::spawn(supervisor::run(manager.clone(), notify_rx));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move { manager.get("z").await.unwrap() }));
    }

    let mut workers = Vec::new();
    for handle in handles {
        workers.push(handle.await.unwrap());
    }

    let first_port = workers[0].port;
    for worker in &workers {
        assert!(Arc::ptr_eq(worker, &workers[0]));
        assert_eq!(worker.port, first_port);
    }
}
