use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::manager::Manager;
use crate::worker::{Worker, WorkerState};

#[cfg(unix)]
fn interrupt(pid: u32) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;
    if let Err(err) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
        warn!(pid, error = %err, "failed to send SIGINT to idle worker");
    }
}

#[cfg(not(unix))]
fn interrupt(_pid: u32) {
    warn!("idle worker interruption is not supported on this platform");
}

/// Grace period a worker is allowed to linger in `Errored` before the
/// Supervisor Loop reaps it as if it had reached `Finished`. This picks a
/// small fixed window just long enough for in-flight log lines and the
/// process-exit notification to settle.
pub const ERRORED_GRACE: Duration = Duration::from_secs(3);

/// Background task owning worker cleanup and idle eviction.
///
/// Reacts to two independent triggers:
/// - the notification channel, fed by the Manager whenever a worker's state
///   changes (reaches `Running`, `Errored`, or `Finished`);
/// - a fixed `IdleCheck` tick, which scans every live worker for
///   `last_req` older than `IdleTime` and asks it to shut down.
///
/// Runs until `notify_rx` is closed (i.e. the owning `Manager` is dropped).
pub async fn run(manager: Arc<Manager>, mut notify_rx: mpsc::Receiver<Arc<Worker>>) {
    let idle_check = manager.config().idle_check;
    let idle_time = manager.config().idle_time;
    let mut ticker = tokio::time::interval(idle_check);
    // First tick fires immediately; skip it so the first real scan happens
    // after a full idle_check period, not at t=0.
    ticker.tick().await;

    loop {
        tokio::select! {
            maybe_worker = notify_rx.recv() => {
                match maybe_worker {
                    Some(worker) => handle_transition(&manager, &worker).await,
                    None => {
                        debug!("notification channel closed, supervisor loop exiting");
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                scan_idle(&manager, idle_time).await;
            }
        }
    }
}

async fn handle_transition(manager: &Arc<Manager>, worker: &Arc<Worker>) {
    match worker.state.load() {
        WorkerState::Finished => {
            info!(worker = %worker.name, "worker finished, reaping");
            manager.reap(&worker.name).await;
        }
        WorkerState::Errored => {
            warn!(worker = %worker.name, "worker errored, scheduling delayed reap");
            let manager = manager.clone();
            let worker = worker.clone();
            tokio::spawn(async move {
                tokio::time::sleep(ERRORED_GRACE).await;
                manager.reap(&worker.name).await;
            });
        }
        WorkerState::Running => {
            debug!(worker = %worker.name, "worker became ready");
        }
        other => {
            debug!(worker = %worker.name, state = %other, "transition notification ignored");
        }
    }
}

async fn scan_idle(manager: &Arc<Manager>, idle_time: Duration) {
    for worker in manager.workers_snapshot().await {
        if !matches!(worker.state.load(), WorkerState::Started | WorkerState::Running) {
            continue;
        }
        if worker.idle_for() < idle_time {
            continue;
        }
        let Some(pid) = worker.child_pid() else {
            continue;
        };
        info!(worker = %worker.name, idle = ?worker.idle_for(), "worker idle past deadline, interrupting");
        interrupt(pid);
    }
}
