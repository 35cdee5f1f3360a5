use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Notify;
use url::Url;

/// One tenant's lifecycle state.
///
/// Stored as a bare `u8` behind an `AtomicU8` rather than behind a
/// per-`Worker` lock, so the Dispatch Handler's hot-path state read never
/// contends with the Supervisor Loop or the process-waiter. Staleness is
/// explicitly acceptable here. The Manager's notification channel is the
/// real synchronisation point for anything that must not miss a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    New = 0,
    Started = 1,
    Running = 2,
    Errored = 3,
    Finished = 4,
    Reaped = 5,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::New,
            1 => WorkerState::Started,
            2 => WorkerState::Running,
            3 => WorkerState::Errored,
            4 => WorkerState::Finished,
            _ => WorkerState::Reaped,
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::New => "new",
            WorkerState::Started => "started",
            WorkerState::Running => "running",
            WorkerState::Errored => "errored",
            WorkerState::Finished => "finished",
            WorkerState::Reaped => "reaped",
        };
        f.write_str(s)
    }
}

/// Atomic holder for [`WorkerState`], with a monotonic compare-and-set helper
/// so transitions can never be applied out of order.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(initial: WorkerState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    pub fn load(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Set the state unconditionally. Callers are responsible for only ever
    /// moving forward through the state machine.
    pub fn store(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// One-shot broadcast latch for worker readiness.
///
/// Modelled as a `Notify` (broadcasts to every current waiter on
/// `notify_waiters()`) plus an `AtomicBool` fast path so a waiter that
/// subscribes *after* the latch already fired doesn't block forever. A
/// plain `Notify` only wakes tasks that were already waiting when
/// `notify_waiters()` was called.
#[derive(Debug, Default)]
pub struct ReadySignal {
    fired: AtomicBool,
    notify: Notify,
}

impl ReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the latch. Idempotent: firing twice is a no-op. The caller only
    /// ever calls this once, but this method stays safe to call redundantly.
    pub fn fire(&self) {
        self.fired.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Wait for the latch to fire, bounded by `deadline`. Returns `true` if
    /// the latch fired before the deadline elapsed.
    pub async fn wait(&self, deadline: Duration) -> bool {
        if self.is_fired() {
            return true;
        }
        // Register interest before re-checking, so a fire() racing between
        // the is_fired() check above and notified() isn't lost.
        let notified = self.notify.notified();
        if self.is_fired() {
            return true;
        }
        tokio::time::timeout(deadline, notified).await.is_ok() || self.is_fired()
    }
}

/// One tenant's child process, proxy target, and lifecycle metadata.
///
/// Created by [`crate::manager::Manager::get`] in the `New` state; the
/// Manager spawns the child and transitions it through `Started` → `Running`
/// off the request's critical path.
pub struct Worker {
    pub name: String,
    pub port: u16,
    pub target_url: Url,
    pub state: StateCell,
    last_req_millis: AtomicI64,
    pub ready_signal: ReadySignal,
    pub http: reqwest::Client,
    child_pid: std::sync::Mutex<Option<u32>>,
}

impl Worker {
    pub fn new(name: String, port: u16, target_url: Url, http: reqwest::Client) -> Self {
        Self {
            name,
            port,
            target_url,
            state: StateCell::new(WorkerState::New),
            last_req_millis: AtomicI64::new(now_millis()),
            ready_signal: ReadySignal::new(),
            http,
            child_pid: std::sync::Mutex::new(None),
        }
    }

    pub fn set_child_pid(&self, pid: Option<u32>) {
        *self.child_pid.lock().expect("child_pid mutex poisoned") = pid;
    }

    pub fn child_pid(&self) -> Option<u32> {
        *self.child_pid.lock().expect("child_pid mutex poisoned")
    }

    /// Record a successful forward. Written only by the Dispatch Handler's
    /// Running branch; read only by the Supervisor Loop's idle scan. A racy
    /// read here is fine: the scan runs every `IdleCheck` and the write is a
    /// single word.
    pub fn touch(&self) {
        self.last_req_millis.store(now_millis(), Ordering::Relaxed);
    }

    pub fn idle_for(&self) -> Duration {
        let last = self.last_req_millis.load(Ordering::Relaxed);
        let now = now_millis();
        Duration::from_millis(now.saturating_sub(last).max(0) as u64)
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_worker() -> Worker {
        Worker::new(
            "t".to_string(),
            4200,
            Url::parse("http://127.0.0.1:4200").unwrap(),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn new_worker_starts_in_new_state() {
        let w = test_worker();
        assert_eq!(w.state.load(), WorkerState::New);
    }

    #[tokio::test]
    async fn ready_signal_fires_exactly_once_and_wakes_waiters() {
        let w = std::sync::Arc::new(test_worker());
        assert!(!w.ready_signal.is_fired());

        let waiter_handle = w.clone();
        let waiter = tokio::spawn(async move { waiter_handle.ready_signal.wait(Duration::from_secs(5)).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        w.ready_signal.fire();

        assert!(waiter.await.unwrap());
        assert!(w.ready_signal.is_fired());
    }

    #[tokio::test]
    async fn ready_signal_wait_times_out_when_never_fired() {
        let w = test_worker();
        let fired = w.ready_signal.wait(Duration::from_millis(20)).await;
        assert!(!fired);
    }

    #[tokio::test]
    async fn ready_signal_wait_returns_immediately_if_already_fired() {
        let w = test_worker();
        w.ready_signal.fire();
        let fired = w.ready_signal.wait(Duration::from_secs(5)).await;
        assert!(fired);
    }

    #[test]
    fn touch_updates_idle_duration() {
        let w = test_worker();
        assert!(w.idle_for() < Duration::from_secs(1));
        w.touch();
        assert!(w.idle_for() < Duration::from_secs(1));
    }
}
