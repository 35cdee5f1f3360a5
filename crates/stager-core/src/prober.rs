use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::worker::{Worker, WorkerState};

/// Polls a freshly-spawned worker's `target_url` until it answers or the
/// attempt budget is exhausted, then fires its [`crate::worker::ReadySignal`]
/// and advances its state.
///
/// A network error (connection refused, reset, timeout) or a `5xx` response
/// both count as "not ready yet" and consume one attempt. Anything else,
/// including `4xx`, means the child is accepting connections and is promoted
/// to `Running`. The process is not expected to serve a meaningful response
/// to a bare `HEAD /`; only that it answers at all.
pub async fn probe_until_ready(worker: Arc<Worker>, check_delay: Duration, check_attempts: u32) {
    for attempt in 0..check_attempts {
        if worker.state.load() != WorkerState::Started {
            // Child exited (or was reaped) before it ever came up.
            return;
        }

        match worker
            .http
            .head(worker.target_url.clone())
            .timeout(check_delay)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_server_error() => {
                debug!(
                    worker = %worker.name,
                    attempt,
                    status = %resp.status(),
                    "worker not ready yet"
                );
            }
            Ok(resp) => {
                debug!(worker = %worker.name, attempt, status = %resp.status(), "worker ready");
                worker.state.store(WorkerState::Running);
                worker.ready_signal.fire();
                return;
            }
            Err(err) => {
                debug!(worker = %worker.name, attempt, error = %err, "probe failed");
            }
        }

        tokio::time::sleep(check_delay).await;
    }

    warn!(
        worker = %worker.name,
        attempts = check_attempts,
        "worker never became ready within the attempt budget, giving up"
    );
    // Leave state as Started: the process-waiter task will move it to
    // Errored or Finished once the child actually exits. We do not fire the
    // ready signal, so any in-flight waiter keeps waiting on the bound
    // HoldFor deadline instead.
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use url::Url;

    async fn spawn_responder(statuses: Vec<u16>) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for status in statuses {
                let (mut sock, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 1024];
                let _ = sock.read(&mut buf).await;
                let body = format!("HTTP/1.1 {status} X\r\nContent-Length: 0\r\n\r\n");
                let _ = sock.write_all(body.as_bytes()).await;
            }
        });
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    fn test_worker(url: Url) -> Arc<Worker> {
        let w = Worker::new("t".to_string(), url.port().unwrap(), url, reqwest::Client::new());
        w.state.store(WorkerState::Started);
        Arc::new(w)
    }

    #[tokio::test]
    async fn promotes_to_running_on_first_success() {
        let url = spawn_responder(vec![200]).await;
        let worker = test_worker(url);

        probe_until_ready(worker.clone(), Duration::from_millis(20), 5).await;

        assert_eq!(worker.state.load(), WorkerState::Running);
        assert!(worker.ready_signal.is_fired());
    }

    #[tokio::test]
    async fn retries_through_5xx_before_succeeding() {
        let url = spawn_responder(vec![503, 503, 200]).await;
        let worker = test_worker(url);

        probe_until_ready(worker.clone(), Duration::from_millis(10), 10).await;

        assert_eq!(worker.state.load(), WorkerState::Running);
        assert!(worker.ready_signal.is_fired());
    }

    #[tokio::test]
    async fn gives_up_after_attempt_budget_without_firing_signal() {
        // Nothing listening: every attempt is a connection error.
        let url = Url::parse("http://127.0.0.1:1").unwrap();
        let worker = test_worker(url);

        probe_until_ready(worker.clone(), Duration::from_millis(5), 3).await;

        assert_eq!(worker.state.load(), WorkerState::Started);
        assert!(!worker.ready_signal.is_fired());
    }

    #[tokio::test]
    async fn stops_early_if_worker_left_started_state() {
        let url = Url::parse("http://127.0.0.1:1").unwrap();
        let worker = test_worker(url);
        worker.state.store(WorkerState::Finished);

        probe_until_ready(worker.clone(), Duration::from_millis(5), 100).await;

        assert!(!worker.ready_signal.is_fired());
    }
}
