use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use minijinja::{Environment, context};
use tokio::process::Command;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::ManagerError;
use crate::port_pool::PortPool;
use crate::prober::probe_until_ready;
use crate::worker::{Worker, WorkerState};

const DEFAULT_PROXY_TEMPLATE_NAME: &str = "proxy_format";

/// Registry state guarded by a single lock, so the invariant
/// `|workers| + |available ports| == max_instances` can never be observed
/// broken mid-update.
struct Registry {
    workers: HashMap<String, Arc<Worker>>,
    ports: PortPool,
}

/// Owns the tenant registry, the port pool, and the URL template; drives the
/// cold-start sequence that takes a tenant from unseen to a running worker.
///
/// Workers are never evicted by `Manager` itself. That is the Supervisor
/// Loop's job, reacting to the same notification channel `Manager` sends
/// state changes on.
pub struct Manager {
    config: Arc<Config>,
    registry: Mutex<Registry>,
    env: Environment<'static>,
    http: reqwest::Client,
    notify_tx: mpsc::Sender<Arc<Worker>>,
}

impl Manager {
    pub fn new(config: Arc<Config>) -> (Arc<Self>, mpsc::Receiver<Arc<Worker>>) {
        let mut env = Environment::new();
        env.add_template_owned(DEFAULT_PROXY_TEMPLATE_NAME, config.proxy_format.clone())
            .expect("proxy_format failed to compile as a minijinja template");

        let (notify_tx, notify_rx) = mpsc::channel(1);

        let registry = Registry {
            workers: HashMap::new(),
            ports: PortPool::new(config.base_port, config.max_instances),
        };

        let manager = Arc::new(Self {
            config,
            registry: Mutex::new(registry),
            env,
            http: reqwest::Client::new(),
            notify_tx,
        });

        (manager, notify_rx)
    }

    /// Look up a tenant's worker without creating one. Used by the admin
    /// `/ready` endpoint, which must never trigger a cold start.
    pub async fn lookup(&self, tenant: &str) -> Option<Arc<Worker>> {
        self.registry.lock().await.workers.get(tenant).cloned()
    }

    /// Fetch-or-create the worker for `tenant`, spawning its child process
    /// and kicking off the Readiness Prober on first touch.
    ///
    /// A failure before the worker becomes observable (template render, URL
    /// parse) rolls back the port checkout and never leaves a registry entry
    /// behind. A failure spawning the child happens *after* the worker is
    /// registered; that case is not rolled back here, it instead moves the
    /// worker to `Errored` (see [`Self::spawn_child`]) and lets it ride the
    /// normal notify/reap path.
    pub async fn get(&self, tenant: &str) -> Result<Arc<Worker>, ManagerError> {
        {
            let registry = self.registry.lock().await;
            if let Some(worker) = registry.workers.get(tenant) {
                return Ok(worker.clone());
            }
        }

        let mut registry = self.registry.lock().await;
        // Re-check under the same lock we'll checkout under: another task
        // may have created this tenant's worker between the fast-path read
        // above and now, e.g. two concurrent requests touching the same
        // tenant for the first time.
        if let Some(worker) = registry.workers.get(tenant) {
            return Ok(worker.clone());
        }

        let port = registry.ports.checkout()?;

        let target_url = match self.render_target_url(tenant, port) {
            Ok(url) => url,
            Err(err) => {
                registry.ports.return_port(port);
                return Err(err);
            }
        };

        let worker = Arc::new(Worker::new(
            tenant.to_string(),
            port,
            target_url,
            self.http.clone(),
        ));
        registry.workers.insert(tenant.to_string(), worker.clone());
        drop(registry);

        // Unlike a template/URL failure (which fails before the worker is
        // observable and so is rolled back), a spawn failure happens to a
        // worker already in the registry: spec.md §7 kind 3 has it become
        // Errored and ride the normal reap path instead of unwinding the
        // registry insert and answering 500 synchronously.
        self.spawn_child(&worker).await;
        self.spawn_supervision(worker.clone());

        Ok(worker)
    }

    fn render_target_url(&self, tenant: &str, port: u16) -> Result<Url, ManagerError> {
        let tmpl = self.env.get_template(DEFAULT_PROXY_TEMPLATE_NAME)?;
        let rendered = tmpl.render(context! { port => port, name => tenant })?;
        Ok(Url::parse(rendered.trim())?)
    }

    /// Spawns `worker`'s child process and, on success, its process-waiter.
    ///
    /// A spawn failure (e.g. the executable is missing) is not rolled back:
    /// the worker is already registered and observable by the time this
    /// runs, so it is moved straight to `Errored` and published on the
    /// notification channel, letting the Supervisor Loop's existing
    /// `ERRORED_GRACE` reap path clean it up like any other errored worker.
    async fn spawn_child(&self, worker: &Arc<Worker>) {
        let Some((program, args)) = self.config.init_command.split_first() else {
            // No InitCommand configured: nothing to spawn, the worker is
            // assumed to be externally managed and already listening.
            worker.state.store(WorkerState::Started);
            return;
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("STAGER_PORT", worker.port.to_string())
            .env("STAGER_NAME", &worker.name)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                error!(worker = %worker.name, error = %err, "failed to spawn worker process");
                worker.state.store(WorkerState::Errored);
                let _ = self.notify_tx.send(worker.clone()).await;
                return;
            }
        };
        worker.set_child_pid(child.id());
        worker.state.store(WorkerState::Started);
        info!(worker = %worker.name, port = worker.port, pid = ?child.id(), "spawned worker process");

        let worker_for_wait = worker.clone();
        let notify_tx = self.notify_tx.clone();
        tokio::spawn(async move {
            let status = child.wait().await;
            let final_state = match status {
                Ok(status) if status.success() => WorkerState::Finished,
                Ok(status) => {
                    warn!(worker = %worker_for_wait.name, %status, "worker exited with failure");
                    WorkerState::Errored
                }
                Err(err) => {
                    error!(worker = %worker_for_wait.name, error = %err, "failed to wait on worker process");
                    WorkerState::Errored
                }
            };
            worker_for_wait.state.store(final_state);
            let _ = notify_tx.send(worker_for_wait).await;
        });
    }

    fn spawn_supervision(&self, worker: Arc<Worker>) {
        // Started is the only state `worker` can be in here regardless of
        // whether an InitCommand was configured (`spawn_child` always moves
        // it to Started before returning). Probing is unconditional: an
        // externally-managed worker with no InitCommand still needs the
        // Prober to observe that it's actually listening before the
        // Dispatch Handler treats it as Running.
        let check_delay = self.config.check_delay;
        let check_attempts = self.config.check_attempts;
        let notify_tx = self.notify_tx.clone();
        tokio::spawn(async move {
            probe_until_ready(worker.clone(), check_delay, check_attempts).await;
            if worker.state.load() == WorkerState::Running {
                let _ = notify_tx.send(worker).await;
            }
        });
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot of every currently-registered worker, for the Supervisor
    /// Loop's idle scan.
    pub async fn workers_snapshot(&self) -> Vec<Arc<Worker>> {
        self.registry.lock().await.workers.values().cloned().collect()
    }

    /// Remove a tenant's entry and return its port to the pool. Called only
    /// by the Supervisor Loop once a worker has reached `Finished`.
    pub async fn reap(&self, tenant: &str) {
        let mut registry = self.registry.lock().await;
        if let Some(worker) = registry.workers.remove(tenant) {
            worker.state.store(WorkerState::Reaped);
            registry.ports.return_port(worker.port);
        }
    }
}
