use axum::extract::{Host, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::dispatch::AppState;

/// `/_stager/api/<method>`. Only `ready` (GET) is recognised today: there's
/// no extensive API surface to speak of yet, so there's no need to
/// over-build this.
///
/// Path comparison strips the `/_stager/api/` prefix and compares the
/// remainder to `"ready"`, not `"/ready"`.
pub async fn api(
    State(state): State<AppState>,
    Host(host): Host,
    Path(method): Path<String>,
) -> Response {
    let method = method.trim_start_matches('/');

    if method != "ready" {
        return (
            StatusCode::NOT_FOUND,
            format!("Stager API method {method} not found."),
        )
            .into_response();
    }

    let tenant = state.manager.config().tenant_name(&host).to_string();
    let ready = is_ready(&state, &tenant).await;
    (StatusCode::OK, if ready { "true" } else { "false" }).into_response()
}

/// Lookup-only readiness check, factored out of [`api`] so it's testable
/// without a full `axum` request. Must never trigger a cold start.
pub async fn is_ready(state: &AppState, tenant: &str) -> bool {
    match state.manager.lookup(tenant).await {
        Some(worker) => worker.state.load() == stager_core::WorkerState::Running,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliArgs, build_config};
    use crate::templates;
    use stager_core::{Manager, WorkerState};

    fn no_flags() -> CliArgs {
        CliArgs {
            config: None,
            domain_suffix: None,
            listen: None,
            base_port: None,
            max_instances: None,
            proxy_format: None,
            idle_time: None,
            resource_dir: None,
            hold_for: None,
            init_command: None,
        }
    }

    fn test_state() -> AppState {
        let config = build_config(&no_flags()).unwrap();
        let (manager, _notify_rx) = Manager::new(config);
        AppState {
            manager,
            templates: templates::templates(None),
        }
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_ready_without_creating_a_worker() {
        let state = test_state();
        assert!(!is_ready(&state, "nobody").await);
        assert!(state.manager.lookup("nobody").await.is_none());
    }

    #[tokio::test]
    async fn running_worker_is_ready() {
        let state = test_state();
        let worker = state.manager.get("acme").await.unwrap();
        worker.state.store(WorkerState::Running);
        assert!(is_ready(&state, "acme").await);
    }

    #[tokio::test]
    async fn started_worker_is_not_yet_ready() {
        let state = test_state();
        state.manager.get("acme").await.unwrap();
        assert!(!is_ready(&state, "acme").await);
    }
}
