use std::sync::Arc;

use axum::extract::{Host, Request, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use stager_core::{Manager, Worker, WorkerState};
use tracing::warn;

use crate::error::DispatchError;
use crate::proxy;
use crate::templates::Templates;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<Manager>,
    pub templates: Arc<Templates>,
}

/// The request-facing contract: resolve the tenant's worker (creating it on
/// first touch), then gate forwarding on its lifecycle state.
pub async fn dispatch(State(state): State<AppState>, Host(host): Host, req: Request) -> Response {
    let tenant = state.manager.config().tenant_name(&host).to_string();

    let worker = match state.manager.get(&tenant).await {
        Ok(worker) => worker,
        Err(err) => {
            warn!(tenant = %tenant, error = %err, "failed to resolve worker");
            return DispatchError::Resolve(err).into_response();
        }
    };

    dispatch_worker(&state, &tenant, worker, req).await
}

/// The state-gating switch, factored out of [`dispatch`] so it can be
/// exercised against a manually-constructed [`Worker`] without a real child
/// process or a full `axum` server.
pub async fn dispatch_worker(
    state: &AppState,
    tenant: &str,
    worker: Arc<Worker>,
    req: Request,
) -> Response {
    match worker.state.load() {
        WorkerState::New | WorkerState::Started => {
            let hold_for = state.manager.config().hold_for;
            let is_idempotent = req.method() == Method::GET;

            if !hold_for.is_zero() && !is_idempotent {
                if worker.ready_signal.wait(hold_for).await {
                    worker.touch();
                    proxy::forward(&worker.http, &worker.target_url, req).await
                } else {
                    (
                        StatusCode::GATEWAY_TIMEOUT,
                        format!("worker for {tenant} did not become ready in time"),
                    )
                        .into_response()
                }
            } else {
                Html(state.templates.render_loading(&worker)).into_response()
            }
        }
        WorkerState::Running => {
            worker.touch();
            proxy::forward(&worker.http, &worker.target_url, req).await
        }
        // Reaped workers are removed from the registry and can never be
        // returned by `Manager::get`; this arm exists defensively and treats
        // a reaped worker the same as a finished one.
        WorkerState::Finished | WorkerState::Reaped => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("worker for {tenant} has finished, cleaning up"),
        )
            .into_response(),
        WorkerState::Errored => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("worker for {tenant} errored after startup"),
        )
            .into_response(),
    }
}
