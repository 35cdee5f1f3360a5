use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stager_core::ManagerError;

/// Errors the Dispatch Handler and Admin API surface to clients.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to resolve worker: {0}")]
    Resolve(#[from] ManagerError),

    #[error("upstream proxy error: {0}")]
    Proxy(#[from] reqwest::Error),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = match &self {
            // Port exhaustion and template/URL failures are both
            // misconfiguration-or-resource-exhaustion surfaced as 500.
            DispatchError::Resolve(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // A 502 is the closest honest status for "the upstream didn't
            // answer", since the proxy itself ran fine.
            DispatchError::Proxy(_) => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}
