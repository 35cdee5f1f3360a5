//! The `stager` front door: axum routing, the Dispatch Handler's HTTP glue,
//! the admin API, config merge, and template rendering around `stager-core`.

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod duration;
pub mod error;
pub mod proxy;
pub mod shutdown;
pub mod static_files;
pub mod templates;

use std::path::Path;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use dispatch::AppState;

/// Build the full router: static assets (if a resource dir is configured),
/// the admin API, and the Dispatch Handler as the fallback for everything
/// else.
pub fn app(state: AppState, resource_dir: Option<&Path>) -> Router {
    let router = static_files::mount(Router::new(), resource_dir);
    router
        .route("/_stager/api/*method", get(admin::api))
        .fallback(dispatch::dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
