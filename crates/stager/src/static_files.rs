use std::path::Path;

use axum::Router;
use tower_http::services::ServeDir;

use crate::dispatch::AppState;

/// Mounts `/_stager/static` as a `tower_http::services::ServeDir` rooted at
/// `resource_dir/static`, if a resource directory is configured.
///
/// Not a compile-time asset bundle: `ResourceDir` is an operator-supplied
/// runtime path (per spec.md §6), so this stays a plain filesystem service
/// rather than embedding assets into the binary.
pub fn mount(router: Router<AppState>, resource_dir: Option<&Path>) -> Router<AppState> {
    match resource_dir {
        Some(resource_dir) => router.nest_service(
            "/_stager/static",
            ServeDir::new(resource_dir.join("static")),
        ),
        None => router,
    }
}
