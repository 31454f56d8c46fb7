//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
///
/// The catalog is mounted under the configured base path; every path below
/// it maps onto the library directory tree.
pub fn create_router(state: AppState) -> Router {
    let base = state.config.server.normalized_base_path();

    let mut router = Router::new().route(
        &format!("{}/{{*path}}", base),
        get(handlers::catalog_path).head(handlers::catalog_head),
    );

    if base.is_empty() {
        router = router.route(
            "/",
            get(handlers::catalog_root).head(handlers::catalog_head),
        );
    } else {
        router = router
            .route("/", get(handlers::index))
            .route(
                &base,
                get(handlers::catalog_root).head(handlers::catalog_head),
            )
            .route(
                &format!("{}/", base),
                get(handlers::catalog_root).head(handlers::catalog_head),
            );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
