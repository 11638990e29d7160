use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that never require a session. The session, when present, only
/// feeds the navigation guard.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /routes
        // The active route table, in match order.
        .route("/routes", get(handlers::list_routes))
        // GET /navigate?path=...&from=...
        // Runs the navigation guard for the caller's session.
        .route("/navigate", get(handlers::navigate))
}
