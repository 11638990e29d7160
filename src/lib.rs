use axum::{extract::FromRef, http::HeaderName, Router};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Routing core.
pub mod error;
pub mod guard;
pub mod loader;
pub mod models;
pub mod navigation;
pub mod revisions;
pub mod session;
pub mod table;

// HTTP host adapter.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod routes;
use routes::public;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{LoadError, MetaError, NavigationError, RouteError};
pub use guard::NavigationGuard;
pub use loader::{ChunkManifest, LazyViews, ViewLoader};
pub use navigation::{Navigator, resolve_navigation};
pub use revisions::{RouteLayer, RouteTableBuilder, base_revision};
pub use session::{SessionAccessor, SessionState, SessionStore};
pub use table::{MatchedRoute, RouteTable};

/// ApiDoc
///
/// OpenAPI document for the host adapter, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::list_routes, handlers::navigate),
    components(
        schemas(
            models::RouteDescriptor, models::ComponentRef, models::SessionUser,
            models::NavigationOutcome, models::LoadedView, models::RouteTableView,
            models::NavigationResponse,
        )
    ),
    tags(
        (name = "portal-router", description = "Portal route table and navigation guard")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state: the route table built at startup, the lazy view
/// cache and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<RouteTable>,
    pub views: Arc<LazyViews>,
    pub config: AppConfig,
}

impl AppState {
    /// Wires a table to a chunk manifest derived from it.
    pub fn new(table: RouteTable, config: AppConfig) -> Self {
        let manifest = ChunkManifest::from_table(&table, &config.base_url);
        Self {
            table: Arc::new(table),
            views: Arc::new(LazyViews::new(Arc::new(manifest))),
            config,
        }
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// load_route_table
///
/// Builds the table from the base revision plus the optional override layer
/// named by `ROUTES_FILE`. The configured login route must exist.
pub fn load_route_table(config: &AppConfig) -> Result<RouteTable, RouteError> {
    let mut builder = RouteTableBuilder::portal()?;
    if let Some(path) = &config.routes_file {
        tracing::info!(path = %path, "applying route override layer");
        builder = builder.layer(RouteLayer::load_file(path)?)?;
    }
    let table = builder.build()?;

    // Redirects resolve the login route by name without parameters.
    table.build_path(&config.login_route, &Default::default())?;
    Ok(table)
}

/// create_router
///
/// Assembles the HTTP surface: docs, public endpoints, and the history-mode
/// fallback that runs every other path through the navigation guard.
///
/// Unlike a per-route auth layer, nothing here rejects anonymous callers:
/// the session is resolved by the `CurrentSession` extractor and the guard
/// decides per navigation whether the caller proceeds or is redirected.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    // The SPA may be served from a different origin than this service.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation. The navigation request id
    // is separate; both appear on the guard's trace lines.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Swagger UI over the generated OpenAPI document.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: health, route table listing, explicit navigation.
        .merge(public::public_routes())
        // History Mode: every unmatched path is a page load of an SPA route.
        // The fallback resolves it, runs the guard, and answers 307 on redirect.
        .fallback(handlers::history_fallback)
        // Shared route table, lazy view cache and configuration.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (applied last)
        .layer(cors)
}

/// trace_span_logger
///
/// Used by `TraceLayer` to open the per-request span. It extracts the
/// `x-request-id` header set by `SetRequestIdLayer` and records it next to
/// the method and URI, so the guard's `navigation requested` lines logged
/// inside the handler can be tied back to the HTTP request that caused them.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
