use crate::{
    AppState,
    auth::CurrentSession,
    error::{NavigationError, RouteError},
    guard::NavigationGuard,
    models::{NavigationResponse, RouteTableView, SessionUser},
    navigation::resolve_navigation,
};
use axum::{
    Json,
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;

// --- Query Structs ---

/// NavigateQuery
///
/// Query parameters for GET /navigate.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct NavigateQuery {
    /// Concrete path to navigate to, e.g. `/profile`.
    pub path: String,
    /// Name of the currently active route, if any.
    pub from: Option<String>,
}

// --- Error Mapping ---

/// ApiError
///
/// A status code plus message, rendered as `{ "error": "..." }`.
#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<NavigationError> for ApiError {
    fn from(err: NavigationError) -> Self {
        let status = match &err {
            NavigationError::Route(RouteError::NotFound(_)) => StatusCode::NOT_FOUND,
            NavigationError::Superseded => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "navigation failed");
        }
        ApiError(status, err.to_string())
    }
}

// --- Handlers ---

/// list_routes
///
/// [Public Route] Returns the route table in table order.
#[utoipa::path(
    get,
    path = "/routes",
    responses((status = 200, description = "Route table", body = RouteTableView))
)]
pub async fn list_routes(State(state): State<AppState>) -> Json<RouteTableView> {
    Json(RouteTableView {
        version: state.table.version(),
        routes: state.table.routes().map(|route| route.as_ref().clone()).collect(),
    })
}

/// navigate
///
/// [Public Route] Runs a navigation for the caller's session and reports
/// the guard's decision along with the route it landed on.
#[utoipa::path(
    get,
    path = "/navigate",
    params(NavigateQuery),
    responses(
        (status = 200, description = "Navigation resolved", body = NavigationResponse),
        (status = 400, description = "Unknown `from` route"),
        (status = 404, description = "No route matches the path")
    )
)]
pub async fn navigate(
    State(state): State<AppState>,
    CurrentSession(user): CurrentSession,
    Query(query): Query<NavigateQuery>,
) -> Result<Json<NavigationResponse>, ApiError> {
    let response = run_navigation(&state, user, &query.path, query.from.as_deref()).await?;
    Ok(Json(response))
}

/// history_fallback
///
/// History-mode entry point: every other GET under the base URL is treated
/// as a page load of that path. A guard redirect answers 307 to the target
/// route's public path; otherwise the navigation response is returned.
pub async fn history_fallback(
    State(state): State<AppState>,
    CurrentSession(user): CurrentSession,
    method: Method,
    uri: Uri,
) -> Result<Response, ApiError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("{} is not supported for page loads", method),
        ));
    }

    let path = state.config.app_path(uri.path()).ok_or_else(|| {
        ApiError(
            StatusCode::NOT_FOUND,
            format!("{} is outside base url {}", uri.path(), state.config.base_url),
        )
    })?;

    let response = run_navigation(&state, user, path, None).await?;

    if response.outcome.is_redirect() {
        let location = state.config.public_path(&response.path);
        tracing::info!(request_id = %response.request_id, %location, "page load redirected");
        return Ok(Redirect::temporary(&location).into_response());
    }

    Ok(Json(response).into_response())
}

/// run_navigation
///
/// Shared pipeline: per-request guard over the resolved session, redirect
/// following, then view materialization.
async fn run_navigation(
    state: &AppState,
    user: Option<SessionUser>,
    path: &str,
    from: Option<&str>,
) -> Result<NavigationResponse, ApiError> {
    let from = match from {
        Some(name) => Some(state.table.by_name(name).cloned().ok_or_else(|| {
            ApiError(StatusCode::BAD_REQUEST, format!("unknown from route: {}", name))
        })?),
        None => None,
    };

    let guard = NavigationGuard::new(Arc::new(user), state.config.login_route.clone());
    let resolution = resolve_navigation(&state.table, &guard, path, from)?;
    let view = state
        .views
        .materialize(&resolution.route.route.component)
        .await
        .map_err(NavigationError::from)?;

    Ok(NavigationResponse {
        request_id: resolution.request_id,
        outcome: resolution.outcome,
        route: resolution.route.name().to_string(),
        path: resolution.route.path,
        params: resolution.route.params,
        view,
    })
}
