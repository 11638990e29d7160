use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::NavigationError;
use crate::guard::NavigationGuard;
use crate::loader::LazyViews;
use crate::models::{LoadedView, NavigationOutcome, RouteDescriptor};
use crate::table::{MatchedRoute, RouteTable};

/// Upper bound on guard redirects followed for one navigation.
pub const MAX_REDIRECTS: usize = 8;

/// NavigationRequest
///
/// One in-flight transition attempt. Created per attempt and dropped once
/// the guard has decided.
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub id: Uuid,
    pub to: MatchedRoute,
    pub from: Option<Arc<RouteDescriptor>>,
}

impl NavigationRequest {
    pub fn new(to: MatchedRoute, from: Option<Arc<RouteDescriptor>>) -> Self {
        Self::with_id(Uuid::new_v4(), to, from)
    }

    pub fn with_id(id: Uuid, to: MatchedRoute, from: Option<Arc<RouteDescriptor>>) -> Self {
        Self { id, to, from }
    }
}

/// Resolution
///
/// Where a navigation settled after the guard ran. `outcome` is the guard's
/// decision for the originally requested route.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub request_id: Uuid,
    pub outcome: NavigationOutcome,
    pub route: MatchedRoute,
}

/// resolve_navigation
///
/// Resolves `path`, asks the guard, and follows redirects. Each redirect
/// target is guarded again, sharing the original request id in the trace.
pub fn resolve_navigation(
    table: &RouteTable,
    guard: &NavigationGuard,
    path: &str,
    from: Option<Arc<RouteDescriptor>>,
) -> Result<Resolution, NavigationError> {
    let target = table.resolve(path)?;
    let request_id = Uuid::new_v4();

    let mut request = NavigationRequest::with_id(request_id, target, from);
    // What the guard said about the route the caller actually asked for.
    let requested_outcome = guard.decide(&request);
    let mut outcome = requested_outcome.clone();

    for _ in 0..=MAX_REDIRECTS {
        let name = match outcome {
            NavigationOutcome::Proceed => {
                return Ok(Resolution {
                    request_id,
                    outcome: requested_outcome,
                    route: request.to,
                });
            }
            NavigationOutcome::Redirect { name } => name,
        };

        tracing::info!(%request_id, from = request.to.name(), to = %name, "navigation redirected");
        let next = table.resolve_named(&name)?;
        request = NavigationRequest::with_id(request_id, next, request.from);
        outcome = guard.decide(&request);
    }

    Err(NavigationError::RedirectLoop {
        target: path.to_string(),
        hops: MAX_REDIRECTS,
    })
}

/// Committed
///
/// A navigation that passed the guard, had its view materialized, and became
/// the current route.
#[derive(Debug, Clone)]
pub struct Committed {
    pub resolution: Resolution,
    pub view: LoadedView,
}

/// Navigator
///
/// The in-process routing engine: idle → evaluating guard → allow|redirect →
/// idle. Shareable across tasks; when navigations overlap only the most
/// recently started one is committed.
pub struct Navigator {
    table: Arc<RouteTable>,
    guard: NavigationGuard,
    views: Arc<LazyViews>,
    current: RwLock<Option<MatchedRoute>>,
    generation: AtomicU64,
}

impl Navigator {
    pub fn new(table: Arc<RouteTable>, guard: NavigationGuard, views: Arc<LazyViews>) -> Self {
        Self {
            table,
            guard,
            views,
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn current(&self) -> Option<MatchedRoute> {
        self.current.read().await.clone()
    }

    pub async fn navigate(&self, path: &str) -> Result<Committed, NavigationError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let from = self
            .current
            .read()
            .await
            .as_ref()
            .map(|current| current.route.clone());

        let resolution = resolve_navigation(&self.table, &self.guard, path, from)?;
        // The only suspend point: lazy views may need their chunk fetched.
        let view = self.views.materialize(&resolution.route.route.component).await?;

        let mut current = self.current.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(request_id = %resolution.request_id, path, "navigation superseded");
            return Err(NavigationError::Superseded);
        }
        *current = Some(resolution.route.clone());
        tracing::debug!(
            request_id = %resolution.request_id,
            route = resolution.route.name(),
            view = resolution.route.route.component.view(),
            "navigation committed"
        );

        Ok(Committed { resolution, view })
    }
}
