use crate::models::{Capability, NavigationOutcome};
use crate::navigation::NavigationRequest;
use crate::session::SessionState;

/// Name of the route unauthenticated navigations are sent to.
pub const DEFAULT_LOGIN_ROUTE: &str = "login";

/// NavigationGuard
///
/// The pre-transition decision. Every capability flag set on the target's
/// `meta` must be satisfied by the current session user, otherwise the
/// navigation is redirected to the login route.
///
/// The decision is returned as a single `NavigationOutcome`, so a host can
/// only ever act on it once.
#[derive(Clone)]
pub struct NavigationGuard {
    session: SessionState,
    login_route: String,
}

impl NavigationGuard {
    pub fn new(session: SessionState, login_route: impl Into<String>) -> Self {
        Self {
            session,
            login_route: login_route.into(),
        }
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// decide
    ///
    /// Evaluates one navigation request. Apart from the trace line this has
    /// no side effects, so re-evaluating a request yields the same outcome
    /// for the same session.
    pub fn decide(&self, request: &NavigationRequest) -> NavigationOutcome {
        let user = self.session.current_user();
        let target = request.to.name();

        tracing::info!(
            request_id = %request.id,
            from = request.from.as_ref().map(|route| route.name.as_str()).unwrap_or("<none>"),
            to = target,
            user = ?user.as_ref().map(|u| u.id),
            "navigation requested"
        );

        // The login page itself is never gated, or a flagged login route
        // would redirect to itself forever.
        if target == self.login_route {
            return NavigationOutcome::Proceed;
        }

        let required = match request.to.route.meta.required_capabilities() {
            Ok(required) => required,
            Err(e) => {
                tracing::warn!(request_id = %request.id, route = target, error = %e, "malformed route meta, denying");
                return self.redirect_to_login();
            }
        };

        let missing: Vec<Capability> = required
            .into_iter()
            .filter(|capability| !capability.is_satisfied_by(user.as_ref()))
            .collect();

        if missing.is_empty() {
            NavigationOutcome::Proceed
        } else {
            tracing::debug!(
                request_id = %request.id,
                route = target,
                missing = ?missing.iter().map(|c| c.flag()).collect::<Vec<_>>(),
                "navigation blocked"
            );
            self.redirect_to_login()
        }
    }

    /// run
    ///
    /// Callback-style entry point for hosts that resolve navigations through
    /// a continuation. `next` is `FnOnce`, so it is called exactly once.
    pub fn run<F, R>(&self, request: &NavigationRequest, next: F) -> R
    where
        F: FnOnce(NavigationOutcome) -> R,
    {
        next(self.decide(request))
    }

    fn redirect_to_login(&self) -> NavigationOutcome {
        NavigationOutcome::Redirect {
            name: self.login_route.clone(),
        }
    }
}
