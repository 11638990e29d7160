use std::sync::{Arc, RwLock};

use crate::models::SessionUser;

/// SessionAccessor
///
/// Read-only view of the externally owned "current user". The guard is
/// handed one at construction time and never mutates it.
pub trait SessionAccessor: Send + Sync {
    fn current_user(&self) -> Option<SessionUser>;
}

/// SessionState
///
/// The shared handle injected into guards.
pub type SessionState = Arc<dyn SessionAccessor>;

/// A fixed snapshot: the session resolved for a single HTTP request, or a
/// test fixture.
impl SessionAccessor for Option<SessionUser> {
    fn current_user(&self) -> Option<SessionUser> {
        self.clone()
    }
}

/// SessionStore
///
/// Mutable store owned by the host (sign-in and sign-out flows live outside
/// this crate). Guards only ever read through `SessionAccessor`.
#[derive(Debug, Default)]
pub struct SessionStore {
    user: RwLock<Option<SessionUser>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: SessionUser) {
        tracing::info!(user_id = %user.id, verified = user.verified, "session started");
        if let Ok(mut slot) = self.user.write() {
            *slot = Some(user);
        }
    }

    pub fn sign_out(&self) {
        tracing::info!("session cleared");
        if let Ok(mut slot) = self.user.write() {
            *slot = None;
        }
    }
}

impl SessionAccessor for SessionStore {
    fn current_user(&self) -> Option<SessionUser> {
        // A poisoned store reads as signed out.
        self.user.read().ok().and_then(|user| user.clone())
    }
}
