use async_trait::async_trait;
use portal_router::{
    ChunkManifest, LazyViews, LoadError, NavigationError, NavigationGuard, Navigator, RouteError,
    RouteTable, RouteTableBuilder, SessionStore, ViewLoader,
    models::{ComponentRef, NavigationOutcome, SessionUser},
    resolve_navigation,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Notify;
use uuid::Uuid;

// --- Mock Loaders ---

/// Counts how often each chunk is actually fetched.
#[derive(Default)]
struct CountingLoader {
    loads: AtomicUsize,
}

#[async_trait]
impl ViewLoader for CountingLoader {
    async fn load_chunk(&self, chunk: &str) -> Result<String, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("/js/{}.js", chunk))
    }
}

/// Holds every load until released, so a navigation can be overtaken.
#[derive(Default)]
struct GatedLoader {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ViewLoader for GatedLoader {
    async fn load_chunk(&self, chunk: &str) -> Result<String, LoadError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(format!("/js/{}.js", chunk))
    }
}

// --- Helper Functions ---

fn portal_table() -> Arc<RouteTable> {
    Arc::new(RouteTableBuilder::portal().unwrap().build().unwrap())
}

fn navigator_with(
    table: Arc<RouteTable>,
    store: Arc<SessionStore>,
    loader: Arc<dyn ViewLoader>,
) -> Navigator {
    let guard = NavigationGuard::new(store, "login");
    Navigator::new(table, guard, Arc::new(LazyViews::new(loader)))
}

fn verified_user() -> SessionUser {
    SessionUser {
        id: Uuid::from_u128(1),
        verified: true,
    }
}

// --- resolve_navigation ---

#[test]
fn test_redirect_lands_on_login_and_keeps_outcome() {
    let table = portal_table();
    let guard = NavigationGuard::new(Arc::new(None::<SessionUser>), "login");

    let resolution = resolve_navigation(&table, &guard, "/profile", None).unwrap();

    assert_eq!(
        resolution.outcome,
        NavigationOutcome::Redirect {
            name: "login".to_string()
        }
    );
    assert_eq!(resolution.route.name(), "login");
    assert_eq!(resolution.route.path, "/login");
}

#[test]
fn test_allowed_navigation_keeps_requested_route() {
    let table = portal_table();
    let guard = NavigationGuard::new(Arc::new(Some(verified_user())), "login");

    let resolution = resolve_navigation(&table, &guard, "/profile", None).unwrap();
    assert_eq!(resolution.outcome, NavigationOutcome::Proceed);
    assert_eq!(resolution.route.name(), "profile");

    // The login redirect target is itself allowed, so the first outcome is
    // the one reported even though the guard ran twice.
    let anonymous = NavigationGuard::new(Arc::new(None::<SessionUser>), "login");
    let resolution = resolve_navigation(&table, &anonymous, "/", None).unwrap();
    assert!(resolution.outcome.is_redirect());
    assert_eq!(resolution.route.name(), "login");
}

#[test]
fn test_unknown_path_is_not_found() {
    let table = portal_table();
    let guard = NavigationGuard::new(Arc::new(None::<SessionUser>), "login");

    let err = resolve_navigation(&table, &guard, "/nowhere", None).unwrap_err();
    assert_eq!(err, NavigationError::Route(RouteError::NotFound("/nowhere".to_string())));
}

#[test]
fn test_redirect_to_missing_login_route_fails() {
    let table = portal_table();
    let guard = NavigationGuard::new(Arc::new(None::<SessionUser>), "signin");

    let err = resolve_navigation(&table, &guard, "/", None).unwrap_err();
    assert_eq!(err, NavigationError::Route(RouteError::UnknownName("signin".to_string())));
}

// --- Navigator ---

#[tokio::test]
async fn test_navigator_commits_and_tracks_from() {
    let store = Arc::new(SessionStore::new());
    let navigator = navigator_with(portal_table(), store.clone(), Arc::new(CountingLoader::default()));

    let first = navigator.navigate("/").await.unwrap();
    assert_eq!(first.resolution.route.name(), "login");
    assert_eq!(navigator.current().await.unwrap().name(), "login");

    store.sign_in(verified_user());
    let second = navigator.navigate("/profile").await.unwrap();
    assert_eq!(second.resolution.outcome, NavigationOutcome::Proceed);
    assert_eq!(second.view.view, "Profile");
    assert_eq!(second.view.asset, None);
    assert_eq!(navigator.current().await.unwrap().name(), "profile");
}

#[tokio::test]
async fn test_lazy_chunk_loads_once() {
    let loader = Arc::new(CountingLoader::default());
    let navigator = navigator_with(portal_table(), Arc::new(SessionStore::new()), loader.clone());

    for _ in 0..3 {
        let committed = navigator.navigate("/signup").await.unwrap();
        assert_eq!(committed.view.chunk.as_deref(), Some("signup"));
        assert_eq!(committed.view.asset.as_deref(), Some("/js/signup.js"));
    }
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_newer_navigation_supersedes_pending_one() {
    let loader = Arc::new(GatedLoader::default());
    let store = Arc::new(SessionStore::new());
    store.sign_in(verified_user());
    let navigator = Arc::new(navigator_with(portal_table(), store, loader.clone()));

    // `/signup` is lazy and blocks inside the loader.
    let pending = {
        let navigator = navigator.clone();
        tokio::spawn(async move { navigator.navigate("/signup").await })
    };
    loader.entered.notified().await;

    // `/profile` is eager and commits without waiting on the loader.
    let committed = navigator.navigate("/profile").await.unwrap();
    assert_eq!(committed.resolution.route.name(), "profile");

    loader.release.notify_one();
    let result = pending.await.unwrap();

    assert_eq!(result.unwrap_err(), NavigationError::Superseded);
    assert_eq!(navigator.current().await.unwrap().name(), "profile");
}

#[tokio::test]
async fn test_manifest_rejects_unknown_chunk() {
    let table = portal_table();
    let manifest = ChunkManifest::from_table(&table, "/app/");

    assert_eq!(manifest.asset("login"), Some("/app/js/login.js"));

    let views = LazyViews::new(Arc::new(manifest));
    let err = views
        .materialize(&ComponentRef::lazy("Admin", "admin"))
        .await
        .unwrap_err();
    assert_eq!(err, LoadError::UnknownChunk("admin".to_string()));
}
