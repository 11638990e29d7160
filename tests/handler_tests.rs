use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use portal_router::{
    AppConfig, AppState, RouteLayer, RouteTable, RouteTableBuilder,
    auth::Claims,
    config::Env,
    create_router,
    models::{ComponentRef, NavigationOutcome, NavigationResponse, RouteDescriptor, RouteTableView},
};
use serde::de::DeserializeOwned;
use std::time::SystemTime;
use tower::ServiceExt;
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn create_token(user_id: Uuid, secret: &str, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app(env: Env, base_url: &str) -> Router {
    let table = RouteTableBuilder::portal().unwrap().build().unwrap();
    create_app_with_table(env, base_url, table)
}

fn create_app_with_table(env: Env, base_url: &str, table: RouteTable) -> Router {
    let mut config = AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    config.base_url = base_url.to_string();

    create_router(AppState::new(table, config))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with(uri: &str, name: &str, value: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(name, value)
        .body(Body::empty())
        .unwrap()
}

async fn json_body<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Public Endpoints ---

#[tokio::test]
async fn test_health_check() {
    let app = create_app(Env::Local, "/");
    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_list_routes_in_table_order() {
    let app = create_app(Env::Local, "/");
    let response = app.oneshot(get("/routes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let view: RouteTableView = json_body(response).await;
    let names: Vec<&str> = view.routes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(view.version, 1);
    assert_eq!(names, ["home", "login", "signup", "profile"]);
}

// --- /navigate ---

#[tokio::test]
async fn test_navigate_anonymous_home_redirects_to_login() {
    let app = create_app(Env::Local, "/");
    let response = app.oneshot(get("/navigate?path=/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: NavigationResponse = json_body(response).await;
    assert_eq!(
        body.outcome,
        NavigationOutcome::Redirect {
            name: "login".to_string()
        }
    );
    assert_eq!(body.route, "login");
    assert_eq!(body.path, "/login");
    assert_eq!(body.view.view, "Login");
    assert_eq!(body.view.asset.as_deref(), Some("/js/login.js"));
}

#[tokio::test]
async fn test_navigate_local_bypass_user_reaches_home() {
    let app = create_app(Env::Local, "/");
    let request = get_with("/navigate?path=/&from=login", "x-user-id", &TEST_USER_ID.to_string());
    let response = app.oneshot(request).await.unwrap();

    let body: NavigationResponse = json_body(response).await;
    assert_eq!(body.outcome, NavigationOutcome::Proceed);
    assert_eq!(body.route, "home");
}

#[tokio::test]
async fn test_bypass_user_is_not_enough_for_profile() {
    let app = create_app(Env::Local, "/");
    let request = get_with("/navigate?path=/profile", "x-user-id", &TEST_USER_ID.to_string());
    let response = app.oneshot(request).await.unwrap();

    let body: NavigationResponse = json_body(response).await;
    assert_eq!(body.route, "login");
}

#[tokio::test]
async fn test_valid_token_reaches_profile() {
    let app = create_app(Env::Production, "/");
    let token = create_token(TEST_USER_ID, TEST_JWT_SECRET, 3600);
    let request = get_with(
        "/navigate?path=/profile",
        header::AUTHORIZATION.as_str(),
        &format!("Bearer {}", token),
    );
    let response = app.oneshot(request).await.unwrap();

    let body: NavigationResponse = json_body(response).await;
    assert_eq!(body.outcome, NavigationOutcome::Proceed);
    assert_eq!(body.route, "profile");
}

#[tokio::test]
async fn test_expired_or_foreign_token_is_no_user() {
    for token in [
        create_token(TEST_USER_ID, TEST_JWT_SECRET, -3600),
        create_token(TEST_USER_ID, "some-other-secret", 3600),
    ] {
        let app = create_app(Env::Production, "/");
        let request = get_with(
            "/navigate?path=/",
            header::AUTHORIZATION.as_str(),
            &format!("Bearer {}", token),
        );
        let response = app.oneshot(request).await.unwrap();

        let body: NavigationResponse = json_body(response).await;
        assert_eq!(body.route, "login");
    }
}

#[tokio::test]
async fn test_production_ignores_bypass_header() {
    let app = create_app(Env::Production, "/");
    let request = get_with("/navigate?path=/", "x-user-id", &TEST_USER_ID.to_string());
    let response = app.oneshot(request).await.unwrap();

    let body: NavigationResponse = json_body(response).await;
    assert_eq!(body.route, "login");
}

#[tokio::test]
async fn test_navigate_errors() {
    let app = create_app(Env::Local, "/");
    let response = app.clone().oneshot(get("/navigate?path=/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/navigate?path=/&from=nowhere")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = json_body(response).await;
    assert_eq!(body["error"], "unknown from route: nowhere");
}

// --- History Fallback ---

#[tokio::test]
async fn test_page_load_redirects_under_base_url() {
    let app = create_app(Env::Local, "/portal/");
    let response = app.oneshot(get("/portal/profile")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/portal/login"
    );
}

#[tokio::test]
async fn test_page_load_proceeds_for_public_route() {
    let app = create_app(Env::Local, "/portal/");
    let response = app.oneshot(get("/portal/signup")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: NavigationResponse = json_body(response).await;
    assert_eq!(body.route, "signup");
    assert_eq!(body.view.asset.as_deref(), Some("/portal/js/signup.js"));
}

#[tokio::test]
async fn test_page_load_outside_base_url_or_unknown_is_not_found() {
    let app = create_app(Env::Local, "/portal/");
    let response = app.clone().oneshot(get("/elsewhere/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/portal/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_page_load_rejects_non_get() {
    let app = create_app(Env::Local, "/");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_page_load_decodes_non_ascii_paths() {
    let layer = RouteLayer {
        version: 2,
        routes: vec![
            RouteDescriptor::new("/über", "ueber", ComponentRef::eager("Ueber")),
            RouteDescriptor::new("/u/:name", "user", ComponentRef::eager("User")),
        ],
        remove: Vec::new(),
    };
    let table = RouteTableBuilder::portal().unwrap().layer(layer).unwrap().build().unwrap();
    let app = create_app_with_table(Env::Local, "/", table);

    let response = app.clone().oneshot(get("/%C3%BCber")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: NavigationResponse = json_body(response).await;
    assert_eq!(body.route, "ueber");
    assert_eq!(body.path, "/%C3%BCber");

    let response = app.oneshot(get("/u/ada%20lovelace")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: NavigationResponse = json_body(response).await;
    assert_eq!(body.route, "user");
    assert_eq!(body.params["name"], "ada lovelace");
}
