use portal_router::{AppState, config::{AppConfig, Env}, create_router, load_route_table};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point: loads configuration, initializes logging,
/// builds the route table from its revision layers and serves the host
/// adapter.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env before reading variables. AppConfig::load() panics in
    // production when SESSION_JWT_SECRET is missing.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise the guard's navigation trace is visible at debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portal_router=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: pretty output for reading navigation traces by hand.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Router starting in {:?} mode", config.env);

    // 4. Route Table Assembly
    // Base revision, then the optional ROUTES_FILE layer. Fails fast on a
    // malformed layer or a missing login route.
    let table = load_route_table(&config).expect("FATAL: route table is invalid. Check ROUTES_FILE.");
    tracing::info!(
        version = table.version(),
        routes = table.len(),
        base_url = %config.base_url,
        "route table loaded"
    );

    // 5. Unified State Assembly
    // The chunk manifest for lazy views is derived from the table.
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(table, config));

    // 6. Server Startup
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await.expect("FATAL: server error");
}
