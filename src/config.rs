use std::env;

use crate::guard::DEFAULT_LOGIN_ROUTE;

/// AppConfig
///
/// Holds the router service's configuration. Immutable once loaded and
/// pulled into handlers and extractors via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local `x-user-id` session bypass.
    pub env: Env,
    // Public base URL the SPA is served under, always with leading and trailing '/'.
    pub base_url: String,
    // Secret used to validate session tokens (HS256).
    pub jwt_secret: String,
    // Optional JSON route layer applied over the base revision.
    pub routes_file: Option<String>,
    // Name of the route unauthenticated navigations are redirected to.
    pub login_route: String,
    pub bind_addr: String,
}

/// Env
///
/// Runtime context: local development allows the header session bypass,
/// production only accepts validated tokens.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

impl Default for AppConfig {
    /// Safe, non-panicking values for tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            base_url: "/".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            routes_file: None,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics in production when `SESSION_JWT_SECRET` is not set, so the
    /// service never starts validating tokens against a known default.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => env::var("SESSION_JWT_SECRET")
                .expect("FATAL: SESSION_JWT_SECRET must be set in production."),
            Env::Local => {
                env::var("SESSION_JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string())
            }
        };

        Self {
            env,
            base_url: normalize_base_url(&env::var("BASE_URL").unwrap_or_default()),
            jwt_secret,
            routes_file: env::var("ROUTES_FILE").ok().filter(|path| !path.is_empty()),
            login_route: env::var("LOGIN_ROUTE")
                .ok()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_LOGIN_ROUTE.to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }

    /// Strips the base URL from a request path, keeping the leading '/'.
    /// Paths outside the base URL are returned as `None`.
    pub fn app_path<'a>(&self, request_path: &'a str) -> Option<&'a str> {
        if self.base_url == "/" {
            return Some(request_path);
        }
        let prefix = self.base_url.trim_end_matches('/');
        match request_path.strip_prefix(prefix) {
            Some("") => Some("/"),
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }

    /// Prefixes an app path with the base URL.
    pub fn public_path(&self, app_path: &str) -> String {
        format!("{}{}", self.base_url, app_path.trim_start_matches('/'))
    }
}

/// Ensures the base URL starts and ends with a single '/'.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}
