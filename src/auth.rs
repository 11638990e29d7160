use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::SessionUser,
};

/// Claims
///
/// Payload expected inside a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    /// Expiration Time (exp): always validated.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// CurrentSession Extractor Result
///
/// The session user resolved for one request, if any. Unlike a hard auth
/// gate this never rejects: deciding what an anonymous visitor may see is
/// the navigation guard's job.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<SessionUser>);

/// CurrentSession Extractor Implementation
///
/// 1. Local Bypass: in `Env::Local`, an `x-user-id` header holding a UUID
///    yields an unverified user.
/// 2. Token Validation: a `Bearer` token that decodes against the configured
///    secret yields a verified user.
/// 3. Anything else: no user.
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if let Some(token) = bearer_token(parts) {
            return Ok(CurrentSession(verify_token(token, &config.jwt_secret)));
        }

        if config.env == Env::Local {
            let bypass = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id| Uuid::parse_str(id).ok());
            if let Some(id) = bypass {
                return Ok(CurrentSession(Some(SessionUser {
                    id,
                    verified: false,
                })));
            }
        }

        Ok(CurrentSession(None))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// verify_token
///
/// Decodes an HS256 session token. Returns `None` for any invalid token;
/// the reason is only logged.
pub fn verify_token(token: &str, secret: &str) -> Option<SessionUser> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(SessionUser {
            id: data.claims.sub,
            verified: true,
        }),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                kind => tracing::debug!(?kind, "session token rejected"),
            }
            None
        }
    }
}
