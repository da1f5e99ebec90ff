//! Bearer token authentication
//!
//! Tokens are HS256 JWTs carrying the caller's id, username and role. The
//! middleware verifies them and attaches a [`Caller`] to the request for
//! handlers to extract.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tally_core::models::{Caller, Role, User};

use crate::{AppError, AppState};

/// Environment variable holding the signing secret
pub const JWT_SECRET_ENV: &str = "TALLY_JWT_SECRET";

/// Environment variable overriding the token lifetime
pub const TOKEN_TTL_ENV: &str = "TALLY_TOKEN_TTL_HOURS";

const DEFAULT_TOKEN_TTL_HOURS: i64 = 48;

/// Token signing configuration
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Read `TALLY_JWT_SECRET` and `TALLY_TOKEN_TTL_HOURS`
    ///
    /// Returns None when no secret is configured.
    pub fn from_env() -> Option<Self> {
        let secret = std::env::var(JWT_SECRET_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())?;

        let hours = std::env::var(TOKEN_TTL_ENV)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);

        Some(Self::new(secret).with_ttl(Duration::hours(hours)))
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn into_caller(self) -> Option<Caller> {
        let role: Role = self.role.parse().ok()?;
        Some(Caller::new(self.user_id, self.username, role))
    }
}

/// A freshly issued token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Sign a token for `user`
pub fn issue_token(config: &AuthConfig, user: &User) -> anyhow::Result<IssuedToken> {
    let now = Utc::now();
    let expires_at = now + config.token_ttl;
    let claims = Claims {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role.as_str().to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(IssuedToken { token, expires_at })
}

/// Check signature and expiry, returning the caller the token speaks for
pub fn verify_token(config: &AuthConfig, token: &str) -> Option<Caller> {
    let validation = Validation::new(Algorithm::HS256);
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => data.claims.into_caller(),
        Err(e) => {
            debug!(error = %e, "Token rejected");
            None
        }
    }
}

/// Authentication middleware for `/api` routes
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        warn!(path = %path, "Unauthorized request - no Authorization header");
        return AppError::unauthorized("Authorization header missing").into_response();
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let Some(token) = token else {
        warn!(path = %path, "Unauthorized request - malformed Authorization header");
        return AppError::unauthorized("Invalid Authorization header").into_response();
    };

    let Some(caller) = verify_token(&state.config.auth, token) else {
        warn!(path = %path, "Unauthorized request - invalid token");
        return AppError::unauthorized("Invalid or expired token").into_response();
    };

    debug!(user_id = caller.user_id, path = %path, "Authenticated");
    request.extensions_mut().insert(caller);
    next.run(request).await
}
