//! Account registration and login

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tally_core::credentials::{hash_password, verify_password, MIN_PASSWORD_LEN};
use tally_core::models::Role;

use crate::auth::issue_token;
use crate::{AppError, AppState};

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub message: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// POST /auth/register - Create a user account and sign it in
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let username = body.username.trim();
    let name_len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&name_len) {
        return Err(AppError::bad_request(&format!(
            "username must be {} to {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(&format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = hash_password(&body.password)?;
    let user = state.db.create_user(username, &password_hash, Role::User)?;
    let issued = issue_token(&state.config.auth, &user)?;

    info!(user_id = user.id, username = %user.username, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            message: "user created".to_string(),
            token: issued.token,
            expires_at: issued.expires_at,
        }),
    ))
}

/// POST /auth/login - Exchange credentials for a token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .db
        .get_user_by_username(body.username.trim())?
        .filter(|u| verify_password(&body.password, &u.password_hash));

    let Some(user) = user else {
        warn!(username = %body.username.trim(), "Failed login");
        return Err(AppError::unauthorized("invalid credentials"));
    };

    let issued = issue_token(&state.config.auth, &user)?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(TokenResponse {
        message: "logged in".to_string(),
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}
