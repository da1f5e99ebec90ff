//! Tally Web Server
//!
//! Axum-based REST API for the Tally purchase assistant.
//!
//! Security features:
//! - HS256 bearer tokens on every `/api` route
//! - Restrictive CORS policy
//! - Role-scoped purchase visibility and admin-only audit log access
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use tally_core::ai::{AIBackend, AIClient};
use tally_core::db::Database;

pub mod auth;
mod handlers;

pub use auth::AuthConfig;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Environment variable listing allowed CORS origins (comma-separated)
pub const ALLOWED_ORIGINS_ENV: &str = "TALLY_ALLOWED_ORIGINS";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Token signing settings
    pub auth: AuthConfig,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            allowed_origins: vec![],
        }
    }

    /// Build from `TALLY_JWT_SECRET`, `TALLY_TOKEN_TTL_HOURS` and `TALLY_ALLOWED_ORIGINS`
    pub fn from_env() -> anyhow::Result<Self> {
        let auth = AuthConfig::from_env().ok_or_else(|| {
            anyhow::anyhow!("{} must be set to sign tokens", auth::JWT_SECRET_ENV)
        })?;
        let allowed_origins = std::env::var(ALLOWED_ORIGINS_ENV)
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        Ok(Self {
            auth,
            allowed_origins,
        })
    }
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// None when no backend is configured; the message endpoint then answers 503
    pub ai: Option<AIClient>,
}

/// Create the application router, picking the AI backend from the environment
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let ai = AIClient::from_env();
    match &ai {
        Some(client) => info!(
            "AI backend configured: {} at {} (model: {})",
            client.kind(),
            client.host(),
            client.model()
        ),
        None => info!("AI backend not configured (set AI_BACKEND and its host variables)"),
    }
    create_router_with_ai(db, config, ai)
}

/// Create the application router with an explicit AI client (for testing)
pub fn create_router_with_ai(db: Database, config: ServerConfig, ai: Option<AIClient>) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        ai,
    });

    let api_routes = Router::new()
        .route("/me", get(handlers::get_me))
        .route("/purchases", get(handlers::list_purchases))
        .route("/ai/message", post(handlers::post_message))
        .route("/ai/logs", get(handlers::list_ai_logs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let auth_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .nest("/auth", auth_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

/// Start the server
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    check_ai_connection().await;

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection() {
    match AIClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "AI backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "AI backend configured but not responding: {} (model: {})",
                    client.host(),
                    client.model()
                );
            }
        }
        None => {
            info!("AI backend not configured; /api/ai/message will answer 503");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    /// Extra fields merged into the JSON body
    details: Option<Value>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            details: None,
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            details: None,
            // Keep full error for logging
            internal: Some(err),
        }
    }

    /// Map a core error to its client-facing status and body
    fn from_core(err: tally_core::Error) -> Self {
        use tally_core::Error;

        match err {
            Error::MalformedAiOutput { reason, raw } => {
                warn!(reason = %reason, "Model returned malformed output");
                Self::with_status(StatusCode::BAD_GATEWAY, "AI returned malformed output")
                    .with_details(json!({ "raw_ai": raw }))
            }
            Error::ExternalService { message, raw } => {
                warn!(error = %message, "AI service call failed");
                Self::with_status(StatusCode::BAD_GATEWAY, &message)
                    .with_details(json!({ "raw": raw }))
            }
            Error::InvalidPurchase { reason, reply } => Self::bad_request(&reason)
                .with_details(json!({ "message": reply })),
            Error::UnknownAction { reply, .. } => Self::bad_request("unknown action")
                .with_details(json!({ "message": reply })),
            Error::Conflict(msg) => Self::conflict(&msg),
            Error::NotFound(msg) => Self::not_found(&msg),
            other => Self::internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let mut body = json!({ "error": self.message });
        if let (Some(Value::Object(extra)), Some(map)) = (self.details, body.as_object_mut()) {
            map.extend(extra);
        }

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        match err.into().downcast::<tally_core::Error>() {
            Ok(core) => Self::from_core(core),
            Err(other) => Self::internal(other),
        }
    }
}

#[cfg(test)]
mod tests;
