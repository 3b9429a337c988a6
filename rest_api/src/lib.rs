use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use models::errors::ClinicError;
use security::{require_staff, Role, Verifier};
use storage::{AccountStorage, ClinicStore};

pub mod config;
pub mod crud;
pub mod resources;
pub mod seed;

use crate::config::ServerConfig;
use crate::crud::resource_router;
use crate::resources::{Appointments, Doctors, Patients, Reviews, Treatments};

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Referenced(String),
    #[error("the record was modified by another request")]
    Conflict,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("internal error: {0}")]
    Internal(String),
}

// Implement IntoResponse for ApiError to convert it into an HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Referenced(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Conflict => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::NotFound(entity, id) => {
                ApiError::NotFound(format!("{entity} {id} was not found"))
            }
            // an id mismatch is reported the same way as a missing row
            ClinicError::IdentityMismatch => ApiError::NotFound(err.to_string()),
            ClinicError::Referenced { .. } => ApiError::Referenced(err.to_string()),
            ClinicError::Conflict => ApiError::Conflict,
            other => {
                error!("storage failure: {other}");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

/// Shared state for the axum application.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ClinicStore>,
    pub accounts: Arc<dyn AccountStorage>,
    pub config: Arc<ServerConfig>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// Handler for the /api/v1/login endpoint
async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let account = state.accounts.get_account(&payload.username).await?;
    let Some(account) = account else {
        warn!(user = %payload.username, "login attempt for unknown account");
        return Err(ApiError::Unauthorized);
    };
    if !security::verify_password(&payload.password, &account.password_hash) {
        warn!(user = %payload.username, "login attempt with a wrong password");
        return Err(ApiError::Unauthorized);
    }

    let role = if account.roles.iter().any(|name| name == "Admin") {
        Role::Admin
    } else {
        account
            .roles
            .iter()
            .filter_map(|name| Role::from_str(name).ok())
            .next()
            .ok_or(ApiError::Unauthorized)?
    };

    let session = security::create_session(
        &payload.username,
        role,
        state.config.jwt_secret.as_bytes(),
        state.config.session_hours,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(user = %payload.username, role = %role, "staff session issued");
    Ok(Json(json!({
        "status": "success",
        "token": session.token,
        "csrf": session.csrf,
        "role": session.role,
    })))
}

// Handler for the /api/v1/health endpoint
async fn health_check_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "message": "clinic API is healthy" })))
}

// Handler for the /api/v1/version endpoint
async fn version_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "version": env!("CARGO_PKG_VERSION"), "api_level": 1 })))
}

/// Assembles the full application router: open endpoints plus the five
/// entity route groups behind the staff gate.
pub fn build_router(state: AppState, verifier: Verifier) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    let protected = Router::new()
        .nest("/api/v1/doctors", resource_router::<Doctors>())
        .nest("/api/v1/patients", resource_router::<Patients>())
        .nest("/api/v1/treatments", resource_router::<Treatments>())
        .nest("/api/v1/appointments", resource_router::<Appointments>())
        .nest("/api/v1/reviews", resource_router::<Reviews>())
        .layer(from_fn_with_state(verifier, require_staff));

    Router::new()
        .route("/api/v1/health", get(health_check_handler))
        .route("/api/v1/version", get(version_handler))
        .route("/api/v1/login", post(login_handler))
        .merge(protected)
        .with_state(state)
        .layer(cors)
}

/// Starts the clinic API server and runs until interrupted.
pub async fn start_server(
    config: ServerConfig,
    store: ClinicStore,
    accounts: Arc<dyn AccountStorage>,
) -> Result<(), anyhow::Error> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid listen address in server configuration")?;

    let verifier = Verifier::new(config.jwt_secret.as_bytes().to_vec());
    let state = AppState {
        store: Arc::new(store),
        accounts,
        config: Arc::new(config),
    };
    let app = build_router(state, verifier);

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {addr}"))?;
    info!("clinic API server listening on {addr}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("clinic API server failed")?;

    info!("clinic API server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_an_id_mismatch_as_not_found() {
        let err = ApiError::from(ClinicError::IdentityMismatch);
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn should_map_referential_violations_to_a_reported_error() {
        let err = ApiError::from(ClinicError::Referenced { entity: "doctor", id: 3 });
        assert!(matches!(err, ApiError::Referenced(_)));
    }

    #[test]
    fn should_resolve_missing_rows_to_not_found() {
        let err = ApiError::from(ClinicError::NotFound("patient", 9));
        match err {
            ApiError::NotFound(message) => assert!(message.contains("patient 9")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
