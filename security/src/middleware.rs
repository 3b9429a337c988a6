use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::auth::{decode_token, Claims};

/// Shared state for the staff gate: the key the session tokens were
/// signed with.
#[derive(Clone)]
pub struct Verifier {
    secret: Arc<Vec<u8>>,
}

impl Verifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
        }
    }
}

/// Gate in front of the clinic route groups: requires a Bearer token for
/// an Admin or Staff session, and the matching forgery token on mutating
/// methods. Valid claims are attached to the request for handlers.
pub async fn require_staff(State(verifier): State<Verifier>, mut req: Request, next: Next) -> Response {
    let claims = match bearer_claims(&verifier, &req) {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    if req.method() != Method::GET && req.method() != Method::HEAD {
        let submitted = req
            .headers()
            .get("x-csrf-token")
            .and_then(|value| value.to_str().ok());
        if submitted != Some(claims.csrf.as_str()) {
            warn!(user = %claims.sub, "rejected submission without a valid forgery token");
            return reject(StatusCode::FORBIDDEN, "missing or invalid forgery token");
        }
    }

    req.extensions_mut().insert(claims);
    next.run(req).await
}

fn bearer_claims(verifier: &Verifier, req: &Request) -> Result<Claims, Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "missing or invalid token"))?;

    let claims = decode_token(token, &verifier.secret)
        .map_err(|_| reject(StatusCode::UNAUTHORIZED, "missing or invalid token"))?;

    if !claims.role.is_staff() {
        return Err(reject(StatusCode::FORBIDDEN, "insufficient role"));
    }

    Ok(claims)
}

fn reject(status: StatusCode, message: &str) -> Response {
    let body = Json(json!({
        "status": "error",
        "message": message,
    }));
    (status, body).into_response()
}
