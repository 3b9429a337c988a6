// security/src/auth.rs

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::roles::Role;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token issuance failed: {0}")]
    Issuance(String),
}

/// The JWT payload a staff session carries. `csrf` must be echoed back by
/// the client on every mutating submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub csrf: String,
    pub exp: usize,
}

/// A freshly issued session: the signed token plus the forgery token the
/// client sends back on mutating requests.
#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub csrf: String,
    pub role: Role,
}

pub fn create_session(username: &str, role: Role, secret: &[u8], hours: i64) -> Result<Session, AuthError> {
    let csrf = Uuid::new_v4().simple().to_string();
    let claims = Claims {
        sub: username.to_string(),
        role,
        csrf: csrf.clone(),
        exp: (Utc::now() + Duration::hours(hours)).timestamp() as usize,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| AuthError::Issuance(e.to_string()))?;
    Ok(Session { token, csrf, role })
}

pub fn decode_token(token: &str, secret: &[u8]) -> Result<Claims, AuthError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_signing_key";

    #[test]
    fn should_verify_a_hashed_password() {
        let hash = hash_password("Admin123!").expect("hash");
        assert!(verify_password("Admin123!", &hash));
        assert!(!verify_password("Admin123?", &hash));
    }

    #[test]
    fn should_reject_a_malformed_hash() {
        assert!(!verify_password("Admin123!", "not-a-hash"));
    }

    #[test]
    fn should_round_trip_session_claims() {
        let session = create_session("admin@clinic.local", Role::Admin, SECRET, 8).expect("session");
        let claims = decode_token(&session.token, SECRET).expect("decode");
        assert_eq!(claims.sub, "admin@clinic.local");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.csrf, session.csrf);
    }

    #[test]
    fn should_reject_a_token_signed_with_another_key() {
        let session = create_session("admin@clinic.local", Role::Staff, SECRET, 8).expect("session");
        assert!(decode_token(&session.token, b"other_key").is_err());
    }
}
