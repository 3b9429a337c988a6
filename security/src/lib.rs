pub mod auth;
pub mod middleware;
pub mod roles;

pub use auth::{create_session, decode_token, hash_password, verify_password, AuthError, Claims, Session};
pub use middleware::{require_staff, Verifier};
pub use roles::Role;
