//! Stateless JWT authentication.
//!
//! Provides token issuance and verification backed by a process-wide
//! signing secret. Rotating the secret invalidates every previously issued
//! token.

pub mod config;
pub mod jwt;

pub use config::JwtConfig;
pub use jwt::{JwtAuth, JwtClaims, TokenError, TOKEN_TTL};
