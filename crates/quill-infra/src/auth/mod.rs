//! Credential primitives for the local identity provider.

mod jwt;
mod password;

pub use jwt::{JwtConfig, JwtTokenService};
pub use password::Argon2PasswordService;
