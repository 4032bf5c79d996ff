//! Credential primitives: roles, signed session tokens and password digests.

mod password;
mod role;
mod token;

pub use password::{BcryptHasher, PasswordError, PasswordHasher};
pub use role::{Role, UnknownRole};
pub use token::{AuthError, SigningError, TokenPair, TokenService};

/// Verified identity of the caller for the lifetime of one request.
///
/// Produced by the auth interceptor and handed to workflow operations as an
/// explicit argument; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
}
