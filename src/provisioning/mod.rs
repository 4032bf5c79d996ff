//! Account lifecycle: creation, verification, profile, bank binding and sessions.
//!
//! Every operation takes the caller's identity as an explicit argument. Steps
//! that read and then write identity state share one transaction. Cache
//! population runs only after the binding transaction has committed.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::{AuthError, PasswordError, PasswordHasher, Role, SigningError, TokenPair, TokenService};
use crate::cache::CacheLayer;
use crate::mail::{MailError, Mailer};
use crate::store::{StoreError, UserStore};

mod accounts;
mod bank;
mod session;
pub mod validation;
mod verification;

pub use bank::BankInfo;
pub use validation::ValidationError;

const DUMMY_PASSWORD: &str = "Dummy-Passw0rd!";

#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no profile fields provided")]
    NoFieldsProvided,
    #[error("phone number must be provided")]
    MissingPhoneNumber,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token rejected: {0}")]
    Unauthenticated(AuthError),
    #[error("role {actual} may not perform this operation")]
    Forbidden { actual: Role },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("verification token is invalid or expired")]
    InvalidVerificationToken,
    #[error("verification email was sent recently")]
    ResendCooldown,
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error("blocking worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("operation cancelled")]
    Cancelled,
}

/// Terminal outcomes of a credential check that are not errors.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(TokenPair),
    /// Elevated account still missing first name, last name or phone.
    ProfileIncomplete { user_id: i64 },
    EmailNotVerified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCreated {
    pub user_id: i64,
    /// The account exists whether or not the verification mail went out.
    pub verification: Delivery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    Populated { facts: usize },
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankBound {
    pub bank_id: i64,
    pub peer_group: Option<String>,
    pub cache: CacheStatus,
}

pub struct ProvisioningService {
    store: Arc<dyn UserStore>,
    cache: CacheLayer,
    tokens: Arc<TokenService>,
    hasher: Arc<dyn PasswordHasher>,
    mailer: Arc<dyn Mailer>,
    verification_url: String,
    /// Verified against when the email is unknown so both paths cost one bcrypt check.
    dummy_hash: String,
}

impl ProvisioningService {
    pub fn new(
        store: Arc<dyn UserStore>,
        cache: CacheLayer,
        tokens: Arc<TokenService>,
        hasher: Arc<dyn PasswordHasher>,
        mailer: Arc<dyn Mailer>,
        verification_url: impl Into<String>,
    ) -> Result<Self, ProvisioningError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            cache,
            tokens,
            hasher,
            mailer,
            verification_url: verification_url.into(),
            dummy_hash,
        })
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    async fn hash_password(&self, plain: String) -> Result<String, ProvisioningError> {
        let hasher = Arc::clone(&self.hasher);
        Ok(tokio::task::spawn_blocking(move || hasher.hash(&plain)).await??)
    }

    async fn verify_password(
        &self,
        digest: String,
        plain: String,
    ) -> Result<bool, ProvisioningError> {
        let hasher = Arc::clone(&self.hasher);
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&digest, &plain)).await??)
    }
}

/// Yield point for cooperative cancellation.
fn checkpoint(cancel: &CancellationToken) -> Result<(), ProvisioningError> {
    if cancel.is_cancelled() {
        Err(ProvisioningError::Cancelled)
    } else {
        Ok(())
    }
}

fn require_elevated(role: Role) -> Result<(), ProvisioningError> {
    if role == Role::Elevated {
        Ok(())
    } else {
        Err(ProvisioningError::Forbidden { actual: role })
    }
}
