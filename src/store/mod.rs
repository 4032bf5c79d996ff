//! Transactional persistence for identities, banks and report data.
//!
//! Workflow code talks to the [`UserStore`] / [`UserTx`] traits. Production uses
//! [`PgStore`]; [`MemoryStore`] backs tests and local runs.

use async_trait::async_trait;

use crate::auth::Role;

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::{
    Bank, BankCriteria, Credentials, LoginAttempt, NewUser, ProfileUpdate, ReportFact,
    UserRecord, VerificationRecord,
};
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::UniqueViolation(db.message().to_string());
            }
            if db.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Pool-level access. Reads here run outside any transaction.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UserTx>, StoreError>;

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError>;

    /// Unlocked read, used to verify a password without holding a row lock.
    async fn credentials_by_email(&self, email: &str) -> Result<Option<Credentials>, StoreError>;

    async fn user_role(&self, user_id: i64) -> Result<Option<Role>, StoreError>;

    /// Default peer group from the bank lookup table.
    async fn peer_group(&self, bank_id: i64) -> Result<Option<String>, StoreError>;

    async fn find_bank(&self, criteria: &BankCriteria) -> Result<Option<Bank>, StoreError>;

    async fn verification_for_email(
        &self,
        email: &str,
    ) -> Result<Option<VerificationRecord>, StoreError>;
}

/// Source of report facts used to warm the cache.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Most recent facts for the bank, newest first, at most `limit` rows.
    async fn recent_report_data(
        &self,
        bank_id: i64,
        limit: i64,
    ) -> Result<Vec<ReportFact>, StoreError>;
}

/// One open transaction. Dropping it without `commit` rolls it back.
#[async_trait]
pub trait UserTx: Send {
    async fn insert_user(&mut self, user: &NewUser) -> Result<i64, StoreError>;

    async fn find_user(&mut self, user_id: i64) -> Result<Option<UserRecord>, StoreError>;

    async fn credentials_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Credentials>, StoreError>;

    /// Writes only the populated fields; returns the number of rows matched.
    async fn update_profile(
        &mut self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<u64, StoreError>;

    async fn set_bank_id(&mut self, user_id: i64, bank_id: i64) -> Result<u64, StoreError>;

    async fn record_login_attempt(&mut self, attempt: LoginAttempt) -> Result<(), StoreError>;

    /// Inserts or replaces the pending verification for `record.email`.
    async fn save_verification(&mut self, record: &VerificationRecord) -> Result<(), StoreError>;

    async fn verification_by_token(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<VerificationRecord>, StoreError>;

    async fn delete_verification(&mut self, email: &str) -> Result<(), StoreError>;

    async fn mark_verified(&mut self, email: &str) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
