use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<i64>,
    pub bank_id: Option<i64>,
    pub is_verified: bool,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserRecord {
    pub fn is_profile_complete(&self) -> bool {
        self.first_name.is_some() && self.last_name.is_some() && self.phone_number.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub manager_id: Option<i64>,
    pub bank_id: Option<i64>,
    pub phone_number: Option<String>,
    pub is_verified: bool,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: i64,
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
}

/// Partial profile update; `None` leaves the stored column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone_number.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginAttempt {
    /// `None` when the presented email matched no account.
    pub user_id: Option<i64>,
    pub success: bool,
}

/// A row of the `banks` table as stored; see `provisioning::BankInfo` for the
/// client-facing shape.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Bank {
    pub bank_id: i64,
    pub cert: Option<i64>,
    pub routing: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankCriteria {
    Name(String),
    Routing(String),
    BankId(i64),
    Cert(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ReportFact {
    pub date: NaiveDate,
    pub bank_id: i64,
    pub peer_group: String,
    pub name: String,
    pub metric: String,
    pub value: Option<String>,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct VerificationRecord {
    pub email: String,
    /// SHA-256 of the token mailed to the user; the raw token is never stored.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub last_sent_at: DateTime<Utc>,
}
