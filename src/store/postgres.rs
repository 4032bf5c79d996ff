use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::models::{
    Bank, BankCriteria, Credentials, LoginAttempt, NewUser, ProfileUpdate, ReportFact,
    UserRecord, VerificationRecord,
};
use super::{ReportSource, StoreError, UserStore, UserTx};
use crate::auth::Role;

const USER_COLUMNS: &str = "user_id, email, role, manager_id, bank_id, is_verified, \
                            phone_number, first_name, last_name";

const BANK_COLUMNS: &str = "bank_id, cert, routing, name, address, city, state, zip";

#[derive(FromRow)]
struct UserRow {
    user_id: i64,
    email: String,
    role: String,
    manager_id: Option<i64>,
    bank_id: Option<i64>,
    is_verified: bool,
    phone_number: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRecord {
            user_id: row.user_id,
            email: row.email,
            role: parse_role(&row.role)?,
            manager_id: row.manager_id,
            bank_id: row.bank_id,
            is_verified: row.is_verified,
            phone_number: row.phone_number,
            first_name: row.first_name,
            last_name: row.last_name,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRow {
    user_id: i64,
    password_hash: String,
    role: String,
    is_verified: bool,
}

impl TryFrom<CredentialsRow> for Credentials {
    type Error = StoreError;

    fn try_from(row: CredentialsRow) -> Result<Self, Self::Error> {
        Ok(Credentials {
            user_id: row.user_id,
            password_hash: row.password_hash,
            role: parse_role(&row.role)?,
            is_verified: row.is_verified,
        })
    }
}

/// Exact-match lookup; the query text is never used as a LIKE pattern.
fn bank_query(criteria: &BankCriteria) -> String {
    let filter = match criteria {
        BankCriteria::Name(_) => "lower(name) = lower($1)",
        BankCriteria::Routing(_) => "routing = $1",
        BankCriteria::BankId(_) => "bank_id = $1",
        BankCriteria::Cert(_) => "cert = $1",
    };
    format!("SELECT {BANK_COLUMNS} FROM banks WHERE {filter} LIMIT 1")
}

fn parse_role(raw: &str) -> Result<Role, StoreError> {
    raw.parse::<Role>()
        .map_err(|e| StoreError::Decode(e.to_string()))
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn UserTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn credentials_by_email(&self, email: &str) -> Result<Option<Credentials>, StoreError> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            "SELECT user_id, password_hash, role, is_verified FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Credentials::try_from).transpose()
    }

    async fn user_role(&self, user_id: i64) -> Result<Option<Role>, StoreError> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        role.as_deref().map(parse_role).transpose()
    }

    async fn peer_group(&self, bank_id: i64) -> Result<Option<String>, StoreError> {
        let peer_group = sqlx::query_scalar(
            r#"
            SELECT peer_group
            FROM lookup_bank_peer
            WHERE bank_id = $1 AND is_default = true
            "#,
        )
        .bind(bank_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(peer_group)
    }

    async fn find_bank(&self, criteria: &BankCriteria) -> Result<Option<Bank>, StoreError> {
        let sql = bank_query(criteria);
        let query = sqlx::query_as::<_, Bank>(&sql);
        let query = match criteria {
            BankCriteria::Name(name) => query.bind(name.clone()),
            BankCriteria::Routing(routing) => query.bind(routing.clone()),
            BankCriteria::BankId(id) => query.bind(*id),
            BankCriteria::Cert(cert) => query.bind(*cert),
        };

        Ok(query.fetch_optional(&self.pool).await?)
    }

    async fn verification_for_email(
        &self,
        email: &str,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        let record = sqlx::query_as::<_, VerificationRecord>(
            r#"
            SELECT email, token_hash, expires_at, last_sent_at
            FROM email_verifications
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl ReportSource for PgStore {
    async fn recent_report_data(
        &self,
        bank_id: i64,
        limit: i64,
    ) -> Result<Vec<ReportFact>, StoreError> {
        let facts = sqlx::query_as::<_, ReportFact>(
            r#"
            SELECT date, bank_id, peer_group, name, metric, value, section::text AS section
            FROM report_data
            WHERE bank_id = $1
            ORDER BY date DESC
            LIMIT $2
            "#,
        )
        .bind(bank_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(facts)
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserTx for PgTx {
    async fn insert_user(&mut self, user: &NewUser) -> Result<i64, StoreError> {
        let user_id = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, password_hash, role, manager_id, bank_id, phone_number, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING user_id
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.manager_id)
        .bind(user.bank_id)
        .bind(&user.phone_number)
        .bind(user.is_verified)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(user_id)
    }

    async fn find_user(&mut self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn credentials_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Credentials>, StoreError> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            r#"
            SELECT user_id, password_hash, role, is_verified
            FROM users
            WHERE email = $1
            FOR UPDATE
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Credentials::try_from).transpose()
    }

    async fn update_profile(
        &mut self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                phone_number = COALESCE($3, phone_number)
            WHERE user_id = $4
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone_number)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn set_bank_id(&mut self, user_id: i64, bank_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE users SET bank_id = $1 WHERE user_id = $2")
            .bind(bank_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn record_login_attempt(&mut self, attempt: LoginAttempt) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO login_attempts (user_id, success) VALUES ($1, $2)")
            .bind(attempt.user_id)
            .bind(attempt.success)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn save_verification(&mut self, record: &VerificationRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO email_verifications (email, token_hash, expires_at, last_sent_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                expires_at = EXCLUDED.expires_at,
                last_sent_at = EXCLUDED.last_sent_at
            "#,
        )
        .bind(&record.email)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .bind(record.last_sent_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn verification_by_token(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        let record = sqlx::query_as::<_, VerificationRecord>(
            r#"
            SELECT email, token_hash, expires_at, last_sent_at
            FROM email_verifications
            WHERE token_hash = $1
            FOR UPDATE
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(record)
    }

    async fn delete_verification(&mut self, email: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM email_verifications WHERE email = $1")
            .bind(email)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn mark_verified(&mut self, email: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE users SET is_verified = true WHERE email = $1")
            .bind(email)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
