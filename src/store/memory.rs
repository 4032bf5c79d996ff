use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::models::{
    Bank, BankCriteria, Credentials, LoginAttempt, NewUser, ProfileUpdate, ReportFact,
    UserRecord, VerificationRecord,
};
use super::{ReportSource, StoreError, UserStore, UserTx};
use crate::auth::Role;

#[derive(Debug, Clone)]
struct StoredUser {
    record: UserRecord,
    password_hash: String,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_user_id: i64,
    users: BTreeMap<i64, StoredUser>,
    login_attempts: Vec<LoginAttempt>,
    verifications: HashMap<String, VerificationRecord>,
    banks: BTreeMap<i64, Bank>,
    peer_groups: HashMap<i64, String>,
    report_data: Vec<ReportFact>,
}

impl MemoryState {
    fn credentials(&self, email: &str) -> Option<Credentials> {
        self.users
            .values()
            .find(|u| u.record.email == email)
            .map(|u| Credentials {
                user_id: u.record.user_id,
                password_hash: u.password_hash.clone(),
                role: u.record.role,
                is_verified: u.record.is_verified,
            })
    }

    fn find_bank(&self, criteria: &BankCriteria) -> Option<Bank> {
        self.banks
            .values()
            .find(|bank| match criteria {
                BankCriteria::Name(name) => bank
                    .name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name)),
                BankCriteria::Routing(routing) => bank.routing.as_deref() == Some(routing),
                BankCriteria::BankId(id) => bank.bank_id == *id,
                BankCriteria::Cert(cert) => bank.cert == Some(*cert),
            })
            .cloned()
    }
}

/// In-process store with the same constraint behavior as the Postgres schema.
///
/// Transactions serialize on a single lock. A transaction that is dropped
/// without `commit` restores the state it started from.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_bank(&self, bank: Bank, peer_group: Option<&str>) {
        let mut state = self.state.lock().await;
        if let Some(peer_group) = peer_group {
            state.peer_groups.insert(bank.bank_id, peer_group.to_string());
        }
        state.banks.insert(bank.bank_id, bank);
    }

    pub async fn insert_report_fact(&self, fact: ReportFact) {
        self.state.lock().await.report_data.push(fact);
    }

    pub async fn login_attempts(&self) -> Vec<LoginAttempt> {
        self.state.lock().await.login_attempts.clone()
    }

    pub async fn set_role(&self, user_id: i64, role: Role) -> bool {
        let mut state = self.state.lock().await;
        match state.users.get_mut(&user_id) {
            Some(user) => {
                user.record.role = role;
                true
            }
            None => false,
        }
    }

    /// True while a transaction holds the store.
    pub fn is_locked(&self) -> bool {
        self.state.try_lock().is_err()
    }

    pub async fn verification_count(&self) -> usize {
        self.state.lock().await.verifications.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UserTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).map(|u| u.record.clone()))
    }

    async fn credentials_by_email(&self, email: &str) -> Result<Option<Credentials>, StoreError> {
        Ok(self.state.lock().await.credentials(email))
    }

    async fn user_role(&self, user_id: i64) -> Result<Option<Role>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).map(|u| u.record.role))
    }

    async fn peer_group(&self, bank_id: i64) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().await.peer_groups.get(&bank_id).cloned())
    }

    async fn find_bank(&self, criteria: &BankCriteria) -> Result<Option<Bank>, StoreError> {
        Ok(self.state.lock().await.find_bank(criteria))
    }

    async fn verification_for_email(
        &self,
        email: &str,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self.state.lock().await.verifications.get(email).cloned())
    }
}

#[async_trait]
impl ReportSource for MemoryStore {
    async fn recent_report_data(
        &self,
        bank_id: i64,
        limit: i64,
    ) -> Result<Vec<ReportFact>, StoreError> {
        let state = self.state.lock().await;
        let mut facts: Vec<ReportFact> = state
            .report_data
            .iter()
            .filter(|f| f.bank_id == bank_id)
            .cloned()
            .collect();
        facts.sort_by(|a, b| b.date.cmp(&a.date));
        facts.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(facts)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    /// State at `begin`; taken on commit.
    snapshot: Option<MemoryState>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl UserTx for MemoryTx {
    async fn insert_user(&mut self, user: &NewUser) -> Result<i64, StoreError> {
        let state = &mut *self.guard;
        if state.users.values().any(|u| u.record.email == user.email) {
            return Err(StoreError::UniqueViolation(
                "duplicate key value violates unique constraint \"users_email_key\"".into(),
            ));
        }
        if let Some(manager_id) = user.manager_id {
            if !state.users.contains_key(&manager_id) {
                return Err(StoreError::ForeignKeyViolation(
                    "insert on table \"users\" violates foreign key \"users_manager_id_fkey\""
                        .into(),
                ));
            }
        }

        state.next_user_id += 1;
        let user_id = state.next_user_id;
        state.users.insert(
            user_id,
            StoredUser {
                record: UserRecord {
                    user_id,
                    email: user.email.clone(),
                    role: user.role,
                    manager_id: user.manager_id,
                    bank_id: user.bank_id,
                    is_verified: user.is_verified,
                    phone_number: user.phone_number.clone(),
                    first_name: None,
                    last_name: None,
                },
                password_hash: user.password_hash.clone(),
            },
        );
        Ok(user_id)
    }

    async fn find_user(&mut self, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.guard.users.get(&user_id).map(|u| u.record.clone()))
    }

    async fn credentials_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<Credentials>, StoreError> {
        Ok(self.guard.credentials(email))
    }

    async fn update_profile(
        &mut self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<u64, StoreError> {
        let Some(user) = self.guard.users.get_mut(&user_id) else {
            return Ok(0);
        };
        if let Some(first_name) = &update.first_name {
            user.record.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &update.last_name {
            user.record.last_name = Some(last_name.clone());
        }
        if let Some(phone_number) = &update.phone_number {
            user.record.phone_number = Some(phone_number.clone());
        }
        Ok(1)
    }

    async fn set_bank_id(&mut self, user_id: i64, bank_id: i64) -> Result<u64, StoreError> {
        let state = &mut *self.guard;
        if !state.banks.contains_key(&bank_id) {
            return Err(StoreError::ForeignKeyViolation(
                "update on table \"users\" violates foreign key \"users_bank_id_fkey\"".into(),
            ));
        }
        match state.users.get_mut(&user_id) {
            Some(user) => {
                user.record.bank_id = Some(bank_id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn record_login_attempt(&mut self, attempt: LoginAttempt) -> Result<(), StoreError> {
        self.guard.login_attempts.push(attempt);
        Ok(())
    }

    async fn save_verification(&mut self, record: &VerificationRecord) -> Result<(), StoreError> {
        self.guard
            .verifications
            .insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn verification_by_token(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        Ok(self
            .guard
            .verifications
            .values()
            .find(|v| v.token_hash == token_hash)
            .cloned())
    }

    async fn delete_verification(&mut self, email: &str) -> Result<(), StoreError> {
        self.guard.verifications.remove(email);
        Ok(())
    }

    async fn mark_verified(&mut self, email: &str) -> Result<u64, StoreError> {
        let mut affected = 0;
        for user in self.guard.users.values_mut() {
            if user.record.email == email {
                user.record.is_verified = true;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tx = self;
        tx.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
