use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::accounts::check_profile_update;
use super::{LoginOutcome, ProvisioningError, ProvisioningService, checkpoint};
use crate::auth::{Role, TokenPair};
use crate::store::{Credentials, LoginAttempt, ProfileUpdate, UserTx};

impl ProvisioningService {
    /// Checks credentials and, when the account is ready, issues a token pair.
    ///
    /// Wrong password and unknown email both return
    /// [`ProvisioningError::InvalidCredentials`] after one bcrypt verification.
    /// The attempt is recorded and committed on every terminal path.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<LoginOutcome, ProvisioningError> {
        checkpoint(cancel)?;

        let (mut tx, credentials) = self.check_credentials(email, password).await?;
        let Some(credentials) = credentials else {
            tx.commit().await?;
            return Err(ProvisioningError::InvalidCredentials);
        };

        let pending = pending_outcome(&mut *tx, &credentials).await?;
        tx.commit().await?;

        self.finish_login(&credentials, pending)
    }

    /// Applies a profile update for an account that cannot log in yet because its
    /// profile is incomplete, then behaves like [`login`](Self::login).
    pub async fn complete_profile(
        &self,
        email: &str,
        password: &str,
        update: ProfileUpdate,
        cancel: &CancellationToken,
    ) -> Result<LoginOutcome, ProvisioningError> {
        check_profile_update(&update)?;
        checkpoint(cancel)?;

        let (mut tx, credentials) = self.check_credentials(email, password).await?;
        let Some(credentials) = credentials else {
            tx.commit().await?;
            return Err(ProvisioningError::InvalidCredentials);
        };

        if credentials.is_verified {
            tx.update_profile(credentials.user_id, &update).await?;
        }
        let pending = pending_outcome(&mut *tx, &credentials).await?;
        tx.commit().await?;

        self.finish_login(&credentials, pending)
    }

    /// Exchanges a refresh token for a new pair, re-reading the role from storage.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, ProvisioningError> {
        let user_id = self.tokens.validate_refresh_token(refresh_token).map_err(|kind| {
            warn!(?kind, "refresh token rejected");
            ProvisioningError::Unauthenticated(kind)
        })?;

        let role = self
            .store
            .user_role(user_id)
            .await?
            .ok_or(ProvisioningError::InvalidCredentials)?;

        info!(user_id, %role, "session refreshed");
        Ok(self.tokens.issue_pair(user_id, role)?)
    }

    /// Verifies the password, then opens the transaction that logs the attempt.
    ///
    /// The bcrypt check runs on an unlocked read so no row lock or pooled
    /// connection is held while it works. The locked re-read must still show the
    /// same account and digest, otherwise the check counts as failed. Returns the
    /// open transaction and `None` for an unknown email or a wrong password.
    async fn check_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Box<dyn UserTx>, Option<Credentials>), ProvisioningError> {
        let seen = self.store.credentials_by_email(email).await?;
        let digest = seen
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |c| c.password_hash.clone());
        let password_matches = self.verify_password(digest, password.to_string()).await?;

        let mut tx = self.store.begin().await?;
        let current = tx.credentials_by_email(email).await?;
        let unchanged = match (&seen, &current) {
            (Some(seen), Some(current)) => {
                seen.user_id == current.user_id && seen.password_hash == current.password_hash
            }
            _ => false,
        };

        let user_id = current.as_ref().map(|c| c.user_id);
        let success = password_matches && unchanged;
        tx.record_login_attempt(LoginAttempt { user_id, success })
            .await?;

        if !success {
            info!(user_id, "login rejected");
            return Ok((tx, None));
        }
        Ok((tx, current))
    }

    fn finish_login(
        &self,
        credentials: &Credentials,
        pending: Option<LoginOutcome>,
    ) -> Result<LoginOutcome, ProvisioningError> {
        if let Some(outcome) = pending {
            info!(user_id = credentials.user_id, ?outcome, "login pending");
            return Ok(outcome);
        }

        let pair = self
            .tokens
            .issue_pair(credentials.user_id, credentials.role)?;
        info!(user_id = credentials.user_id, role = %credentials.role, "login succeeded");
        Ok(LoginOutcome::Authenticated(pair))
    }
}

/// Reasons a verified password still does not yield tokens.
async fn pending_outcome(
    tx: &mut dyn UserTx,
    credentials: &Credentials,
) -> Result<Option<LoginOutcome>, ProvisioningError> {
    if !credentials.is_verified {
        return Ok(Some(LoginOutcome::EmailNotVerified));
    }
    if credentials.role == Role::Elevated {
        let user = tx
            .find_user(credentials.user_id)
            .await?
            .ok_or(ProvisioningError::NotFound("account"))?;
        if !user.is_profile_complete() {
            return Ok(Some(LoginOutcome::ProfileIncomplete {
                user_id: credentials.user_id,
            }));
        }
    }
    Ok(None)
}
