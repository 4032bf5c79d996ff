use chrono::Utc;
use tracing::{info, warn};

use super::validation::validate_email;
use super::{ProvisioningError, ProvisioningService};
use crate::mail::verification::{
    VERIFICATION_SUBJECT, generate_token, hash_token, pending_record, resend_cooldown,
    verification_body,
};

impl ProvisioningService {
    /// Stores a fresh verification token for `email` and mails it.
    ///
    /// The token is only kept if the mail was accepted.
    pub(super) async fn initiate_verification(&self, email: &str) -> Result<(), ProvisioningError> {
        let token = generate_token();
        let record = pending_record(email, &token, Utc::now());

        let mut tx = self.store.begin().await?;
        tx.save_verification(&record).await?;

        let body = verification_body(&self.verification_url, &token);
        if let Err(e) = self.mailer.send(email, VERIFICATION_SUBJECT, &body).await {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback after failed verification mail");
            }
            return Err(e.into());
        }

        tx.commit().await?;
        Ok(())
    }

    /// Marks the account behind `token` as verified and consumes the token.
    pub async fn verify_email(&self, token: &str) -> Result<(), ProvisioningError> {
        let mut tx = self.store.begin().await?;
        let record = tx
            .verification_by_token(&hash_token(token))
            .await?
            .ok_or(ProvisioningError::InvalidVerificationToken)?;
        if record.expires_at < Utc::now() {
            return Err(ProvisioningError::InvalidVerificationToken);
        }

        if tx.mark_verified(&record.email).await? == 0 {
            return Err(ProvisioningError::NotFound("account"));
        }
        tx.delete_verification(&record.email).await?;
        tx.commit().await?;

        info!(email = %record.email, "email verified");
        Ok(())
    }

    /// Sends a new verification link unless one went out within the cooldown.
    pub async fn resend_verification(&self, email: &str) -> Result<(), ProvisioningError> {
        validate_email(email)?;

        let pending = self
            .store
            .verification_for_email(email)
            .await?
            .ok_or(ProvisioningError::NotFound("pending verification"))?;
        if Utc::now() - pending.last_sent_at < resend_cooldown() {
            return Err(ProvisioningError::ResendCooldown);
        }

        self.initiate_verification(email).await?;
        info!(email, "verification email resent");
        Ok(())
    }
}
