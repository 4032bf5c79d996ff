use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::validation::{validate_credentials, validate_phone_number};
use super::{
    AccountCreated, Delivery, ProvisioningError, ProvisioningService, checkpoint,
    require_elevated,
};
use crate::auth::{AuthContext, Role};
use crate::store::{NewUser, ProfileUpdate};

impl ProvisioningService {
    /// Creates an unverified elevated account, then mails a verification link.
    ///
    /// Mail delivery happens after the account has committed and its failure is
    /// reported in [`AccountCreated::verification`] instead of failing the call.
    pub async fn create_elevated_account(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<AccountCreated, ProvisioningError> {
        validate_credentials(email, password)?;

        checkpoint(cancel)?;
        let password_hash = self.hash_password(password.to_string()).await?;

        checkpoint(cancel)?;
        let mut tx = self.store.begin().await?;
        let user_id = tx
            .insert_user(&NewUser {
                email: email.to_string(),
                password_hash,
                role: Role::Elevated,
                manager_id: None,
                bank_id: None,
                phone_number: None,
                is_verified: false,
            })
            .await?;
        tx.commit().await?;
        info!(user_id, "elevated account created");

        let verification = match self.initiate_verification(email).await {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                warn!(user_id, error = %e, "verification email not sent");
                Delivery::Failed(e.to_string())
            }
        };

        Ok(AccountCreated {
            user_id,
            verification,
        })
    }

    /// Creates a pre-verified regular account owned by `manager`.
    ///
    /// The new account inherits the manager's current bank binding.
    pub async fn create_shared_account(
        &self,
        manager: &AuthContext,
        email: &str,
        password: &str,
        phone_number: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<i64, ProvisioningError> {
        require_elevated(manager.role)?;
        validate_credentials(email, password)?;
        let phone_number = phone_number
            .filter(|p| !p.trim().is_empty())
            .ok_or(ProvisioningError::MissingPhoneNumber)?;
        validate_phone_number(&phone_number)?;

        checkpoint(cancel)?;
        let password_hash = self.hash_password(password.to_string()).await?;

        checkpoint(cancel)?;
        let mut tx = self.store.begin().await?;
        let owner = tx
            .find_user(manager.user_id)
            .await?
            .ok_or(ProvisioningError::NotFound("manager account"))?;
        // The token role may be stale; the stored role decides.
        require_elevated(owner.role)?;

        let user_id = tx
            .insert_user(&NewUser {
                email: email.to_string(),
                password_hash,
                role: Role::Regular,
                manager_id: Some(owner.user_id),
                bank_id: owner.bank_id,
                phone_number: Some(phone_number),
                is_verified: true,
            })
            .await?;
        tx.commit().await?;

        info!(user_id, manager_id = owner.user_id, "shared account created");
        Ok(user_id)
    }

    /// Writes only the populated fields of `update` onto the caller's profile.
    pub async fn update_profile(
        &self,
        identity: &AuthContext,
        update: ProfileUpdate,
    ) -> Result<(), ProvisioningError> {
        check_profile_update(&update)?;

        let mut tx = self.store.begin().await?;
        let matched = tx.update_profile(identity.user_id, &update).await?;
        if matched == 0 {
            return Err(ProvisioningError::NotFound("account"));
        }
        tx.commit().await?;

        info!(user_id = identity.user_id, "profile updated");
        Ok(())
    }
}

pub(super) fn check_profile_update(update: &ProfileUpdate) -> Result<(), ProvisioningError> {
    if update.is_empty() {
        return Err(ProvisioningError::NoFieldsProvided);
    }
    if let Some(phone_number) = &update.phone_number {
        validate_phone_number(phone_number)?;
    }
    Ok(())
}
