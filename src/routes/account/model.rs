use serde::{Deserialize, Serialize};

use crate::provisioning::{AccountCreated, Delivery};
use crate::store::ProfileUpdate;

#[derive(Debug, Deserialize)]
pub struct CreateElevatedUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CreateElevatedUserResponse {
    pub user_id: i64,
    pub verification_email_sent: bool,
    pub message: String,
}

impl From<AccountCreated> for CreateElevatedUserResponse {
    fn from(created: AccountCreated) -> Self {
        let (sent, message) = match created.verification {
            Delivery::Sent => (true, "User created successfully".to_string()),
            Delivery::Failed(_) => (
                false,
                "User created, but the verification email could not be sent".to_string(),
            ),
        };
        Self {
            user_id: created.user_id,
            verification_email_sent: sent,
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSharedAccountRequest {
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSharedAccountResponse {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CompleteProfileRequest {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: ProfileUpdate,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
