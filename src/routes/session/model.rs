use serde::{Deserialize, Serialize};

use crate::auth::TokenPair;
use crate::provisioning::LoginOutcome;

pub const PROFILE_INCOMPLETE_MESSAGE: &str =
    "profile incomplete. Please update your profile details.";
pub const EMAIL_NOT_VERIFIED_MESSAGE: &str = "email not verified. Please verify your email.";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Tokens {
        token: String,
        refresh_token: String,
    },
    Pending {
        message: String,
    },
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated(pair) => LoginResponse::Tokens {
                token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            LoginOutcome::ProfileIncomplete { .. } => LoginResponse::Pending {
                message: PROFILE_INCOMPLETE_MESSAGE.to_string(),
            },
            LoginOutcome::EmailNotVerified => LoginResponse::Pending {
                message: EMAIL_NOT_VERIFIED_MESSAGE.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for RefreshTokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}
