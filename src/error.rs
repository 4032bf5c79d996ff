use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::provisioning::ProvisioningError;
use crate::result::{error_codes, error_to_api_response};
use crate::store::StoreError;

/// Errors as the HTTP boundary reports them.
///
/// Client-facing messages are fixed per variant; the detail is only logged.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("request timed out")]
    Timeout,
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },
    #[error("persistence failure: {0}")]
    Persistence(StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProvisioningError> for AppError {
    fn from(err: ProvisioningError) -> Self {
        match err {
            ProvisioningError::Validation(e) => AppError::Validation(e.to_string()),
            ProvisioningError::NoFieldsProvided
            | ProvisioningError::MissingPhoneNumber
            | ProvisioningError::InvalidVerificationToken => AppError::Validation(err.to_string()),
            ProvisioningError::InvalidCredentials | ProvisioningError::Unauthenticated(_) => {
                AppError::Unauthorized
            }
            ProvisioningError::Forbidden { .. } => AppError::Forbidden,
            ProvisioningError::NotFound(what) => AppError::NotFound(what),
            ProvisioningError::ResendCooldown => AppError::RateLimited {
                retry_after_secs: crate::mail::verification::resend_cooldown().num_seconds()
                    as u64,
            },
            ProvisioningError::Cancelled => AppError::Timeout,
            ProvisioningError::Persistence(e) => AppError::Persistence(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED),
            AppError::Forbidden => (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::Timeout => (StatusCode::REQUEST_TIMEOUT, error_codes::TIMEOUT),
            AppError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, error_codes::RATE_LIMIT),
            AppError::Persistence(StoreError::UniqueViolation(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::USER_EXISTS)
            }
            AppError::Persistence(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(detail) => detail.clone(),
            AppError::Unauthorized => "unauthorized".into(),
            AppError::Forbidden => "forbidden".into(),
            AppError::NotFound(what) => format!("{what} not found"),
            AppError::Timeout => "request timed out".into(),
            AppError::RateLimited { .. } => "too many requests".into(),
            AppError::Persistence(StoreError::UniqueViolation(_)) => "user already exists".into(),
            AppError::Persistence(_) | AppError::Internal(_) => "internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }

        let retry_after = match &self {
            AppError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response =
            (status, error_to_api_response::<()>(code, self.client_message())).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, Role};
    use crate::provisioning::ValidationError;

    fn status_of(err: ProvisioningError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn workflow_errors_map_to_taxonomy_statuses() {
        assert_eq!(
            status_of(ProvisioningError::Validation(ValidationError::InvalidEmail)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(ProvisioningError::NoFieldsProvided), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ProvisioningError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(ProvisioningError::Unauthenticated(AuthError::TokenExpired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ProvisioningError::Forbidden {
                actual: Role::Regular
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(ProvisioningError::NotFound("bank")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ProvisioningError::Cancelled), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            status_of(ProvisioningError::ResendCooldown),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(ProvisioningError::Persistence(StoreError::UniqueViolation(
                "users_email_key".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after_secs: 3,
        }
        .into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");
    }
}
