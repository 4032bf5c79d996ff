use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AuthContext, Role};
use crate::config::Config;

/// Why a presented token was rejected. Clients only ever see 401; the kind is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("token is malformed")]
    TokenMalformed,
    #[error("token has expired")]
    TokenExpired,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token carries a missing or unknown role")]
    InvalidRole,
}

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing secret is not configured")]
    MissingSecret,
    #[error("failed to sign token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
struct AccessClaims {
    user_id: i64,
    role: Role,
    exp: i64,
}

#[derive(Serialize)]
struct RefreshClaims {
    user_id: i64,
    exp: i64,
}

// Decoded loosely so that each claim can be checked and reported separately.
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    role: Option<Value>,
}

/// Mints and verifies HS256 access and refresh tokens with a single process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(
        secret: impl AsRef<[u8]>,
        access_ttl: std::time::Duration,
        refresh_ttl: std::time::Duration,
    ) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            access_ttl: Duration::seconds(access_ttl.as_secs() as i64),
            refresh_ttl: Duration::seconds(refresh_ttl.as_secs() as i64),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            config.access_token_expiry(),
            config.refresh_token_expiry(),
        )
    }

    pub fn issue_access_token(&self, user_id: i64, role: Role) -> Result<String, SigningError> {
        self.issue_access_token_at(user_id, role, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        user_id: i64,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, SigningError> {
        let claims = AccessClaims {
            user_id,
            role,
            exp: (now + self.access_ttl).timestamp(),
        };
        self.sign(&claims)
    }

    /// Refresh tokens carry no role; it is re-read from storage on exchange.
    pub fn issue_refresh_token(&self, user_id: i64) -> Result<String, SigningError> {
        self.issue_refresh_token_at(user_id, Utc::now())
    }

    pub fn issue_refresh_token_at(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<String, SigningError> {
        let claims = RefreshClaims {
            user_id,
            exp: (now + self.refresh_ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn issue_pair(&self, user_id: i64, role: Role) -> Result<TokenPair, SigningError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(user_id, role)?,
            refresh_token: self.issue_refresh_token(user_id)?,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = self.decode_raw(token)?;
        let user_id = numeric_user_id(claims.user_id.as_ref())?;
        let role = match claims.role {
            Some(Value::String(raw)) => raw.parse::<Role>().map_err(|_| AuthError::InvalidRole)?,
            _ => return Err(AuthError::InvalidRole),
        };
        Ok(AuthContext { user_id, role })
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<i64, AuthError> {
        let claims = self.decode_raw(token)?;
        // An access token is not a refresh token even though it carries the same subject.
        if claims.role.is_some() {
            return Err(AuthError::TokenMalformed);
        }
        numeric_user_id(claims.user_id.as_ref())
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, SigningError> {
        if self.secret.is_empty() {
            return Err(SigningError::MissingSecret);
        }
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )?)
    }

    fn decode_raw(&self, token: &str) -> Result<RawClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<RawClaims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::SignatureInvalid
                }
                _ => AuthError::TokenMalformed,
            })
    }
}

fn numeric_user_id(value: Option<&Value>) -> Result<i64, AuthError> {
    let value = value.ok_or(AuthError::TokenMalformed)?;
    value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        })
        .ok_or(AuthError::TokenMalformed)
}
