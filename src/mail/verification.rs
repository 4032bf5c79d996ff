use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::store::VerificationRecord;

pub const VERIFICATION_SUBJECT: &str = "Please verify your email";

pub fn token_lifetime() -> Duration {
    Duration::hours(24)
}

pub fn resend_cooldown() -> Duration {
    Duration::minutes(5)
}

/// 32 hex characters from a random v4 UUID.
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn verification_body(verification_url: &str, token: &str) -> String {
    format!(
        "Please verify your email by clicking the following link: {}?token={}",
        verification_url, token
    )
}

/// Pending verification row for a freshly generated `token`.
pub fn pending_record(email: &str, token: &str, now: DateTime<Utc>) -> VerificationRecord {
    VerificationRecord {
        email: email.to_string(),
        token_hash: hash_token(token),
        expires_at: now + token_lifetime(),
        last_sent_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn stored_hash_differs_from_token() {
        let token = generate_token();
        let hashed = hash_token(&token);
        assert_eq!(hashed.len(), 64);
        assert_ne!(hashed, token);
        assert_eq!(hashed, hash_token(&token));
    }

    #[test]
    fn record_expires_a_day_after_sending() {
        let now = Utc::now();
        let record = pending_record("a@x.com", "abc", now);
        assert_eq!(record.expires_at - record.last_sent_at, Duration::hours(24));
        assert_eq!(record.token_hash, hash_token("abc"));
    }

    #[test]
    fn body_links_to_verification_url() {
        assert_eq!(
            verification_body("https://app/verify-email", "t0k"),
            "Please verify your email by clicking the following link: https://app/verify-email?token=t0k"
        );
    }
}
