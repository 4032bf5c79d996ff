//! Outbound mail.

use async_trait::async_trait;

mod mailgun;
pub mod verification;

pub use mailgun::MailgunMailer;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport is not configured")]
    NotConfigured,
    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider rejected the message with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}
