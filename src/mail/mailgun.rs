use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{MailError, Mailer};
use crate::config::Config;

const MAILGUN_API_BASE: &str = "https://api.mailgun.net/v3";

/// Sends plain-text mail through the Mailgun messages API.
pub struct MailgunMailer {
    domain: String,
    api_key: String,
    http_client: Client,
}

impl MailgunMailer {
    pub fn new(domain: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            api_key: api_key.into(),
            http_client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.mailgun_domain, &config.mailgun_api_key)
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if self.domain.is_empty() || self.api_key.is_empty() {
            return Err(MailError::NotConfigured);
        }

        let from = format!("no-reply@{}", self.domain);
        let params = [
            ("from", from.as_str()),
            ("to", to),
            ("subject", subject),
            ("text", body),
        ];

        let response = self
            .http_client
            .post(format!("{}/{}/messages", MAILGUN_API_BASE, self.domain))
            .basic_auth("api", Some(&self.api_key))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status.as_u16()));
        }

        tracing::debug!(to, "verification mail accepted by provider");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_transport_refuses_to_send() {
        let mailer = MailgunMailer::new("", "");
        assert!(matches!(
            mailer.send("a@x.com", "s", "b").await,
            Err(MailError::NotConfigured)
        ));
    }
}
