use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::validation::ValidationError;
use super::{
    BankBound, CacheStatus, ProvisioningError, ProvisioningService, checkpoint, require_elevated,
};
use crate::auth::AuthContext;
use crate::store::{Bank, BankCriteria, StoreError};

const ROUTING_DIGITS: usize = 9;

/// A bank as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankInfo {
    pub bank_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

impl From<Bank> for BankInfo {
    fn from(bank: Bank) -> Self {
        Self {
            bank_id: bank.bank_id,
            cert: bank.cert,
            routing: bank.routing.as_deref().map(pad_routing_number),
            name: bank.name.as_deref().map(capitalize_words),
            address: bank.address.as_deref().map(capitalize_words),
            city: bank.city.as_deref().map(capitalize_words),
            state: bank.state.map(|s| s.trim().to_string()),
            zip: bank.zip.map(|s| s.trim().to_string()),
        }
    }
}

impl ProvisioningService {
    /// Binds the caller to `bank_id`, then warms the cache.
    ///
    /// The binding is committed before any cache work. Failures after the commit
    /// come back as [`CacheStatus::Degraded`] with the binding left in place and
    /// the user's cache entries cleared.
    pub async fn bind_bank(
        &self,
        identity: &AuthContext,
        bank_id: i64,
        cancel: &CancellationToken,
    ) -> Result<BankBound, ProvisioningError> {
        require_elevated(identity.role)?;
        checkpoint(cancel)?;

        let mut tx = self.store.begin().await?;
        let matched = tx
            .set_bank_id(identity.user_id, bank_id)
            .await
            .map_err(|e| match e {
                StoreError::ForeignKeyViolation(_) => ProvisioningError::NotFound("bank"),
                other => other.into(),
            })?;
        if matched == 0 {
            return Err(ProvisioningError::NotFound("account"));
        }
        tx.commit().await?;
        info!(user_id = identity.user_id, bank_id, "bank bound");

        let (peer_group, cache) = self.populate_cache(identity.user_id, bank_id, cancel).await;
        if let CacheStatus::Degraded(reason) = &cache {
            warn!(user_id = identity.user_id, bank_id, %reason, "bank bound but cache not populated");
            // entries from an earlier binding must not outlive it
            if let Err(e) = self.cache.invalidate(identity.user_id).await {
                warn!(user_id = identity.user_id, error = %e, "stale cache entries not cleared");
            }
        }

        Ok(BankBound {
            bank_id,
            peer_group,
            cache,
        })
    }

    async fn populate_cache(
        &self,
        user_id: i64,
        bank_id: i64,
        cancel: &CancellationToken,
    ) -> (Option<String>, CacheStatus) {
        if cancel.is_cancelled() {
            return (None, CacheStatus::Degraded("cancelled".into()));
        }

        let peer_group = match self.store.peer_group(bank_id).await {
            Ok(Some(peer_group)) => peer_group,
            Ok(None) => return (None, CacheStatus::Degraded("no default peer group".into())),
            Err(e) => return (None, CacheStatus::Degraded(e.to_string())),
        };

        if let Err(e) = self.cache.set_metadata(user_id, bank_id, &peer_group).await {
            return (Some(peer_group), CacheStatus::Degraded(e.to_string()));
        }

        if cancel.is_cancelled() {
            return (Some(peer_group), CacheStatus::Degraded("cancelled".into()));
        }

        let status = match self.cache.set_report_data(user_id, bank_id).await {
            Ok(facts) => CacheStatus::Populated { facts },
            Err(e) => CacheStatus::Degraded(e.to_string()),
        };
        (Some(peer_group), status)
    }

    /// Looks a bank up by name, routing number, bank id, then certificate number.
    pub async fn find_bank(&self, query: &str) -> Result<BankInfo, ProvisioningError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }

        let mut criteria = vec![
            BankCriteria::Name(query.to_string()),
            BankCriteria::Routing(strip_leading_zeros(query)),
        ];
        if let Ok(number) = query.parse::<i64>() {
            criteria.push(BankCriteria::BankId(number));
            criteria.push(BankCriteria::Cert(number));
        }

        for criterion in &criteria {
            if let Some(bank) = self.store.find_bank(criterion).await? {
                return Ok(bank.into());
            }
        }
        Err(ProvisioningError::NotFound("bank"))
    }
}

/// Routing numbers are stored without leading zeros.
fn strip_leading_zeros(routing: &str) -> String {
    let stripped = routing.trim_start_matches('0');
    if stripped.is_empty() {
        "0".repeat(ROUTING_DIGITS)
    } else {
        stripped.to_string()
    }
}

fn pad_routing_number(routing: &str) -> String {
    let trimmed = routing.trim();
    if trimmed.len() >= ROUTING_DIGITS {
        trimmed.chars().take(ROUTING_DIGITS).collect()
    } else {
        format!("{:0>width$}", trimmed, width = ROUTING_DIGITS)
    }
}

fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_is_padded_to_nine_digits() {
        assert_eq!(pad_routing_number("21000021"), "021000021");
        assert_eq!(pad_routing_number(" 123 "), "000000123");
        assert_eq!(pad_routing_number("1234567890"), "123456789");
    }

    #[test]
    fn leading_zeros_are_stripped_for_lookup() {
        assert_eq!(strip_leading_zeros("021000021"), "21000021");
        assert_eq!(strip_leading_zeros("0000"), "000000000");
    }

    #[test]
    fn words_are_title_cased_and_collapsed() {
        assert_eq!(capitalize_words("FIRST  national BANK "), "First National Bank");
        assert_eq!(capitalize_words(""), "");
    }

    #[test]
    fn bank_info_formats_every_field() {
        let info = BankInfo::from(Bank {
            bank_id: 37,
            cert: Some(3511),
            routing: Some("21000021".into()),
            name: Some("JPMORGAN CHASE BANK".into()),
            address: Some(" 1111 polaris PKWY ".into()),
            city: Some("COLUMBUS ".into()),
            state: Some(" OH".into()),
            zip: Some("43240 ".into()),
        });

        assert_eq!(info.routing.as_deref(), Some("021000021"));
        assert_eq!(info.name.as_deref(), Some("Jpmorgan Chase Bank"));
        assert_eq!(info.address.as_deref(), Some("1111 Polaris Pkwy"));
        assert_eq!(info.city.as_deref(), Some("Columbus"));
        assert_eq!(info.state.as_deref(), Some("OH"));
        assert_eq!(info.zip.as_deref(), Some("43240"));
    }
}
