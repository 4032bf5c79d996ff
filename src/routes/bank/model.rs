use serde::{Deserialize, Serialize};

use crate::provisioning::{BankBound, CacheStatus};

#[derive(Debug, Deserialize)]
pub struct ConfirmBankRequest {
    pub bank_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ConfirmBankResponse {
    pub bank_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_group: Option<String>,
    /// False when the binding committed but the cache could not be warmed.
    pub cache_populated: bool,
    pub message: String,
}

impl From<BankBound> for ConfirmBankResponse {
    fn from(bound: BankBound) -> Self {
        let (cache_populated, message) = match bound.cache {
            CacheStatus::Populated { .. } => (true, "Bank information updated successfully"),
            CacheStatus::Degraded(_) => (
                false,
                "Bank information updated; cached report data is unavailable",
            ),
        };
        Self {
            bank_id: bound.bank_id,
            peer_group: bound.peer_group,
            cache_populated,
            message: message.to_string(),
        }
    }
}
