use serde::{Deserialize, Serialize};

pub const METADATA_BANK_ID: &str = "bank_id";
pub const METADATA_PEER_GROUP: &str = "peergroup";

/// Stored in place of a report value that is NULL in the database.
pub const NULL_VALUE: &str = "N/A";

/// Bank binding cached per user after the binding has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankMetadata {
    pub bank_id: i64,
    pub peer_group: String,
}
