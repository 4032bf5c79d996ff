/// Shapes of cached derived data
pub mod bank;

pub use bank::{BankMetadata, METADATA_BANK_ID, METADATA_PEER_GROUP, NULL_VALUE};
