//! Read-through cache of derived account data.
//!
//! Entries are written only after the mutation they derive from has committed
//! and are never the source of truth. A miss is `Ok(None)`, not an error.

pub mod backend;
pub mod keys;
pub mod memory;
pub mod models;
pub mod operations;

pub use backend::{CacheError, CacheWrite, HashCache, RedisCache};
pub use memory::MemoryCache;
pub use models::BankMetadata;
pub use operations::{CacheLayer, REPORT_WINDOW};
