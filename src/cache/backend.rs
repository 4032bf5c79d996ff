use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cached entry is corrupt: {0}")]
    Corrupt(String),
    #[error("failed to read source data: {0}")]
    Source(#[from] StoreError),
}

/// One step of an atomic cache write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWrite {
    Delete { key: String },
    HashSet { key: String, field: String, value: String },
}

/// Hash-oriented key-value cache.
#[async_trait]
pub trait HashCache: Send + Sync {
    /// Applies every write or none of them.
    async fn apply_atomic(&self, writes: Vec<CacheWrite>) -> Result<(), CacheError>;

    /// Empty map when the key is absent.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError>;

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, CacheError>;
}

#[derive(Clone)]
pub struct RedisCache {
    client: Arc<RedisClient>,
}

impl RedisCache {
    pub fn new(client: Arc<RedisClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HashCache for RedisCache {
    async fn apply_atomic(&self, writes: Vec<CacheWrite>) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // MULTI/EXEC so readers never see a half-written window
        let mut pipe = redis::pipe();
        pipe.atomic();
        for write in &writes {
            match write {
                CacheWrite::Delete { key } => {
                    pipe.del(key).ignore();
                }
                CacheWrite::HashSet { key, field, value } => {
                    pipe.hset(key, field, value).ignore();
                }
            }
        }

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }
}
