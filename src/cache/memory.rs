use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::{CacheError, CacheWrite, HashCache};

type Hashes = HashMap<String, HashMap<String, String>>;

/// In-process [`HashCache`] for tests and local runs.
#[derive(Clone, Default)]
pub struct MemoryCache {
    hashes: Arc<RwLock<Hashes>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, as an unreachable server would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.hashes.read().await.contains_key(key)
    }
}

#[async_trait]
impl HashCache for MemoryCache {
    async fn apply_atomic(&self, writes: Vec<CacheWrite>) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("memory cache write disabled".into()));
        }

        let mut hashes = self.hashes.write().await;
        for write in writes {
            match write {
                CacheWrite::Delete { key } => {
                    hashes.remove(&key);
                }
                CacheWrite::HashSet { key, field, value } => {
                    hashes.entry(key).or_default().insert(field, value);
                }
            }
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        Ok(self.hashes.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .hashes
            .read()
            .await
            .get(key)
            .and_then(|fields| fields.get(field))
            .cloned())
    }
}
