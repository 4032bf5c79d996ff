use super::CacheLayer;
use crate::cache::backend::{CacheError, CacheWrite};
use crate::cache::keys::metadata_key;
use crate::cache::models::{BankMetadata, METADATA_BANK_ID, METADATA_PEER_GROUP};

impl CacheLayer {
    /// Replaces the user's cached bank binding.
    pub async fn set_metadata(
        &self,
        user_id: i64,
        bank_id: i64,
        peer_group: &str,
    ) -> Result<(), CacheError> {
        let key = metadata_key(user_id);
        self.backend
            .apply_atomic(vec![
                CacheWrite::Delete { key: key.clone() },
                CacheWrite::HashSet {
                    key: key.clone(),
                    field: METADATA_BANK_ID.to_string(),
                    value: bank_id.to_string(),
                },
                CacheWrite::HashSet {
                    key,
                    field: METADATA_PEER_GROUP.to_string(),
                    value: peer_group.to_string(),
                },
            ])
            .await
    }

    pub async fn get_metadata(&self, user_id: i64) -> Result<Option<BankMetadata>, CacheError> {
        let key = metadata_key(user_id);
        let fields = self.backend.hash_get_all(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let bank_id = fields
            .get(METADATA_BANK_ID)
            .and_then(|raw| raw.parse::<i64>().ok())
            .ok_or_else(|| CacheError::Corrupt(format!("{key}: bad {METADATA_BANK_ID}")))?;
        let peer_group = fields
            .get(METADATA_PEER_GROUP)
            .cloned()
            .ok_or_else(|| CacheError::Corrupt(format!("{key}: missing {METADATA_PEER_GROUP}")))?;

        Ok(Some(BankMetadata {
            bank_id,
            peer_group,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::cache::backend::{CacheWrite, HashCache};
    use crate::cache::memory::MemoryCache;
    use crate::cache::{BankMetadata, CacheError, CacheLayer};
    use crate::store::MemoryStore;

    fn layer(cache: &MemoryCache) -> CacheLayer {
        CacheLayer::new(Arc::new(cache.clone()), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn cold_cache_is_a_miss() {
        let cache = MemoryCache::new();
        assert_eq!(layer(&cache).get_metadata(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_metadata() {
        let cache = MemoryCache::new();
        let layer = layer(&cache);
        layer.set_metadata(1, 37, "PG-A").await.unwrap();
        layer.set_metadata(1, 38, "PG-B").await.unwrap();

        assert_eq!(
            layer.get_metadata(1).await.unwrap(),
            Some(BankMetadata {
                bank_id: 38,
                peer_group: "PG-B".into()
            })
        );
    }

    #[tokio::test]
    async fn invalidate_clears_binding_and_report_keys() {
        let cache = MemoryCache::new();
        let layer = layer(&cache);
        layer.set_metadata(1, 37, "PG-A").await.unwrap();
        cache
            .apply_atomic(vec![
                CacheWrite::HashSet {
                    key: "user:1:report_sections".into(),
                    field: "earnings".into(),
                    value: "1".into(),
                },
                CacheWrite::HashSet {
                    key: "user:1:report_data:earnings".into(),
                    field: "2024-03-01".into(),
                    value: "First Bank:roa:1.2".into(),
                },
            ])
            .await
            .unwrap();

        layer.invalidate(1).await.unwrap();

        assert_eq!(layer.get_metadata(1).await.unwrap(), None);
        assert!(!cache.contains_key("user:1:report_data:earnings").await);
        assert!(!cache.contains_key("user:1:report_sections").await);
    }

    #[tokio::test]
    async fn unparsable_bank_id_is_corrupt() {
        let cache = MemoryCache::new();
        cache
            .apply_atomic(vec![CacheWrite::HashSet {
                key: "user:1:meta".into(),
                field: "bank_id".into(),
                value: "abc".into(),
            }])
            .await
            .unwrap();

        assert!(matches!(
            layer(&cache).get_metadata(1).await,
            Err(CacheError::Corrupt(_))
        ));
    }
}
