/// Cache operations, grouped by the data they cover
pub mod metadata;
pub mod report;

use std::sync::Arc;

use super::backend::{CacheError, CacheWrite, HashCache};
use super::keys::metadata_key;
use crate::store::ReportSource;

pub use report::REPORT_WINDOW;

#[derive(Clone)]
pub struct CacheLayer {
    backend: Arc<dyn HashCache>,
    reports: Arc<dyn ReportSource>,
}

impl CacheLayer {
    pub fn new(backend: Arc<dyn HashCache>, reports: Arc<dyn ReportSource>) -> Self {
        Self { backend, reports }
    }

    /// Drops the user's bank binding and report window in one atomic write.
    pub async fn invalidate(&self, user_id: i64) -> Result<(), CacheError> {
        let mut writes = vec![CacheWrite::Delete {
            key: metadata_key(user_id),
        }];
        writes.extend(self.report_deletes(user_id).await?);
        self.backend.apply_atomic(writes).await
    }
}
