use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::CacheLayer;
use crate::cache::backend::{CacheError, CacheWrite};
use crate::cache::keys::{report_data_key, report_section_key, report_sections_key};
use crate::cache::models::NULL_VALUE;

/// Number of most recent report rows cached per bank.
pub const REPORT_WINDOW: i64 = 5;

const DATE_FORMAT: &str = "%Y-%m-%d";

impl CacheLayer {
    /// Loads the recent report window for `bank_id` and caches it for the user.
    ///
    /// Returns the number of facts written.
    pub async fn set_report_data(&self, user_id: i64, bank_id: i64) -> Result<usize, CacheError> {
        let facts = self.reports.recent_report_data(bank_id, REPORT_WINDOW).await?;

        let lookup_key = report_data_key(user_id);
        let index_key = report_sections_key(user_id);
        let sections: BTreeSet<&str> = facts.iter().map(|f| f.section.as_str()).collect();

        // the whole previous window goes, including sections the new bank lacks
        let mut writes = self.report_deletes(user_id).await?;
        writes.extend(sections.into_iter().map(|section| CacheWrite::HashSet {
            key: index_key.clone(),
            field: section.to_string(),
            value: "1".to_string(),
        }));

        for fact in &facts {
            let date = fact.date.format(DATE_FORMAT).to_string();
            let value = fact.value.as_deref().unwrap_or(NULL_VALUE);
            writes.push(CacheWrite::HashSet {
                key: report_section_key(user_id, &fact.section),
                field: date.clone(),
                value: format!("{}:{}:{}", fact.name, fact.metric, value),
            });
            writes.push(CacheWrite::HashSet {
                key: lookup_key.clone(),
                field: format!("{}:{}", date, fact.metric),
                value: value.to_string(),
            });
        }

        self.backend.apply_atomic(writes).await?;
        tracing::debug!(user_id, bank_id, facts = facts.len(), "report data cached");
        Ok(facts.len())
    }

    /// Deletes for every report key written for `user_id`, found through the section index.
    pub(super) async fn report_deletes(&self, user_id: i64) -> Result<Vec<CacheWrite>, CacheError> {
        let index_key = report_sections_key(user_id);
        let previous = self.backend.hash_get_all(&index_key).await?;

        let mut writes = vec![
            CacheWrite::Delete {
                key: report_data_key(user_id),
            },
            CacheWrite::Delete { key: index_key },
        ];
        writes.extend(previous.into_keys().map(|section| CacheWrite::Delete {
            key: report_section_key(user_id, &section),
        }));
        Ok(writes)
    }

    /// Point lookup; `None` means the caller should read the database.
    pub async fn get_cached_report_data(
        &self,
        user_id: i64,
        date: NaiveDate,
        metric: &str,
    ) -> Result<Option<String>, CacheError> {
        let field = format!("{}:{}", date.format(DATE_FORMAT), metric);
        self.backend.hash_get(&report_data_key(user_id), &field).await
    }
}
