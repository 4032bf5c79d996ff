/// Per-user key prefix
const USER_PREFIX: &str = "user:";

/// Bank binding hash (`bank_id`, `peergroup`)
pub fn metadata_key(user_id: i64) -> String {
    format!("{}{}:meta", USER_PREFIX, user_id)
}

/// Point-lookup hash, field `date:metric`
pub fn report_data_key(user_id: i64) -> String {
    format!("{}{}:report_data", USER_PREFIX, user_id)
}

/// Sections currently cached for the user, one field per section
pub fn report_sections_key(user_id: i64) -> String {
    format!("{}{}:report_sections", USER_PREFIX, user_id)
}

/// One hash per report section, field `date`
pub fn report_section_key(user_id: i64, section: &str) -> String {
    format!("{}{}:report_data:{}", USER_PREFIX, user_id, section)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_by_user() {
        assert_eq!(metadata_key(7), "user:7:meta");
        assert_eq!(report_data_key(7), "user:7:report_data");
        assert_eq!(report_section_key(7, "earnings"), "user:7:report_data:earnings");
        assert_eq!(report_sections_key(7), "user:7:report_sections");
    }
}
