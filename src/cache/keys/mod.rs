/// Cache key builders. Every key is scoped to one user.
pub mod user_keys;

pub use user_keys::{metadata_key, report_data_key, report_section_key, report_sections_key};
