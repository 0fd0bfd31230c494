pub mod entry;
pub mod version_filter;
