//! Repository implementations using SQLite.

mod app_settings_repository;
mod auth_provider_repository;
mod credentials_repository;
mod source_repository;

pub use app_settings_repository::SqliteAppSettingsRepository;
pub use auth_provider_repository::SqliteAuthProviderRepository;
pub use credentials_repository::SqliteCredentialsRepository;
pub use source_repository::SqliteSourceRepository;

use chrono::{DateTime, Utc};

/// Parse a stored timestamp: RFC 3339, or SQLite's `datetime('now')` format.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return dt.and_utc();
    }
    tracing::warn!("[Storage] Unparseable timestamp '{}', using now", s);
    Utc::now()
}

pub(crate) fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|dt| parse_datetime(&dt))
}

/// Empty ids are stored as NULL so foreign keys hold.
pub(crate) fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}
