//! Token fixtures

use chrono::{Duration, Utc};

use crate::auth::TokenRecord;

/// Record obtained `age_seconds` ago with a lifetime of `expires_in` seconds
#[must_use]
pub fn token_record(age_seconds: i64, expires_in: i64) -> TokenRecord {
    TokenRecord {
        access_token: "cached_access_token".to_string(),
        refresh_token: Some("cached_refresh_token".to_string()),
        token_type: "Bearer".to_string(),
        expires_in,
        scope: Some("offline_access read write".to_string()),
        remote_user_id: Some(1001),
        obtained_at: Utc::now() - Duration::seconds(age_seconds),
    }
}
