use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Access and refresh tokens issued by the console's token endpoint.
///
/// The same JSON shape is used for the remote token payload and for the
/// local cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry as unix epoch seconds.
    pub expires_at: i64,
}

impl TokenSet {
    /// A token is usable only while its expiry lies strictly in the future.
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at > now
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(unix_now())
    }

    /// Expiry as a `SystemTime`, clamped to the epoch for negative values
    pub fn expires_at_time(&self) -> SystemTime {
        UNIX_EPOCH + std::time::Duration::from_secs(self.expires_at.max(0) as u64)
    }
}

/// Current time in unix epoch seconds
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
