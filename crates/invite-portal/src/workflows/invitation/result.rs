use chrono::{DateTime, Duration, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// An issued code together with its display strings and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResult {
    pub code: String,
    pub generated_at: String,
    pub expires_at: String,
    /// Expiry as epoch milliseconds.
    pub expires_timestamp: i64,
}

impl InvitationResult {
    /// Codes expire at the last second of the hour they were issued in.
    pub fn issued(code: impl Into<String>, now: DateTime<Local>) -> Self {
        let expiry = end_of_hour(now);
        Self {
            code: code.into(),
            generated_at: now.format("%Y/%m/%d %H:%M:%S").to_string(),
            expires_at: expiry.format("%H:%M").to_string(),
            expires_timestamp: expiry.timestamp_millis(),
        }
    }

    pub fn expires_at_instant(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_timestamp)
    }
}

fn end_of_hour(now: DateTime<Local>) -> DateTime<Local> {
    let elapsed = i64::from(now.minute() * 60 + now.second());
    now.with_nanosecond(0).unwrap_or(now) + Duration::seconds(3_599 - elapsed)
}
