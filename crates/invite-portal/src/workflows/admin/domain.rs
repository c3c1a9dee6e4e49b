use serde::{Deserialize, Serialize};

use crate::workflows::intake::domain::{lenient_text, ScoreData};

/// One issued code as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub identity: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub region: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub code: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: String,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreData>,
}

impl AdminRecord {
    /// Scores that were actually entered, excluding the closed-window placeholder.
    pub fn entered_scores(&self) -> Option<&ScoreData> {
        self.scores.as_ref().filter(|scores| !scores.is_placeholder())
    }
}

/// Anything other than `expired` is treated as active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RecordStatus {
    #[default]
    Active,
    Expired,
}

impl RecordStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Expired,
            Self::Expired => Self::Active,
        }
    }
}

impl From<String> for RecordStatus {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("expired") {
            Self::Expired
        } else {
            Self::Active
        }
    }
}

/// Record fields that can drive the table sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Id,
    Email,
    Identity,
    Region,
    Source,
    Code,
    Timestamp,
    Status,
}

impl SortKey {
    pub fn value<'a>(&self, record: &'a AdminRecord) -> &'a str {
        match self {
            Self::Id => &record.id,
            Self::Email => &record.email,
            Self::Identity => &record.identity,
            Self::Region => &record.region,
            Self::Source => &record.source,
            Self::Code => &record.code,
            Self::Timestamp => &record.timestamp,
            Self::Status => record.status.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
        }
    }

    /// Same key while ascending flips to descending; anything else starts
    /// ascending on `key`.
    pub fn toggle(current: Option<SortState>, key: SortKey) -> SortState {
        match current {
            Some(state) if state.key == key && state.direction == SortDirection::Ascending => {
                SortState {
                    key,
                    direction: SortDirection::Descending,
                }
            }
            _ => SortState::ascending(key),
        }
    }
}
