use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque identifier for an applicant or operator session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Step-one fields; all four are required before the applicant can continue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Email,
    Identity,
    Region,
    Source,
}

impl ContactField {
    pub const ALL: [ContactField; 4] = [
        ContactField::Email,
        ContactField::Identity,
        ContactField::Region,
        ContactField::Source,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Identity => "identity",
            Self::Region => "region",
            Self::Source => "source",
        }
    }
}

impl ContactDetails {
    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::Email => &self.email,
            ContactField::Identity => &self.identity,
            ContactField::Region => &self.region,
            ContactField::Source => &self.source,
        }
    }

    pub fn set(&mut self, field: ContactField, value: impl Into<String>) {
        let slot = match field {
            ContactField::Email => &mut self.email,
            ContactField::Identity => &mut self.identity,
            ContactField::Region => &mut self.region,
            ContactField::Source => &mut self.source,
        };
        *slot = value.into();
    }

    pub fn missing_fields(&self) -> Vec<ContactField> {
        ContactField::ALL
            .into_iter()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Subjects carrying a letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Chinese,
    Math,
    English,
    Social,
    Science,
}

impl Subject {
    pub const GRADED: [Subject; 5] = [
        Subject::Chinese,
        Subject::Math,
        Subject::English,
        Subject::Social,
        Subject::Science,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Chinese => "Chinese",
            Self::Math => "Math",
            Self::English => "English",
            Self::Social => "Social",
            Self::Science => "Science",
        }
    }
}

/// Letter grades from best to worst.
pub const GRADE_SCALE: [&str; 7] = ["A++", "A+", "A", "B++", "B+", "B", "C"];

/// Exam results and rank interval. Values are free-form strings; the backend
/// owns numeric validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreData {
    #[serde(default, deserialize_with = "lenient_text")]
    pub chinese: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub math: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub english: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub social: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub science: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub composition: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rank_min_percent: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rank_max_percent: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rank_min: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub rank_max: String,
}

impl ScoreData {
    /// Reserved value filling every field of the placeholder.
    pub const UNSET: &'static str = "1";

    /// Substituted for real scores while the score-entry window is closed.
    pub fn placeholder() -> Self {
        let unset = || Self::UNSET.to_string();
        Self {
            chinese: unset(),
            math: unset(),
            english: unset(),
            social: unset(),
            science: unset(),
            composition: unset(),
            rank_min_percent: unset(),
            rank_max_percent: unset(),
            rank_min: unset(),
            rank_max: unset(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.query_pairs()
            .iter()
            .all(|(_, value)| *value == Self::UNSET)
    }

    pub fn grade(&self, subject: Subject) -> &str {
        match subject {
            Subject::Chinese => &self.chinese,
            Subject::Math => &self.math,
            Subject::English => &self.english,
            Subject::Social => &self.social,
            Subject::Science => &self.science,
        }
    }

    /// Wire names of the fields left blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.query_pairs()
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// Field names and values in the order the issuing backend expects.
    pub fn query_pairs(&self) -> [(&'static str, &str); 10] {
        [
            ("chinese", &self.chinese),
            ("math", &self.math),
            ("english", &self.english),
            ("social", &self.social),
            ("science", &self.science),
            ("composition", &self.composition),
            ("rankMinPercent", &self.rank_min_percent),
            ("rankMaxPercent", &self.rank_max_percent),
            ("rankMin", &self.rank_min),
            ("rankMax", &self.rank_max),
        ]
    }
}

/// Sheet-backed stores hand numbers back for numeric-looking cells.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Text(String),
        Integer(i64),
        Float(f64),
        Flag(bool),
    }

    Ok(match Option::<Cell>::deserialize(deserializer)? {
        Some(Cell::Text(text)) => text,
        Some(Cell::Integer(value)) => value.to_string(),
        Some(Cell::Float(value)) => value.to_string(),
        Some(Cell::Flag(value)) => value.to_string(),
        None => String::new(),
    })
}

/// Everything sent to the issuing backend for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantSubmission {
    #[serde(flatten)]
    pub contact: ContactDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreData>,
}

impl ApplicantSubmission {
    pub fn carries_real_scores(&self) -> bool {
        self.scores
            .as_ref()
            .is_some_and(|scores| !scores.is_placeholder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_recognised() {
        assert!(ScoreData::placeholder().is_placeholder());
        let mut partial = ScoreData::placeholder();
        partial.math = "A+".to_string();
        assert!(!partial.is_placeholder());
        assert!(!ScoreData::default().is_placeholder());
    }

    #[test]
    fn missing_fields_reports_blank_entries() {
        let details = ContactDetails {
            email: "someone@example.com".to_string(),
            identity: "  ".to_string(),
            region: "North".to_string(),
            source: String::new(),
        };
        assert_eq!(
            details.missing_fields(),
            vec![ContactField::Identity, ContactField::Source]
        );
        assert!(!details.is_complete());
    }

    #[test]
    fn scores_accept_numeric_cells() {
        let scores: ScoreData = serde_json::from_str(
            r#"{"chinese":"A+","rankMinPercent":1.5,"rankMin":320,"rankMax":null}"#,
        )
        .expect("scores parse");
        assert_eq!(scores.chinese, "A+");
        assert_eq!(scores.rank_min_percent, "1.5");
        assert_eq!(scores.rank_min, "320");
        assert_eq!(scores.rank_max, "");
    }

    #[test]
    fn session_ids_are_distinct() {
        let first = SessionId::generate();
        let second = SessionId::generate();
        assert_eq!(first.as_str().len(), 24);
        assert_ne!(first, second);
    }
}
