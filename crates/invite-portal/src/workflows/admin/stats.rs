//! Dashboard summary figures derived from the fetched record set.

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{AdminRecord, RecordStatus};
use crate::workflows::intake::domain::{Subject, GRADE_SCALE};
use crate::workflows::timestamp::parse_record_timestamp;

const REGION_PALETTE: [&str; 6] = [
    "#06b6d4", "#3b82f6", "#8b5cf6", "#10b981", "#f59e0b", "#ef4444",
];
const IDENTITY_PALETTE: [&str; 4] = ["#6366f1", "#ec4899", "#14b8a6", "#f97316"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub active: usize,
    pub today: usize,
    pub regions: Vec<Share>,
    pub identities: Vec<Share>,
    pub with_scores: usize,
    pub grades: Vec<SubjectGrades>,
    pub rank_percent: Vec<BucketCount>,
    pub rank_count: Vec<BucketCount>,
}

/// One slice of a categorical distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Share {
    pub label: String,
    pub value: usize,
    pub color: &'static str,
    /// Rounded percentage of all records.
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectGrades {
    pub subject: Subject,
    pub counts: Vec<GradeCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeCount {
    pub grade: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub label: &'static str,
    pub color: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct Bucket {
    label: &'static str,
    color: &'static str,
    upper: Option<f64>,
}

/// Ordered upper-bounded buckets closed by an unbounded catch-all, so every
/// value lands somewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSet {
    buckets: Vec<Bucket>,
}

impl BucketSet {
    pub fn new(
        bounded: &[(&'static str, f64, &'static str)],
        catch_all: (&'static str, &'static str),
    ) -> Self {
        let mut buckets: Vec<Bucket> = bounded
            .iter()
            .map(|&(label, upper, color)| Bucket {
                label,
                color,
                upper: Some(upper),
            })
            .collect();
        buckets.push(Bucket {
            label: catch_all.0,
            color: catch_all.1,
            upper: None,
        });
        Self { buckets }
    }

    pub fn rank_percent() -> Self {
        Self::new(
            &[
                ("0 - 1%", 1.0, "#f43f5e"),
                ("1.01 - 2%", 2.0, "#f97316"),
                ("2.01 - 5%", 5.0, "#eab308"),
                ("5.01 - 10%", 10.0, "#84cc16"),
            ],
            ("> 10%", "#10b981"),
        )
    }

    pub fn rank_count() -> Self {
        Self::new(
            &[
                ("0 - 500", 500.0, "#6366f1"),
                ("501 - 1000", 1_000.0, "#8b5cf6"),
                ("1001 - 2000", 2_000.0, "#d946ef"),
                ("2001 - 4000", 4_000.0, "#ec4899"),
            ],
            ("> 4000", "#64748b"),
        )
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Index of the first bucket whose upper bound is at least `value`.
    pub fn classify(&self, value: f64) -> usize {
        self.buckets
            .iter()
            .position(|bucket| bucket.upper.map_or(true, |upper| value <= upper))
            .unwrap_or(self.buckets.len() - 1)
    }

    fn tally(&self, values: impl Iterator<Item = f64>) -> Vec<BucketCount> {
        let mut counts = vec![0usize; self.buckets.len()];
        for value in values {
            counts[self.classify(value)] += 1;
        }
        self.buckets
            .iter()
            .zip(counts)
            .map(|(bucket, count)| BucketCount {
                label: bucket.label,
                color: bucket.color,
                count,
            })
            .collect()
    }
}

impl DashboardStats {
    pub fn compute(records: &[AdminRecord], today: NaiveDate) -> Self {
        let total = records.len();
        let active = records
            .iter()
            .filter(|record| record.status == RecordStatus::Active)
            .count();
        let today_count = records
            .iter()
            .filter_map(|record| parse_record_timestamp(&record.timestamp))
            .filter(|stamp| stamp.date_naive() == today)
            .count();

        let regions = distribution(
            records.iter().map(|record| record.region.as_str()),
            &REGION_PALETTE,
            total,
        );
        let identities = distribution(
            records.iter().map(|record| record.identity.as_str()),
            &IDENTITY_PALETTE,
            total,
        );

        let scored: Vec<_> = records
            .iter()
            .filter_map(AdminRecord::entered_scores)
            .collect();

        let mut grade_counts = vec![[0usize; GRADE_SCALE.len()]; Subject::GRADED.len()];
        let mut with_scores = 0;
        for scores in &scored {
            let mut any = false;
            for (slot, subject) in grade_counts.iter_mut().zip(Subject::GRADED) {
                if let Some(index) = GRADE_SCALE
                    .iter()
                    .position(|grade| *grade == scores.grade(subject))
                {
                    slot[index] += 1;
                    any = true;
                }
            }
            if any {
                with_scores += 1;
            }
        }
        let grades = Subject::GRADED
            .into_iter()
            .zip(grade_counts)
            .map(|(subject, counts)| SubjectGrades {
                subject,
                counts: GRADE_SCALE
                    .into_iter()
                    .zip(counts)
                    .map(|(grade, count)| GradeCount { grade, count })
                    .collect(),
            })
            .collect();

        let rank_percent = BucketSet::rank_percent().tally(
            scored
                .iter()
                .filter_map(|scores| leading_float(&scores.rank_min_percent)),
        );
        let rank_count = BucketSet::rank_count().tally(
            scored
                .iter()
                .filter_map(|scores| leading_integer(&scores.rank_min))
                .map(|value| value as f64),
        );

        Self {
            total,
            active,
            today: today_count,
            regions,
            identities,
            with_scores,
            grades,
            rank_percent,
            rank_count,
        }
    }
}

/// Colours follow first appearance; the result is ordered by count, ties
/// keeping first appearance.
fn distribution<'a>(
    values: impl Iterator<Item = &'a str>,
    palette: &[&'static str],
    total: usize,
) -> Vec<Share> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(label, _)| *label == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    let mut shares: Vec<Share> = counts
        .into_iter()
        .enumerate()
        .map(|(index, (label, value))| Share {
            label: label.to_string(),
            value,
            color: palette[index % palette.len()],
            percent: percent_of(value, total),
        })
        .collect();
    shares.sort_by(|a, b| b.value.cmp(&a.value));
    shares
}

fn percent_of(value: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (value as f64 / total as f64 * 100.0).round() as u32
}

/// Longest numeric prefix after leading whitespace, e.g. `"1.5%"` → 1.5.
pub fn leading_float(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let integer_digits = count_digits(&bytes[end..]);
    end += integer_digits;
    let mut fraction_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction_digits = count_digits(&bytes[end + 1..]);
        if integer_digits > 0 || fraction_digits > 0 {
            end += 1 + fraction_digits;
        }
    }
    if integer_digits == 0 && fraction_digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut cursor = end + 1;
        if matches!(bytes.get(cursor), Some(b'+' | b'-')) {
            cursor += 1;
        }
        let exponent_digits = count_digits(bytes.get(cursor..).unwrap_or_default());
        if exponent_digits > 0 {
            end = cursor + exponent_digits;
        }
    }
    text[..end].parse().ok()
}

/// Leading base-10 integer after whitespace; stops at the first non-digit.
pub fn leading_integer(raw: &str) -> Option<i64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits = count_digits(&bytes[sign..]);
    if digits == 0 {
        return None;
    }
    text[..sign + digits].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|byte| byte.is_ascii_digit()).count()
}
