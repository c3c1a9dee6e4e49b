use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{AdminRecord, RecordStatus, SortDirection, SortKey, SortState};

pub const PAGE_SIZE: usize = 10;

/// Table query as received from the console.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub identity: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub direction: Option<SortDirection>,
    #[serde(default)]
    pub page: Option<usize>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|value| !value.trim().is_empty()))
}

impl RecordQuery {
    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            search: self.search.clone(),
            region: selection(self.region.as_deref()),
            identity: selection(self.identity.as_deref()),
            status: selection(self.status.as_deref()).map(RecordStatus::from),
        }
    }

    /// Explicit sort from the query, if any.
    pub fn sort_state(&self) -> Option<SortState> {
        self.sort.map(|key| SortState {
            key,
            direction: self.direction.unwrap_or_default(),
        })
    }
}

/// `all` disables the corresponding filter.
fn selection(value: Option<&str>) -> Option<String> {
    value
        .filter(|value| !value.eq_ignore_ascii_case("all"))
        .map(str::to_string)
}

/// Independent filters; `None` disables each one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub search: Option<String>,
    pub region: Option<String>,
    pub identity: Option<String>,
    pub status: Option<RecordStatus>,
}

impl RecordFilter {
    pub fn matches(&self, record: &AdminRecord) -> bool {
        if let Some(term) = self.search.as_deref().filter(|term| !term.is_empty()) {
            let term = term.to_lowercase();
            let hit = [&record.email, &record.code, &record.id]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if self.region.as_ref().is_some_and(|region| *region != record.region) {
            return false;
        }
        if self
            .identity
            .as_ref()
            .is_some_and(|identity| *identity != record.identity)
        {
            return false;
        }
        self.status.map_or(true, |status| status == record.status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, clamped into range.
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
    pub page_size: usize,
}

pub fn paginate<T: Clone>(items: &[T], page: usize) -> Page<T> {
    let total = items.len();
    let page_count = total.div_ceil(PAGE_SIZE);
    let page = page.clamp(1, page_count.max(1));
    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(total);
    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        page,
        page_count,
        total,
        page_size: PAGE_SIZE,
    }
}

/// Read model over the fetched record set.
#[derive(Debug, Clone, Default)]
pub struct RecordViewer {
    records: Vec<AdminRecord>,
}

impl RecordViewer {
    pub fn new(records: Vec<AdminRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[AdminRecord] {
        &self.records
    }

    pub fn replace(&mut self, records: Vec<AdminRecord>) {
        self.records = records;
    }

    pub fn find(&self, id: &str) -> Option<&AdminRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Filtered records, sorted when a sort is given; otherwise in fetch order.
    pub fn filtered(&self, filter: &RecordFilter, sort: Option<SortState>) -> Vec<AdminRecord> {
        let mut rows: Vec<AdminRecord> = self
            .records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        if let Some(sort) = sort {
            rows.sort_by(|a, b| {
                let ordering = sort.key.value(a).cmp(sort.key.value(b));
                match sort.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        rows
    }

    pub fn page(
        &self,
        filter: &RecordFilter,
        sort: Option<SortState>,
        page: usize,
    ) -> Page<AdminRecord> {
        paginate(&self.filtered(filter, sort), page)
    }

    /// Distinct regions in first-seen order.
    pub fn regions(&self) -> Vec<String> {
        distinct(self.records.iter().map(|record| record.region.as_str()))
    }

    pub fn identities(&self) -> Vec<String> {
        distinct(self.records.iter().map(|record| record.identity.as_str()))
    }

    /// Applies a confirmed status change. Returns `false` for unknown ids.
    pub fn apply_status(&mut self, id: &str, status: RecordStatus) -> bool {
        match self.records.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.status = status;
                true
            }
            None => false,
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !seen.iter().any(|existing| existing == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
