//! Operator console: authenticated access to the issued-code records, their
//! statistics and export, and the score-entry window settings.

pub mod domain;
pub mod export;
pub mod router;
pub mod service;
pub mod stats;
pub mod viewer;

#[cfg(test)]
mod tests;

pub use domain::{AdminRecord, RecordStatus, SortDirection, SortKey, SortState};
pub use export::{export_bytes, export_filename, write_csv};
pub use router::admin_router;
pub use service::{AdminError, AdminService, AdminSession, DashboardView, ExportFile, RecordsView};
pub use stats::{BucketCount, BucketSet, DashboardStats, Share};
pub use viewer::{Page, RecordFilter, RecordQuery, RecordViewer, PAGE_SIZE};
