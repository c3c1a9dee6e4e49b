//! Applicant intake, invitation issuance and the operator dashboard for the
//! score-analysis portal.

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
