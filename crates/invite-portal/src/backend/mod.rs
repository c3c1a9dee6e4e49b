//! Client side of the issuing backend: code issuance, the admin record feed,
//! status updates and the score-entry window configuration.

mod client;
mod wire;

use std::time::Duration;

use async_trait::async_trait;

pub use client::HttpBackend;

use crate::workflows::admin::domain::{AdminRecord, RecordStatus};
use crate::workflows::intake::domain::ApplicantSubmission;
use crate::workflows::window::SystemConfig;

/// Error string the backend uses to signal a wrong admin password.
pub const INVALID_PASSWORD_MARKER: &str = "Invalid password";

/// Base URLs still containing this marker were never filled in.
pub const UNCONFIGURED_URL_MARKER: &str = "YOUR_GOOGLE_SCRIPT_WEB_APP_URL";

#[async_trait]
pub trait InvitationBackend: Send + Sync {
    /// Returns the issued invitation code.
    async fn issue_code(&self, submission: &ApplicantSubmission) -> Result<String, BackendError>;

    async fn fetch_admin_data(&self, password: &str) -> Result<Vec<AdminRecord>, BackendError>;

    async fn update_status(
        &self,
        password: &str,
        id: &str,
        status: RecordStatus,
    ) -> Result<(), BackendError>;

    /// Never fails: an unreachable backend or a malformed answer yields an
    /// empty config, which keeps the window closed.
    async fn fetch_config(&self) -> SystemConfig;

    async fn update_config(&self, password: &str, config: &SystemConfig)
        -> Result<(), BackendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend URL is not configured")]
    NotConfigured,
    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),
    #[error("backend request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("backend answered with HTTP {0}")]
    Status(u16),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("invalid password")]
    InvalidPassword,
    #[error("invalid response from backend: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::InvalidPassword)
    }
}
