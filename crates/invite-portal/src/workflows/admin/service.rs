use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{AdminRecord, SortKey, SortState};
use super::export::{export_bytes, export_filename};
use super::stats::DashboardStats;
use super::viewer::{Page, RecordQuery, RecordViewer};
use crate::backend::{BackendError, InvitationBackend};
use crate::clock::Clock;
use crate::config::AdminConfig;
use crate::workflows::intake::domain::SessionId;
use crate::workflows::registry::{Handle, SessionRegistry};
use crate::workflows::window::{SystemConfig, WindowGate, WindowStatus};

/// An authenticated operator: the password used for every backend call and
/// the last fetched record set.
#[derive(Debug)]
pub struct AdminSession {
    password: String,
    viewer: RecordViewer,
    config: SystemConfig,
    sort: Option<SortState>,
}

impl AdminSession {
    pub fn viewer(&self) -> &RecordViewer {
        &self.viewer
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn sort(&self) -> Option<SortState> {
        self.sort
    }
}

type AdminHandle = Handle<AdminSession>;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub session_id: SessionId,
    pub total: usize,
    pub config: SystemConfig,
    pub window: WindowStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordsView {
    #[serde(flatten)]
    pub page: Page<AdminRecord>,
    pub sort: Option<SortState>,
    pub regions: Vec<String>,
    pub identities: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("unknown admin session")]
    SessionNotFound,
    #[error("incorrect password, please try again")]
    AuthFailed,
    #[error("backend request failed: {0}")]
    Backend(#[source] BackendError),
    #[error("record {0} not found")]
    RecordNotFound(String),
    #[error("unable to export records: {0}")]
    Export(#[from] csv::Error),
}

impl From<BackendError> for AdminError {
    fn from(error: BackendError) -> Self {
        if error.is_auth_failure() {
            Self::AuthFailed
        } else {
            Self::Backend(error)
        }
    }
}

/// Owns operator sessions. Existence of a session is the authenticated state;
/// sessions left idle past the ttl are dropped at the next login.
pub struct AdminService<B> {
    backend: Arc<B>,
    gate: Arc<WindowGate>,
    clock: Arc<dyn Clock>,
    sessions: SessionRegistry<AdminSession>,
}

impl<B> AdminService<B>
where
    B: InvitationBackend + 'static,
{
    pub fn new(backend: Arc<B>, gate: Arc<WindowGate>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            gate,
            clock,
            sessions: SessionRegistry::new(AdminConfig::default().session_ttl),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions = SessionRegistry::new(ttl);
        self
    }

    /// Fetches the records (which also checks the password), then the window
    /// configuration.
    pub async fn login(&self, password: &str) -> Result<DashboardView, AdminError> {
        let records = self
            .backend
            .fetch_admin_data(password)
            .await
            .inspect_err(|error| warn!(%error, "operator login failed"))?;
        let config = self.load_config().await;

        let id = SessionId::generate();
        let session = AdminSession {
            password: password.to_string(),
            viewer: RecordViewer::new(records),
            config,
            sort: None,
        };
        let view = self.dashboard(&id, &session);
        self.evict_idle();
        self.sessions.insert(id.clone(), session, self.clock.now());
        info!(session = %id, records = view.total, "operator logged in");
        Ok(view)
    }

    pub async fn refresh(&self, id: &SessionId) -> Result<DashboardView, AdminError> {
        let handle = self.session(id)?;
        let mut session = handle.lock().await;
        let records = self.backend.fetch_admin_data(&session.password).await?;
        session.viewer.replace(records);
        session.config = self.load_config().await;
        info!(session = %id, records = session.viewer.records().len(), "records refreshed");
        Ok(self.dashboard(id, &session))
    }

    /// Falls back to the session's toggled sort when the query names none.
    pub async fn records(
        &self,
        id: &SessionId,
        query: &RecordQuery,
    ) -> Result<RecordsView, AdminError> {
        let handle = self.session(id)?;
        let session = handle.lock().await;
        let sort = query.sort_state().or(session.sort);
        let page = session
            .viewer
            .page(&query.filter(), sort, query.page.unwrap_or(1));
        Ok(RecordsView {
            page,
            sort,
            regions: session.viewer.regions(),
            identities: session.viewer.identities(),
        })
    }

    pub async fn toggle_sort(&self, id: &SessionId, key: SortKey) -> Result<SortState, AdminError> {
        let handle = self.session(id)?;
        let mut session = handle.lock().await;
        let next = SortState::toggle(session.sort, key);
        session.sort = Some(next);
        Ok(next)
    }

    pub async fn stats(&self, id: &SessionId) -> Result<DashboardStats, AdminError> {
        let handle = self.session(id)?;
        let session = handle.lock().await;
        let today = self.clock.now().date_naive();
        Ok(DashboardStats::compute(session.viewer.records(), today))
    }

    /// Flips active/expired on the backend; local state follows only a
    /// confirmed update.
    pub async fn toggle_status(
        &self,
        id: &SessionId,
        record_id: &str,
    ) -> Result<AdminRecord, AdminError> {
        let handle = self.session(id)?;
        let mut session = handle.lock().await;
        let next = session
            .viewer
            .find(record_id)
            .map(|record| record.status.toggled())
            .ok_or_else(|| AdminError::RecordNotFound(record_id.to_string()))?;

        self.backend
            .update_status(&session.password, record_id, next)
            .await
            .inspect_err(|error| warn!(%error, record = record_id, "status update failed"))?;

        session.viewer.apply_status(record_id, next);
        session
            .viewer
            .find(record_id)
            .cloned()
            .ok_or_else(|| AdminError::RecordNotFound(record_id.to_string()))
    }

    /// Persists the window on the backend, then swaps it into the live gate.
    pub async fn update_config(
        &self,
        id: &SessionId,
        config: SystemConfig,
    ) -> Result<WindowStatus, AdminError> {
        let handle = self.session(id)?;
        let mut session = handle.lock().await;
        self.backend
            .update_config(&session.password, &config)
            .await
            .inspect_err(|error| warn!(%error, "window update failed"))?;
        session.config = config.clone();
        let open = self.gate.replace(config);
        info!(session = %id, open, "score-entry window reconfigured");
        Ok(self.gate.status())
    }

    /// Every fetched record, named after today's UTC date.
    pub async fn export_csv(&self, id: &SessionId) -> Result<ExportFile, AdminError> {
        let handle = self.session(id)?;
        let session = handle.lock().await;
        let bytes = export_bytes(session.viewer.records())?;
        let filename = export_filename(self.clock.now().with_timezone(&Utc).date_naive());
        info!(session = %id, records = session.viewer.records().len(), "records exported");
        Ok(ExportFile { filename, bytes })
    }

    pub async fn window_status(&self, id: &SessionId) -> Result<WindowStatus, AdminError> {
        self.session(id)?;
        Ok(self.gate.status())
    }

    pub fn logout(&self, id: &SessionId) -> Result<(), AdminError> {
        match self.sessions.remove(id) {
            Some(_) => {
                info!(session = %id, "operator logged out");
                Ok(())
            }
            None => Err(AdminError::SessionNotFound),
        }
    }

    /// Drops operator sessions idle past the ttl.
    pub fn evict_idle(&self) -> usize {
        let evicted = self.sessions.evict_idle(self.clock.now());
        if !evicted.is_empty() {
            info!(count = evicted.len(), "idle operator sessions dropped");
        }
        evicted.len()
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Fresh config from the backend, kept in step with the live gate.
    async fn load_config(&self) -> SystemConfig {
        let config = self.backend.fetch_config().await;
        if config != self.gate.config() {
            self.gate.replace(config.clone());
        }
        config
    }

    fn dashboard(&self, id: &SessionId, session: &AdminSession) -> DashboardView {
        DashboardView {
            session_id: id.clone(),
            total: session.viewer.records().len(),
            config: session.config.clone(),
            window: self.gate.status(),
        }
    }

    pub(crate) fn session(&self, id: &SessionId) -> Result<AdminHandle, AdminError> {
        self.sessions
            .get(id, self.clock.now())
            .ok_or(AdminError::SessionNotFound)
    }
}
