use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::backend::{BackendError, InvitationBackend};
use crate::clock::ManualClock;
use crate::config::IntakeConfig;
use crate::workflows::admin::domain::{AdminRecord, RecordStatus};
use crate::workflows::intake::domain::{ApplicantSubmission, ContactDetails, SessionId};
use crate::workflows::intake::service::IntakeService;
use crate::workflows::intake::session::InMemorySessionStore;
use crate::workflows::window::{SystemConfig, WindowGate};

pub(super) const FALLBACK_FORM: &str = "https://forms.example.com/backup";

pub(super) fn local(raw: &str) -> DateTime<Local> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").expect("fixture");
    Local
        .from_local_datetime(&naive)
        .earliest()
        .expect("fixture is representable")
}

pub(super) fn contact() -> ContactDetails {
    ContactDetails {
        email: "student@example.com".to_string(),
        identity: "student".to_string(),
        region: "north".to_string(),
        source: "friend".to_string(),
    }
}

/// Open from well before any fixture time, with no end.
pub(super) fn open_config() -> SystemConfig {
    SystemConfig::new("2020-01-01T00:00:00", None)
}

pub(super) fn closed_config() -> SystemConfig {
    SystemConfig::default()
}

pub(super) fn settings() -> IntakeConfig {
    IntakeConfig {
        minimum_submit_delay: Duration::ZERO,
        gate_interval: Duration::from_secs(1),
        fallback_form_url: Some(FALLBACK_FORM.to_string()),
        session_ttl: Duration::from_secs(30 * 60),
    }
}

/// Records every issuance request and answers with a fixed code, or fails
/// when no code is configured.
#[derive(Default)]
pub(super) struct FakeBackend {
    code: Option<String>,
    submissions: Mutex<Vec<ApplicantSubmission>>,
}

impl FakeBackend {
    pub(super) fn issuing(code: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing() -> Self {
        Self::default()
    }

    pub(super) fn submissions(&self) -> Vec<ApplicantSubmission> {
        self.submissions.lock().expect("lock").clone()
    }
}

#[async_trait]
impl InvitationBackend for FakeBackend {
    async fn issue_code(&self, submission: &ApplicantSubmission) -> Result<String, BackendError> {
        self.submissions
            .lock()
            .expect("lock")
            .push(submission.clone());
        self.code
            .clone()
            .ok_or_else(|| BackendError::Rejected("sheet unavailable".to_string()))
    }

    async fn fetch_admin_data(&self, _password: &str) -> Result<Vec<AdminRecord>, BackendError> {
        Ok(Vec::new())
    }

    async fn update_status(
        &self,
        _password: &str,
        _id: &str,
        _status: RecordStatus,
    ) -> Result<(), BackendError> {
        Ok(())
    }

    async fn fetch_config(&self) -> SystemConfig {
        SystemConfig::default()
    }

    async fn update_config(
        &self,
        _password: &str,
        _config: &SystemConfig,
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

pub(super) struct Harness {
    pub service: Arc<IntakeService<FakeBackend>>,
    pub backend: Arc<FakeBackend>,
    pub store: Arc<InMemorySessionStore>,
    pub clock: ManualClock,
    pub gate: Arc<WindowGate>,
}

impl Harness {
    /// Current answer to the session's challenge.
    pub(super) async fn answer(&self, id: &SessionId) -> String {
        let handle = self.service.session(id).expect("session exists");
        let session = handle.lock().await;
        session.form().captcha().challenge().answer().to_string()
    }

    /// A second service over the same store and gate, as after a restart.
    pub(super) fn restarted(&self) -> IntakeService<FakeBackend> {
        IntakeService::new(
            Arc::clone(&self.backend),
            self.store.clone(),
            Arc::clone(&self.gate),
            Arc::new(self.clock.clone()),
            settings(),
        )
    }
}

pub(super) fn harness(backend: FakeBackend, config: SystemConfig) -> Harness {
    harness_at(backend, config, local("2024-03-14T10:15:00"), settings())
}

pub(super) fn harness_at(
    backend: FakeBackend,
    config: SystemConfig,
    now: DateTime<Local>,
    settings: IntakeConfig,
) -> Harness {
    let clock = ManualClock::new(now);
    let backend = Arc::new(backend);
    let store = Arc::new(InMemorySessionStore::new());
    let gate = Arc::new(WindowGate::spawn(
        config,
        Arc::new(clock.clone()),
        settings.gate_interval,
    ));
    let service = Arc::new(IntakeService::new(
        Arc::clone(&backend),
        store.clone(),
        Arc::clone(&gate),
        Arc::new(clock.clone()),
        settings,
    ));
    Harness {
        service,
        backend,
        store,
        clock,
        gate,
    }
}
