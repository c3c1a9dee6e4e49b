use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::backend::{BackendError, InvitationBackend};
use crate::clock::ManualClock;
use crate::workflows::admin::domain::{AdminRecord, RecordStatus};
use crate::workflows::admin::service::AdminService;
use crate::workflows::intake::domain::{ApplicantSubmission, ScoreData};
use crate::workflows::window::{SystemConfig, WindowGate};

pub(super) const PASSWORD: &str = "correct horse";

pub(super) fn local(raw: &str) -> DateTime<Local> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").expect("fixture");
    Local
        .from_local_datetime(&naive)
        .earliest()
        .expect("fixture is representable")
}

pub(super) fn record(n: usize) -> AdminRecord {
    let regions = ["north", "south", "east"];
    let email = if n % 5 == 0 {
        format!("Test@{n}.example.com")
    } else {
        format!("user{n}@example.com")
    };
    AdminRecord {
        id: format!("R{n:03}"),
        email,
        identity: if n % 2 == 0 { "parent" } else { "student" }.to_string(),
        region: regions[n % regions.len()].to_string(),
        source: "social".to_string(),
        code: format!("INV-{:04}", 9000 - n),
        timestamp: if n <= 4 {
            "2024/03/14 09:30:00".to_string()
        } else {
            "2024/03/01 09:30:00".to_string()
        },
        status: if n % 4 == 0 {
            RecordStatus::Expired
        } else {
            RecordStatus::Active
        },
        scores: match n {
            1 => Some(ScoreData {
                chinese: "A+".to_string(),
                math: "A".to_string(),
                rank_min_percent: "1".to_string(),
                rank_min: "450".to_string(),
                ..ScoreData::default()
            }),
            2 => Some(ScoreData::placeholder()),
            _ => None,
        },
    }
}

/// 23 records: three pages at ten per page.
pub(super) fn records() -> Vec<AdminRecord> {
    (1..=23).map(record).collect()
}

pub(super) fn window_config() -> SystemConfig {
    SystemConfig::new("2024-03-01T00:00:00", Some("2024-03-31T23:59:00".to_string()))
}

/// In-memory backend guarded by [`PASSWORD`]. Mutations can be switched to
/// refuse so failure paths can be observed.
pub(super) struct FakeBackend {
    records: Mutex<Vec<AdminRecord>>,
    config: Mutex<SystemConfig>,
    accept_mutations: bool,
    status_updates: Mutex<Vec<(String, RecordStatus)>>,
    fetches: AtomicUsize,
}

impl FakeBackend {
    pub(super) fn new(records: Vec<AdminRecord>, config: SystemConfig) -> Self {
        Self {
            records: Mutex::new(records),
            config: Mutex::new(config),
            accept_mutations: true,
            status_updates: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub(super) fn refusing_mutations(mut self) -> Self {
        self.accept_mutations = false;
        self
    }

    pub(super) fn push_record(&self, record: AdminRecord) {
        self.records.lock().expect("lock").push(record);
    }

    pub(super) fn status_updates(&self) -> Vec<(String, RecordStatus)> {
        self.status_updates.lock().expect("lock").clone()
    }

    pub(super) fn stored_config(&self) -> SystemConfig {
        self.config.lock().expect("lock").clone()
    }

    pub(super) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn authorize(&self, password: &str) -> Result<(), BackendError> {
        if password == PASSWORD {
            Ok(())
        } else {
            Err(BackendError::InvalidPassword)
        }
    }

    fn mutation_allowed(&self) -> Result<(), BackendError> {
        if self.accept_mutations {
            Ok(())
        } else {
            Err(BackendError::Rejected("sheet is locked".to_string()))
        }
    }
}

#[async_trait]
impl InvitationBackend for FakeBackend {
    async fn issue_code(&self, _submission: &ApplicantSubmission) -> Result<String, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn fetch_admin_data(&self, password: &str) -> Result<Vec<AdminRecord>, BackendError> {
        self.authorize(password)?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().expect("lock").clone())
    }

    async fn update_status(
        &self,
        password: &str,
        id: &str,
        status: RecordStatus,
    ) -> Result<(), BackendError> {
        self.authorize(password)?;
        self.mutation_allowed()?;
        self.status_updates
            .lock()
            .expect("lock")
            .push((id.to_string(), status));
        Ok(())
    }

    async fn fetch_config(&self) -> SystemConfig {
        self.stored_config()
    }

    async fn update_config(&self, password: &str, config: &SystemConfig) -> Result<(), BackendError> {
        self.authorize(password)?;
        self.mutation_allowed()?;
        *self.config.lock().expect("lock") = config.clone();
        Ok(())
    }
}

pub(super) struct Harness {
    pub service: Arc<AdminService<FakeBackend>>,
    pub backend: Arc<FakeBackend>,
    pub gate: Arc<WindowGate>,
    pub clock: ManualClock,
}

/// Clock pinned to 2024-03-14 10:00 local; the gate starts unconfigured.
pub(super) fn harness(backend: FakeBackend) -> Harness {
    let clock = ManualClock::new(local("2024-03-14T10:00:00"));
    let backend = Arc::new(backend);
    let gate = Arc::new(WindowGate::spawn(
        SystemConfig::default(),
        Arc::new(clock.clone()),
        Duration::from_secs(1),
    ));
    let service = Arc::new(
        AdminService::new(
            Arc::clone(&backend),
            Arc::clone(&gate),
            Arc::new(clock.clone()),
        )
        .with_session_ttl(Duration::from_secs(30 * 60)),
    );
    Harness {
        service,
        backend,
        gate,
        clock,
    }
}

pub(super) fn default_harness() -> Harness {
    harness(FakeBackend::new(records(), window_config()))
}
