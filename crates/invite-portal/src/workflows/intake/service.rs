use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::captcha::{CaptchaError, CaptchaGuard, CaptchaRenderer};
use super::domain::{ContactDetails, ScoreData, SessionId};
use super::form::{FormController, FormError, FormStep};
use super::session::{clear_contact_draft, load_contact_draft, SessionStore};
use crate::backend::{BackendError, InvitationBackend};
use crate::clock::Clock;
use crate::config::IntakeConfig;
use crate::workflows::invitation::{CountdownHandle, ExpiryTracker, InvitationResult};
use crate::workflows::registry::{Handle, SessionRegistry};
use crate::workflows::window::{WindowGate, WindowStatus};

/// One applicant's form, issued code and live countdown.
#[derive(Debug)]
pub struct IntakeSession {
    form: FormController,
    result: Option<InvitationResult>,
    countdown: Option<CountdownHandle>,
}

impl IntakeSession {
    fn new(form: FormController) -> Self {
        Self {
            form,
            result: None,
            countdown: None,
        }
    }

    pub fn form(&self) -> &FormController {
        &self.form
    }

    pub fn result(&self) -> Option<&InvitationResult> {
        self.result.as_ref()
    }

    /// Drops the result and countdown and clears the form and its draft.
    fn reset(&mut self) -> Result<(), FormError> {
        self.result = None;
        self.countdown = None;
        self.form.reset()
    }
}

pub(crate) type SessionHandle = Handle<IntakeSession>;
type SessionMap = Arc<SessionRegistry<IntakeSession>>;
type CaptchaSource = Arc<dyn Fn() -> CaptchaGuard + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub step: FormStep,
    pub contact: ContactDetails,
    pub scores: ScoreData,
    pub score_entry_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    #[serde(flatten)]
    pub invitation: InvitationResult,
    /// `MM:SS` until expiry.
    pub time_left: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("unknown session")]
    SessionNotFound,
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("an invitation code has already been issued for this session")]
    AlreadyIssued,
    #[error("unable to issue an invitation code: {source}")]
    Issuance {
        #[source]
        source: BackendError,
        fallback_form_url: Option<String>,
    },
    #[error(transparent)]
    Captcha(#[from] CaptchaError),
}

/// Owns every applicant session and drives them through the form, the
/// issuing backend and the expiry countdown.
pub struct IntakeService<B> {
    backend: Arc<B>,
    store: Arc<dyn SessionStore>,
    gate: Arc<WindowGate>,
    clock: Arc<dyn Clock>,
    settings: IntakeConfig,
    renderer: CaptchaRenderer,
    captcha_source: CaptchaSource,
    sessions: SessionMap,
    gate_sync: JoinHandle<()>,
}

impl<B> IntakeService<B>
where
    B: InvitationBackend + 'static,
{
    /// Must be called from within a tokio runtime.
    pub fn new(
        backend: Arc<B>,
        store: Arc<dyn SessionStore>,
        gate: Arc<WindowGate>,
        clock: Arc<dyn Clock>,
        settings: IntakeConfig,
    ) -> Self {
        let sessions: SessionMap = Arc::new(SessionRegistry::new(settings.session_ttl));
        let gate_sync = spawn_gate_sync(&gate, Arc::clone(&sessions));
        Self {
            backend,
            store,
            gate,
            clock,
            settings,
            renderer: CaptchaRenderer::default(),
            captcha_source: Arc::new(CaptchaGuard::new),
            sessions,
            gate_sync,
        }
    }

    /// Replaces how each new form's challenge generator is built.
    pub fn with_captcha_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> CaptchaGuard + Send + Sync + 'static,
    {
        self.captcha_source = Arc::new(source);
        self
    }

    pub fn gate(&self) -> &WindowGate {
        &self.gate
    }

    pub fn window_status(&self) -> WindowStatus {
        self.gate.status()
    }

    pub async fn start_session(&self) -> Result<SessionView, IntakeError> {
        self.evict_idle();
        let id = SessionId::generate();
        let form = self.new_form(&id)?;
        let handle = self
            .sessions
            .insert(id.clone(), IntakeSession::new(form), self.clock.now());
        info!(session = %id, "intake session started");
        let mut session = handle.lock().await;
        Ok(self.view(&id, &mut session))
    }

    pub async fn view_session(&self, id: &SessionId) -> Result<SessionView, IntakeError> {
        self.with_session(id, |_| Ok(())).await
    }

    pub async fn set_contact(
        &self,
        id: &SessionId,
        details: ContactDetails,
    ) -> Result<SessionView, IntakeError> {
        self.with_session(id, |session| Ok(session.form.set_contact(details)?))
            .await
    }

    pub async fn advance(&self, id: &SessionId) -> Result<SessionView, IntakeError> {
        self.with_session(id, |session| Ok(session.form.advance()?))
            .await
    }

    pub async fn back(&self, id: &SessionId) -> Result<SessionView, IntakeError> {
        self.with_session(id, |session| Ok(session.form.back()?))
            .await
    }

    pub async fn update_scores(
        &self,
        id: &SessionId,
        scores: ScoreData,
    ) -> Result<SessionView, IntakeError> {
        self.with_session(id, |session| Ok(session.form.update_scores(scores)?))
            .await
    }

    /// PNG of the session's challenge; `refresh` issues a new challenge first.
    pub async fn captcha_png(
        &self,
        id: &SessionId,
        refresh: bool,
    ) -> Result<Vec<u8>, IntakeError> {
        let handle = self.session(id)?;
        let mut session = handle.lock().await;
        let captcha = session.form.captcha_mut();
        if refresh {
            captcha.refresh();
            debug!(session = %id, "captcha refreshed on request");
        }
        Ok(captcha.render_png(&self.renderer)?)
    }

    /// Validates locally, then waits for both the backend and the minimum
    /// pacing delay before answering.
    pub async fn submit(&self, id: &SessionId, captcha: &str) -> Result<ResultView, IntakeError> {
        let handle = self.session(id)?;
        let mut session = handle.lock().await;
        if session.result.is_some() {
            return Err(IntakeError::AlreadyIssued);
        }
        session.form.sync_gate(self.gate.is_open());
        let submission = session.form.prepare_submission(captcha)?;

        let (outcome, ()) = tokio::join!(
            self.backend.issue_code(&submission),
            tokio::time::sleep(self.settings.minimum_submit_delay),
        );

        match outcome {
            Ok(code) => {
                let result = InvitationResult::issued(code, self.clock.now());
                session.form.mark_submitted();
                session.countdown = ExpiryTracker::for_result(&result).map(|tracker| {
                    tracker.spawn(
                        Arc::clone(&self.clock),
                        self.settings.gate_interval,
                        expire_session(Arc::downgrade(&handle), result.expires_timestamp),
                    )
                });
                session.result = Some(result);
                info!(
                    session = %id,
                    with_scores = submission.carries_real_scores(),
                    "invitation issued"
                );
                result_view(&session, &*self.clock).ok_or(IntakeError::SessionNotFound)
            }
            Err(source) => {
                session.form.captcha_mut().refresh();
                warn!(session = %id, error = %source, "issuance failed; offering fallback form");
                Err(IntakeError::Issuance {
                    source,
                    fallback_form_url: self.settings.fallback_form_url.clone(),
                })
            }
        }
    }

    /// Full reset: clears the form, result, countdown and persisted draft,
    /// then closes the session. The applicant starts over with a new one.
    pub async fn reset(&self, id: &SessionId) -> Result<(), IntakeError> {
        let handle = self.session(id)?;
        handle.lock().await.reset()?;
        self.sessions.remove(id);
        info!(session = %id, "intake session closed");
        Ok(())
    }

    /// Drops sessions idle for longer than the configured ttl, along with
    /// their drafts.
    pub fn evict_idle(&self) -> usize {
        let evicted = self.sessions.evict_idle(self.clock.now());
        for id in &evicted {
            if let Err(error) = clear_contact_draft(self.store.as_ref(), id) {
                warn!(session = %id, %error, "failed to drop draft of idle session");
            }
        }
        if !evicted.is_empty() {
            info!(
                evicted = evicted.len(),
                remaining = self.sessions.len(),
                "idle intake sessions dropped"
            );
        }
        evicted.len()
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    async fn with_session<F>(&self, id: &SessionId, apply: F) -> Result<SessionView, IntakeError>
    where
        F: FnOnce(&mut IntakeSession) -> Result<(), IntakeError>,
    {
        let handle = self.session(id)?;
        let mut session = handle.lock().await;
        session.form.sync_gate(self.gate.is_open());
        apply(&mut session)?;
        Ok(self.view(id, &mut session))
    }

    /// Live session, or one rebuilt from a persisted draft after a restart.
    pub(crate) fn session(&self, id: &SessionId) -> Result<SessionHandle, IntakeError> {
        let restored = self
            .sessions
            .get_or_restore(id, self.clock.now(), || -> Result<_, IntakeError> {
                if load_contact_draft(self.store.as_ref(), id)
                    .map_err(FormError::from)?
                    .is_none()
                {
                    return Ok(None);
                }
                let form = self.new_form(id)?;
                info!(session = %id, "intake session restored from draft");
                Ok(Some(IntakeSession::new(form)))
            })?;
        restored.ok_or(IntakeError::SessionNotFound)
    }

    fn new_form(&self, id: &SessionId) -> Result<FormController, FormError> {
        Ok(
            FormController::restore(id.clone(), Arc::clone(&self.store), self.gate.is_open())?
                .with_captcha((self.captcha_source)()),
        )
    }

    fn view(&self, id: &SessionId, session: &mut IntakeSession) -> SessionView {
        SessionView {
            session_id: id.clone(),
            step: session.form.step(),
            contact: session.form.contact().clone(),
            scores: session.form.scores().clone(),
            score_entry_open: session.form.score_entry_open(),
            notice: session.form.take_notice(),
            result: result_view(session, &*self.clock),
        }
    }

}

impl<B> Drop for IntakeService<B> {
    fn drop(&mut self) {
        self.gate_sync.abort();
    }
}

fn result_view(session: &IntakeSession, clock: &dyn Clock) -> Option<ResultView> {
    let invitation = session.result.clone()?;
    let time_left = match &session.countdown {
        Some(countdown) => countdown.display(),
        None => ExpiryTracker::for_result(&invitation)
            .map(|tracker| tracker.display(&clock.now()))
            .unwrap_or_else(|| "00:00".to_string()),
    };
    Some(ResultView {
        invitation,
        time_left,
    })
}

/// Resets the session when its code expires, unless a newer code has
/// replaced it in the meantime.
async fn expire_session(session: Weak<AsyncMutex<IntakeSession>>, expires_timestamp: i64) {
    let Some(handle) = session.upgrade() else {
        return;
    };
    let mut session = handle.lock().await;
    let current = session.result.as_ref().map(|result| result.expires_timestamp);
    if current != Some(expires_timestamp) {
        return;
    }
    match session.reset() {
        Ok(()) => info!(session = %session.form.session(), "expired invitation cleared"),
        Err(error) => warn!(%error, "failed to clear expired invitation"),
    }
}

/// Pushes gate transitions into every live form.
fn spawn_gate_sync(gate: &WindowGate, sessions: SessionMap) -> JoinHandle<()> {
    let mut receiver = gate.subscribe();
    tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            let open = *receiver.borrow_and_update();
            let handles = sessions.handles();
            let mut forced = 0usize;
            for handle in handles {
                if handle.lock().await.form.sync_gate(open) {
                    forced += 1;
                }
            }
            debug!(open, forced, "gate change applied to sessions");
        }
    })
}
