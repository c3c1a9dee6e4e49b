use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::captcha::{CaptchaError, CaptchaGuard};
use super::domain::{ApplicantSubmission, ContactDetails, ContactField, ScoreData, SessionId};
use super::session::{
    clear_contact_draft, load_contact_draft, save_contact_draft, SessionStore, SessionStoreError,
};

/// Shown when the window closes underneath an applicant on the score step.
pub const SCORE_ENTRY_CLOSED_NOTICE: &str =
    "Score entry has closed. You can still submit your contact details to receive a code.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    Contact,
    Scores,
    Submitted,
}

impl FormStep {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Scores => "scores",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for FormStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("missing required fields: {}", join_labels(.0))]
    MissingFields(Vec<ContactField>),
    #[error("missing scores: {}", .0.join(", "))]
    MissingScores(Vec<&'static str>),
    #[error("score entry is currently closed")]
    ScoreEntryClosed,
    #[error("action is not available on the {0} step")]
    WrongStep(FormStep),
    #[error(transparent)]
    Captcha(#[from] CaptchaError),
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

fn join_labels(fields: &[ContactField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Two-step applicant form. Step one is persisted to the session store on
/// every edit so a reload can pick it back up.
pub struct FormController {
    session: SessionId,
    store: Arc<dyn SessionStore>,
    step: FormStep,
    contact: ContactDetails,
    scores: ScoreData,
    score_entry_open: bool,
    notice: Option<String>,
    captcha: CaptchaGuard,
}

impl FormController {
    /// Builds the controller for `session`, picking up any persisted step-one draft.
    pub fn restore(
        session: SessionId,
        store: Arc<dyn SessionStore>,
        score_entry_open: bool,
    ) -> Result<Self, FormError> {
        let contact = load_contact_draft(store.as_ref(), &session)?.unwrap_or_default();
        Ok(Self {
            session,
            store,
            step: FormStep::Contact,
            contact,
            scores: ScoreData::default(),
            score_entry_open,
            notice: None,
            captcha: CaptchaGuard::new(),
        })
    }

    pub fn with_captcha(mut self, captcha: CaptchaGuard) -> Self {
        self.captcha = captcha;
        self
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn contact(&self) -> &ContactDetails {
        &self.contact
    }

    pub fn scores(&self) -> &ScoreData {
        &self.scores
    }

    pub fn score_entry_open(&self) -> bool {
        self.score_entry_open
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn captcha(&self) -> &CaptchaGuard {
        &self.captcha
    }

    pub fn captcha_mut(&mut self) -> &mut CaptchaGuard {
        &mut self.captcha
    }

    pub fn set_contact(&mut self, details: ContactDetails) -> Result<(), FormError> {
        self.require_step(FormStep::Contact)?;
        self.contact = details;
        self.persist_contact()
    }

    pub fn update_contact(
        &mut self,
        field: ContactField,
        value: impl Into<String>,
    ) -> Result<(), FormError> {
        self.require_step(FormStep::Contact)?;
        self.contact.set(field, value);
        self.persist_contact()
    }

    pub fn advance(&mut self) -> Result<(), FormError> {
        self.require_step(FormStep::Contact)?;
        let missing = self.contact.missing_fields();
        if !missing.is_empty() {
            return Err(FormError::MissingFields(missing));
        }
        if !self.score_entry_open {
            return Err(FormError::ScoreEntryClosed);
        }
        self.step = FormStep::Scores;
        debug!(session = %self.session, "advanced to score step");
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), FormError> {
        match self.step {
            FormStep::Submitted => Err(FormError::WrongStep(FormStep::Submitted)),
            _ => {
                self.step = FormStep::Contact;
                Ok(())
            }
        }
    }

    pub fn update_scores(&mut self, scores: ScoreData) -> Result<(), FormError> {
        self.require_step(FormStep::Scores)?;
        self.scores = scores;
        Ok(())
    }

    /// Applies a gate change. Returns `true` when the form was forced back
    /// to step one.
    pub fn sync_gate(&mut self, open: bool) -> bool {
        self.score_entry_open = open;
        if !open && self.step == FormStep::Scores {
            self.step = FormStep::Contact;
            self.notice = Some(SCORE_ENTRY_CLOSED_NOTICE.to_string());
            info!(session = %self.session, "score entry closed; form returned to contact step");
            return true;
        }
        false
    }

    /// Validates locally and assembles the submission. A wrong CAPTCHA answer
    /// replaces the challenge; the caller must collect a fresh answer.
    pub fn prepare_submission(
        &mut self,
        captcha_input: &str,
    ) -> Result<ApplicantSubmission, FormError> {
        match (self.step, self.score_entry_open) {
            (FormStep::Scores, true) | (FormStep::Contact, false) => {}
            (step, _) => return Err(FormError::WrongStep(step)),
        }

        let missing = self.contact.missing_fields();
        if !missing.is_empty() {
            return Err(FormError::MissingFields(missing));
        }
        if self.score_entry_open {
            let blank = self.scores.missing_fields();
            if !blank.is_empty() {
                return Err(FormError::MissingScores(blank));
            }
        }

        self.captcha.check(captcha_input)?;

        let scores = if self.score_entry_open {
            self.scores.clone()
        } else {
            ScoreData::placeholder()
        };

        Ok(ApplicantSubmission {
            contact: self.contact.clone(),
            scores: Some(scores),
        })
    }

    pub fn mark_submitted(&mut self) {
        self.step = FormStep::Submitted;
    }

    /// Clears every field, the notice and the persisted draft, and issues a
    /// new challenge.
    pub fn reset(&mut self) -> Result<(), FormError> {
        self.step = FormStep::Contact;
        self.contact = ContactDetails::default();
        self.scores = ScoreData::default();
        self.notice = None;
        self.captcha.refresh();
        clear_contact_draft(self.store.as_ref(), &self.session)?;
        Ok(())
    }

    fn require_step(&self, expected: FormStep) -> Result<(), FormError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(FormError::WrongStep(self.step))
        }
    }

    fn persist_contact(&self) -> Result<(), FormError> {
        save_contact_draft(self.store.as_ref(), &self.session, &self.contact)?;
        Ok(())
    }
}

impl fmt::Debug for FormController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("session", &self.session)
            .field("step", &self.step)
            .field("score_entry_open", &self.score_entry_open)
            .finish_non_exhaustive()
    }
}
