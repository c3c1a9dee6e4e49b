//! Applicant intake: the two-step form, its CAPTCHA, and the service that
//! trades a completed form for an invitation code.

pub mod captcha;
pub mod domain;
pub mod form;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use captcha::{CaptchaChallenge, CaptchaError, CaptchaGuard, CaptchaRenderer, Operator};
pub use domain::{
    ApplicantSubmission, ContactDetails, ContactField, ScoreData, SessionId, Subject, GRADE_SCALE,
};
pub use form::{FormController, FormError, FormStep, SCORE_ENTRY_CLOSED_NOTICE};
pub use router::intake_router;
pub use service::{IntakeError, IntakeService, IntakeSession, ResultView, SessionView};
pub use session::{InMemorySessionStore, SessionStore, SessionStoreError, CONTACT_DRAFT_KEY};
