//! The auth flow state machine.
//!
//! States move strictly `PhoneEntry` → `OtpPending` → `Registration` →
//! `Authenticated`, with `Closed` reachable from any state by explicit
//! cancellation. Every rejected transition surfaces exactly one
//! [`AuthError`] and leaves the machine where it was; inputs that do not
//! apply to the current state are no-ops, like a machine ignoring an event
//! it does not handle.
//!
//! All methods take `&mut self`, so the borrow checker rules out
//! overlapping submissions, and gateway results are applied to state only
//! after the await returns. Each session carries an id that async results
//! are checked against before being applied, so a response for a
//! superseded session is discarded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::AuthError;
use crate::gateway::{AuthGateway, FlowHooks, NoHooks, VerifyOutcome};
use crate::input::CodeInput;
use crate::models::identity::{Identity, RoleKind};
use crate::models::location::{LocationChange, LocationDirectory, StaticLocations};
use crate::models::otp::{OtpSession, OtpSessionManager};
use crate::models::phone::PhoneNumber;
use crate::models::registration::{self, RegistrationDraft, ValidationReport};

/// Where the flow currently is.
#[derive(Debug)]
pub enum FlowState {
    PhoneEntry,
    OtpPending {
        session: OtpSession,
        input: CodeInput,
    },
    Registration {
        draft: RegistrationDraft,
        errors: ValidationReport,
    },
    Authenticated {
        identity: Identity,
    },
    Closed,
}

/// State discriminant for step checks and UI routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    PhoneEntry,
    OtpPending,
    Registration,
    Authenticated,
    Closed,
}

impl FlowState {
    pub fn step(&self) -> FlowStep {
        match self {
            FlowState::PhoneEntry => FlowStep::PhoneEntry,
            FlowState::OtpPending { .. } => FlowStep::OtpPending,
            FlowState::Registration { .. } => FlowStep::Registration,
            FlowState::Authenticated { .. } => FlowStep::Authenticated,
            FlowState::Closed => FlowStep::Closed,
        }
    }
}

/// One edit to the registration form.
#[derive(Debug, Clone)]
pub enum DraftChange {
    Name(String),
    Email(String),
    Phone(String),
    Password(String),
    ConfirmPassword(String),
    Consent(bool),
    Location(LocationChange),
}

/// The orchestrating controller. Owns at most one session and one draft.
pub struct AuthFlow {
    gateway: Arc<dyn AuthGateway>,
    sessions: OtpSessionManager,
    locations: Arc<dyn LocationDirectory>,
    hooks: Arc<dyn FlowHooks>,
    state: FlowState,
    last_error: Option<AuthError>,
}

impl AuthFlow {
    pub fn new(gateway: Arc<dyn AuthGateway>) -> Self {
        Self {
            sessions: OtpSessionManager::new(gateway.clone()),
            gateway,
            locations: Arc::new(StaticLocations),
            hooks: Arc::new(NoHooks),
            state: FlowState::PhoneEntry,
            last_error: None,
        }
    }

    pub fn with_locations(mut self, locations: Arc<dyn LocationDirectory>) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn FlowHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn step(&self) -> FlowStep {
        self.state.step()
    }

    /// The error surfaced by the most recent rejected transition, cleared
    /// on the next accepted input.
    pub fn last_error(&self) -> Option<&AuthError> {
        self.last_error.as_ref()
    }

    pub fn session(&self) -> Option<&OtpSession> {
        match &self.state {
            FlowState::OtpPending { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn code_input(&self) -> Option<&CodeInput> {
        match &self.state {
            FlowState::OtpPending { input, .. } => Some(input),
            _ => None,
        }
    }

    pub fn code_input_mut(&mut self) -> Option<&mut CodeInput> {
        match &mut self.state {
            FlowState::OtpPending { input, .. } => Some(input),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&RegistrationDraft> {
        match &self.state {
            FlowState::Registration { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Field errors from the last registration submit.
    pub fn registration_errors(&self) -> Option<&ValidationReport> {
        match &self.state {
            FlowState::Registration { errors, .. } => Some(errors),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            FlowState::Authenticated { identity } => Some(identity),
            _ => None,
        }
    }

    /// Seconds of session validity left, while a code is pending.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.session().map(|session| session.remaining_seconds(now))
    }

    /// Submit the phone form: normalize, validate, and open an OTP session.
    pub async fn submit_phone(
        &mut self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if self.step() != FlowStep::PhoneEntry {
            debug!(step = ?self.step(), "submit_phone ignored");
            return Ok(());
        }
        self.last_error = None;

        let phone = match PhoneNumber::parse(raw) {
            Ok(phone) => phone,
            Err(error) => return self.fail(error),
        };
        match self.sessions.issue(phone, now).await {
            Ok(session) => {
                info!(session = %session.id(), "entering code entry");
                self.state = FlowState::OtpPending {
                    session,
                    input: CodeInput::new(),
                };
                Ok(())
            }
            Err(error) => self.fail(error),
        }
    }

    /// Request another code for the pending session.
    pub async fn resend(&mut self, now: DateTime<Utc>) -> Result<(), AuthError> {
        let current = match &self.state {
            FlowState::OtpPending { session, .. } => session.clone(),
            _ => {
                debug!(step = ?self.step(), "resend ignored");
                return Ok(());
            }
        };
        self.last_error = None;

        match self.sessions.resend(&current, now).await {
            Ok(next) => {
                if let FlowState::OtpPending { session, input } = &mut self.state {
                    if session.id() == current.id() {
                        *session = next;
                        input.clear();
                    } else {
                        debug!(session = %current.id(), "stale resend result discarded");
                    }
                }
                Ok(())
            }
            Err(error) => self.fail(error),
        }
    }

    /// Abandon the pending session and return to phone entry.
    pub fn edit_phone(&mut self) {
        if let FlowState::OtpPending { session, .. } = &self.state {
            debug!(session = %session.id(), "session discarded for phone edit");
            self.state = FlowState::PhoneEntry;
            self.last_error = None;
        }
    }

    /// Verify the collected code. A known identity authenticates; an
    /// unknown one opens registration seeded with the verified phone.
    pub async fn verify(&mut self, now: DateTime<Utc>) -> Result<(), AuthError> {
        let (mut session, candidate) = match &self.state {
            FlowState::OtpPending { session, input } => (session.clone(), input.value()),
            _ => {
                debug!(step = ?self.step(), "verify ignored");
                return Ok(());
            }
        };
        self.last_error = None;
        let tagged = session.id();

        match self.sessions.verify(&mut session, &candidate, now).await {
            Ok(outcome) => {
                let still_current = matches!(
                    &self.state,
                    FlowState::OtpPending { session: live, .. } if live.id() == tagged
                );
                if !still_current {
                    debug!(session = %tagged, "stale verification result discarded");
                    return Ok(());
                }
                match outcome {
                    VerifyOutcome::Known(identity) => self.finish(identity),
                    VerifyOutcome::Unknown => {
                        info!("verified phone has no account, entering registration");
                        self.state = FlowState::Registration {
                            draft: RegistrationDraft::for_phone(session.phone()),
                            errors: ValidationReport::default(),
                        };
                    }
                }
                Ok(())
            }
            // the live session is untouched: still resendable until limit
            Err(error) => self.fail(error),
        }
    }

    /// Apply one edit to the registration form. Location edits cascade
    /// through the directory-checked selection.
    pub fn update_draft(&mut self, change: DraftChange) {
        let FlowState::Registration { draft, .. } = &mut self.state else {
            debug!("update_draft ignored outside registration");
            return;
        };
        match change {
            DraftChange::Name(value) => draft.name = value,
            DraftChange::Email(value) => draft.email = value,
            DraftChange::Phone(value) => {
                draft.phone = value.chars().filter(char::is_ascii_digit).take(10).collect();
            }
            DraftChange::Password(value) => draft.password = value,
            DraftChange::ConfirmPassword(value) => draft.confirm_password = value,
            DraftChange::Consent(value) => draft.consent = value,
            DraftChange::Location(change) => {
                draft.location.apply(change, self.locations.as_ref());
            }
        }
    }

    /// Validate the draft atomically and create the account.
    pub async fn submit_registration(&mut self) -> Result<(), AuthError> {
        let draft = match &self.state {
            FlowState::Registration { draft, .. } => draft.clone(),
            _ => {
                debug!(step = ?self.step(), "submit_registration ignored");
                return Ok(());
            }
        };
        self.last_error = None;

        let report = registration::validate(&draft);
        let first = report.first().map(|(field, message)| {
            AuthError::validation(field, message)
        });
        if let FlowState::Registration { errors, .. } = &mut self.state {
            *errors = report;
        }
        if let Some(error) = first {
            return self.fail(error);
        }
        if !draft.consent {
            return self.fail(AuthError::ConsentRequired);
        }

        match self.gateway.register(&draft).await {
            Ok(identity) => {
                self.finish(identity);
                Ok(())
            }
            Err(error) => self.fail(error),
        }
    }

    /// Sign in with a pre-provisioned (demo) identity, bypassing OTP.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        role: RoleKind,
    ) -> Result<(), AuthError> {
        if self.step() != FlowStep::PhoneEntry {
            debug!(step = ?self.step(), "login ignored");
            return Ok(());
        }
        self.last_error = None;

        match self.gateway.login(email, password, role).await {
            Ok(identity) => {
                self.finish(identity);
                Ok(())
            }
            Err(error) => self.fail(error),
        }
    }

    /// Cancel the flow, discarding any live session or draft.
    pub fn close(&mut self) {
        if self.step() == FlowStep::Closed {
            return;
        }
        info!("auth flow closed");
        self.state = FlowState::Closed;
        self.last_error = None;
        self.hooks.on_close();
    }

    fn finish(&mut self, identity: Identity) {
        info!(identity = %identity.id, "authenticated");
        self.hooks.on_auth_success(&identity);
        self.state = FlowState::Authenticated { identity };
    }

    fn fail(&mut self, error: AuthError) -> Result<(), AuthError> {
        debug!(%error, "transition rejected");
        self.last_error = Some(error.clone());
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Field;
    use crate::testing::InMemoryGateway;

    fn flow() -> (Arc<InMemoryGateway>, AuthFlow) {
        let gateway = Arc::new(InMemoryGateway::new());
        let flow = AuthFlow::new(gateway.clone());
        (gateway, flow)
    }

    #[tokio::test]
    async fn test_invalid_phone_is_rejected_locally() {
        let (_gateway, mut flow) = flow();
        let result = flow.submit_phone("12345", Utc::now()).await;
        assert!(matches!(
            result,
            Err(AuthError::Validation {
                field: Field::Phone,
                ..
            })
        ));
        assert_eq!(flow.step(), FlowStep::PhoneEntry);
        assert!(flow.last_error().is_some());
    }

    #[tokio::test]
    async fn test_error_clears_on_next_accepted_input() {
        let (_gateway, mut flow) = flow();
        let _ = flow.submit_phone("12345", Utc::now()).await;
        assert!(flow.last_error().is_some());

        flow.submit_phone("9876543210", Utc::now()).await.unwrap();
        assert!(flow.last_error().is_none());
        assert_eq!(flow.step(), FlowStep::OtpPending);
    }

    #[tokio::test]
    async fn test_inputs_outside_their_state_are_noops() {
        let (_gateway, mut flow) = flow();
        flow.resend(Utc::now()).await.unwrap();
        flow.verify(Utc::now()).await.unwrap();
        flow.submit_registration().await.unwrap();
        flow.update_draft(DraftChange::Name("x".into()));
        flow.edit_phone();
        assert_eq!(flow.step(), FlowStep::PhoneEntry);
        assert!(flow.last_error().is_none());
    }

    #[tokio::test]
    async fn test_close_is_terminal() {
        let (_gateway, mut flow) = flow();
        flow.close();
        assert_eq!(flow.step(), FlowStep::Closed);

        flow.submit_phone("9876543210", Utc::now()).await.unwrap();
        assert_eq!(flow.step(), FlowStep::Closed);
    }
}
