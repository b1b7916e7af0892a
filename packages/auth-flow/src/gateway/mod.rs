//! External contracts consumed by the flow.
//!
//! The core owns no transport and no persistence; everything that leaves
//! the process goes through [`AuthGateway`]. The shipped production
//! implementation is [`TwilioGateway`]; tests use the in-memory gateway
//! from the `testing` module.

mod twilio;

pub use twilio::TwilioGateway;

use async_trait::async_trait;

use crate::error::AuthError;
use crate::models::identity::{Identity, RoleKind};
use crate::models::phone::PhoneNumber;
use crate::models::registration::RegistrationDraft;

/// Result of an authoritative verification plus identity lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// The phone maps to an existing account.
    Known(Identity),
    /// Verified, but no account yet: registration required.
    Unknown,
}

/// The async backend surface.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Trigger out-of-band code delivery. The core never learns the code
    /// through this path.
    async fn request_otp(&self, phone: &PhoneNumber) -> Result<(), AuthError>;

    /// Authoritative code check plus identity lookup.
    async fn verify_otp(&self, phone: &PhoneNumber, code: &str)
        -> Result<VerifyOutcome, AuthError>;

    /// Pre-provisioned/demo identities only; bypasses OTP.
    async fn login(
        &self,
        email: &str,
        password: &str,
        role: RoleKind,
    ) -> Result<Identity, AuthError>;

    /// Final account persistence.
    async fn register(&self, draft: &RegistrationDraft) -> Result<Identity, AuthError>;
}

/// Notification hooks into the hosting application.
pub trait FlowHooks: Send + Sync {
    fn on_auth_success(&self, _identity: &Identity) {}
    fn on_close(&self) {}
}

/// Default no-op hooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl FlowHooks for NoHooks {}

/// Host-provided account store, used by [`TwilioGateway`] to resolve
/// verified phones to accounts and to persist new registrations.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Identity>, AuthError>;

    async fn create(&self, draft: &RegistrationDraft) -> Result<Identity, AuthError>;

    async fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
        role: RoleKind,
    ) -> Result<Identity, AuthError>;
}
