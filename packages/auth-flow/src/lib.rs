//! Phone-OTP authentication and registration flow.
//!
//! A library-level core for phone-first sign-in on the Brickline platform:
//! the hosting UI shell renders it, the backend gateway executes it.
//!
//! # Architecture
//!
//! ```text
//! UI shell
//!     │ input (phone, digits, form edits)
//!     ▼
//! AuthFlow ──────────── FlowState: PhoneEntry → OtpPending → Registration → Authenticated
//!     │                                 │                         │              (or Closed)
//!     │ issue/resend/verify             │ CodeInput               │ RegistrationDraft
//!     ▼                                 ▼                         ▼
//! OtpSessionManager              segmented code entry       validator + LocationSelection
//!     │
//!     ▼ async contracts
//! AuthGateway (request_otp / verify_otp / login / register)
//! ```
//!
//! # Key invariants
//!
//! - At most one [`OtpSession`](models::otp::OtpSession) and one
//!   [`RegistrationDraft`](models::registration::RegistrationDraft) are
//!   alive, owned by [`AuthFlow`](flow::AuthFlow).
//! - Sessions are one-shot: consumed or expired sessions never re-verify.
//! - Issue and resend replace the session wholesale, so the resend counter
//!   and the delivered code cannot drift apart.
//! - Code custody is the gateway's. Verification is authoritative
//!   server-side; the core never compares against a locally stored code.
//! - Location selections cascade atomically: a state always belongs to its
//!   country and a city to its state, or is empty.
//! - Every rejected transition surfaces one [`AuthError`](error::AuthError)
//!   and leaves the machine in its prior state.

pub mod config;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod input;
pub mod models;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::Config;
pub use error::{AuthError, Field};
pub use flow::{AuthFlow, DraftChange, FlowState, FlowStep};
pub use gateway::{
    AuthGateway, FlowHooks, IdentityDirectory, NoHooks, TwilioGateway, VerifyOutcome,
};
pub use input::CodeInput;
pub use models::identity::{Identity, KycStatus, Role, RoleKind};
pub use models::location::{
    LocationChange, LocationDirectory, LocationSelection, StaticLocations,
};
pub use models::otp::{
    countdown, OtpSession, OtpSessionManager, OTP_MAX_RESEND, OTP_TTL_SECONDS,
};
pub use models::phone::{hash_identifier, normalize, PhoneNumber};
pub use models::registration::{validate, RegistrationDraft, ValidationReport};
