//! OTP verification sessions.
//!
//! A session records issuance policy only: the expiry window, the resend
//! budget and one-shot consumption. Code custody lives with the
//! verification authority behind [`AuthGateway`]; local checks run before
//! any network call, so an expired or malformed candidate never leaves the
//! process.
//!
//! Issue and resend always produce a new session value, so the resend
//! counter and the delivered code can never drift apart.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AuthError, Field};
use crate::gateway::{AuthGateway, VerifyOutcome};
use crate::models::phone::PhoneNumber;

/// Seconds a code stays valid after issuance.
pub const OTP_TTL_SECONDS: i64 = 300;
/// Resends allowed per session.
pub const OTP_MAX_RESEND: u8 = 3;

lazy_static! {
    static ref CODE_RE: Regex = Regex::new(r"^[0-9]{6}$").expect("static pattern");
}

/// A single verification attempt for one phone.
#[derive(Debug, Clone)]
pub struct OtpSession {
    id: Uuid,
    phone: PhoneNumber,
    issued_at: DateTime<Utc>,
    ttl: Duration,
    resend_count: u8,
    consumed: bool,
}

impl OtpSession {
    fn new(phone: PhoneNumber, now: DateTime<Utc>, resend_count: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone,
            issued_at: now,
            ttl: Duration::seconds(OTP_TTL_SECONDS),
            resend_count,
            consumed: false,
        }
    }

    /// Tags in-flight async calls so a late response can never be applied
    /// to a superseded session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phone(&self) -> &PhoneNumber {
        &self.phone
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + self.ttl
    }

    pub fn resend_count(&self) -> u8 {
        self.resend_count
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Live iff unconsumed and inside the expiry window.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired(now)
    }

    pub fn can_resend(&self) -> bool {
        self.resend_count < OTP_MAX_RESEND
    }

    /// Remaining validity, a pure function of wall-clock time.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_seconds().max(0)
    }
}

/// Once-per-second remaining-validity ticks, derived from wall-clock time
/// rather than a decrementing counter, so missed ticks or a suspended
/// process cannot skew the countdown. Emits positive values while the
/// session is live, then a final zero. Drop the stream to cancel it.
pub fn countdown(session: &OtpSession) -> impl Stream<Item = i64> {
    let expires_at = session.expires_at();
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    IntervalStream::new(interval)
        .map(move |_| (expires_at - Utc::now()).num_seconds().max(0))
        .take_while(|remaining| *remaining > 0)
        .chain(tokio_stream::once(0))
}

/// Issues, resends and verifies sessions against the gateway authority.
pub struct OtpSessionManager {
    gateway: Arc<dyn AuthGateway>,
}

impl OtpSessionManager {
    pub fn new(gateway: Arc<dyn AuthGateway>) -> Self {
        Self { gateway }
    }

    /// Request code delivery and open a fresh session. On gateway failure
    /// no session is created.
    pub async fn issue(
        &self,
        phone: PhoneNumber,
        now: DateTime<Utc>,
    ) -> Result<OtpSession, AuthError> {
        self.gateway.request_otp(&phone).await?;
        let session = OtpSession::new(phone, now, 0);
        info!(session = %session.id, phone = %session.phone.hashed(), "OTP session opened");
        Ok(session)
    }

    /// Deliver a fresh code and return the replacement session. The old
    /// session stays untouched on failure.
    pub async fn resend(
        &self,
        session: &OtpSession,
        now: DateTime<Utc>,
    ) -> Result<OtpSession, AuthError> {
        if !session.can_resend() {
            warn!(session = %session.id, "resend limit reached");
            return Err(AuthError::ResendLimitExceeded);
        }
        self.gateway.request_otp(&session.phone).await?;
        let next = OtpSession {
            id: Uuid::new_v4(),
            phone: session.phone.clone(),
            issued_at: now,
            ttl: session.ttl,
            resend_count: session.resend_count + 1,
            consumed: false,
        };
        info!(
            session = %next.id,
            resend_count = next.resend_count,
            "OTP session replaced on resend"
        );
        Ok(next)
    }

    /// Check a candidate. Local policy runs first: format, one-shot
    /// consumption, expiry. Only then is the gateway's authoritative
    /// verdict requested; the session is consumed on approval.
    pub async fn verify(
        &self,
        session: &mut OtpSession,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifyOutcome, AuthError> {
        if !CODE_RE.is_match(candidate) {
            return Err(AuthError::validation(
                Field::Code,
                "Enter a valid 6-digit OTP",
            ));
        }
        if session.consumed || session.is_expired(now) {
            debug!(session = %session.id, consumed = session.consumed, "dead session rejected");
            return Err(AuthError::OtpExpired);
        }

        let outcome = self.gateway.verify_otp(&session.phone, candidate).await?;
        session.consumed = true;
        info!(session = %session.id, "OTP verified");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryGateway;

    fn manager() -> (Arc<InMemoryGateway>, OtpSessionManager) {
        let gateway = Arc::new(InMemoryGateway::new());
        let manager = OtpSessionManager::new(gateway.clone());
        (gateway, manager)
    }

    fn phone() -> PhoneNumber {
        PhoneNumber::parse("9876543210").unwrap()
    }

    #[tokio::test]
    async fn test_issue_opens_fresh_session() {
        let (_, manager) = manager();
        let now = Utc::now();
        let session = manager.issue(phone(), now).await.unwrap();
        assert_eq!(session.resend_count(), 0);
        assert!(!session.is_consumed());
        assert_eq!(session.remaining_seconds(now), OTP_TTL_SECONDS);
        assert!(session.is_live(now));
    }

    #[tokio::test]
    async fn test_issue_fails_without_session_on_outage() {
        let (gateway, manager) = manager();
        gateway.set_fail_requests(true);
        let result = manager.issue(phone(), Utc::now()).await;
        assert!(matches!(result, Err(AuthError::Transient(_))));
    }

    #[tokio::test]
    async fn test_verify_succeeds_just_before_expiry() {
        let (gateway, manager) = manager();
        let issued = Utc::now();
        let mut session = manager.issue(phone(), issued).await.unwrap();
        let code = gateway.last_code(&phone()).unwrap();

        let at = issued + Duration::seconds(299);
        let outcome = manager.verify(&mut session, &code, at).await.unwrap();
        assert_eq!(outcome, VerifyOutcome::Unknown);
        assert!(session.is_consumed());
    }

    #[tokio::test]
    async fn test_verify_expires_even_with_correct_code() {
        let (gateway, manager) = manager();
        let issued = Utc::now();
        let mut session = manager.issue(phone(), issued).await.unwrap();
        let code = gateway.last_code(&phone()).unwrap();

        let at = issued + Duration::seconds(301);
        let result = manager.verify(&mut session, &code, at).await;
        assert_eq!(result, Err(AuthError::OtpExpired));
        assert!(!session.is_consumed());
    }

    #[tokio::test]
    async fn test_consumed_session_never_reverifies() {
        let (gateway, manager) = manager();
        let issued = Utc::now();
        let mut session = manager.issue(phone(), issued).await.unwrap();
        let code = gateway.last_code(&phone()).unwrap();

        manager.verify(&mut session, &code, issued).await.unwrap();
        let again = manager.verify(&mut session, &code, issued).await;
        assert_eq!(again, Err(AuthError::OtpExpired));
    }

    #[tokio::test]
    async fn test_mismatch_leaves_session_live() {
        let (gateway, manager) = manager();
        let issued = Utc::now();
        let mut session = manager.issue(phone(), issued).await.unwrap();
        let code = gateway.last_code(&phone()).unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let result = manager.verify(&mut session, wrong, issued).await;
        assert_eq!(result, Err(AuthError::OtpMismatch));
        assert!(session.is_live(issued));
        assert!(session.can_resend());
    }

    #[tokio::test]
    async fn test_malformed_candidate_is_rejected_locally() {
        let (_, manager) = manager();
        let issued = Utc::now();
        let mut session = manager.issue(phone(), issued).await.unwrap();

        for bad in ["", "12345", "1234567", "12a456"] {
            let result = manager.verify(&mut session, bad, issued).await;
            assert!(
                matches!(
                    result,
                    Err(AuthError::Validation {
                        field: Field::Code,
                        ..
                    })
                ),
                "candidate {bad:?} should fail locally"
            );
        }
        assert!(!session.is_consumed());
    }

    #[tokio::test]
    async fn test_resend_budget() {
        let (_, manager) = manager();
        let issued = Utc::now();
        let mut session = manager.issue(phone(), issued).await.unwrap();

        for expected in 1..=OTP_MAX_RESEND {
            session = manager.resend(&session, issued).await.unwrap();
            assert_eq!(session.resend_count(), expected);
        }

        let result = manager.resend(&session, issued).await;
        assert_eq!(result, Err(AuthError::ResendLimitExceeded));
        assert_eq!(session.resend_count(), OTP_MAX_RESEND);
    }

    #[tokio::test]
    async fn test_resend_rotates_code_and_resets_window() {
        let (gateway, manager) = manager();
        let issued = Utc::now();
        let session = manager.issue(phone(), issued).await.unwrap();
        let first_code = gateway.last_code(&phone()).unwrap();

        let later = issued + Duration::seconds(200);
        let next = manager.resend(&session, later).await.unwrap();
        assert_eq!(next.issued_at(), later);
        assert_eq!(next.remaining_seconds(later), OTP_TTL_SECONDS);
        assert_ne!(next.id(), session.id());

        // the old code is superseded by the rotated one
        let current = gateway.last_code(&phone()).unwrap();
        let mut fresh = next.clone();
        if current != first_code {
            let result = manager.verify(&mut fresh, &first_code, later).await;
            assert_eq!(result, Err(AuthError::OtpMismatch));
        }
        let outcome = manager.verify(&mut fresh, &current, later).await.unwrap();
        assert_eq!(outcome, VerifyOutcome::Unknown);
    }

    #[tokio::test]
    async fn test_countdown_ends_with_zero_for_expired_session() {
        let (_, manager) = manager();
        let long_ago = Utc::now() - Duration::seconds(400);
        let session = manager.issue(phone(), long_ago).await.unwrap();

        let mut stream = std::pin::pin!(countdown(&session));
        assert_eq!(stream.next().await, Some(0));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_countdown_first_tick_reflects_remaining() {
        let (_, manager) = manager();
        let session = manager.issue(phone(), Utc::now()).await.unwrap();

        let mut stream = std::pin::pin!(countdown(&session));
        let first = stream.next().await.unwrap();
        assert!(first > OTP_TTL_SECONDS - 5, "first tick was {first}");
    }
}
