//! In-memory gateway for tests and local development.
//!
//! Codes are generated here, behind the same authority seam the production
//! gateway sits behind. They are reachable only through
//! [`InMemoryGateway::last_code`] and never logged above debug level.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;
use crate::gateway::{AuthGateway, IdentityDirectory, VerifyOutcome};
use crate::models::identity::{Identity, KycStatus, Role, RoleKind};
use crate::models::phone::PhoneNumber;
use crate::models::registration::RegistrationDraft;

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

fn demo_role(kind: RoleKind) -> Role {
    match kind {
        RoleKind::Guest => Role::Guest,
        RoleKind::Registered => Role::Registered,
        RoleKind::Kyc => Role::Kyc {
            status: KycStatus::Approved,
            wallet_balance: Decimal::from(125_000),
        },
        RoleKind::Admin => Role::Admin,
    }
}

/// Gateway holding codes and accounts in process memory.
#[derive(Default)]
pub struct InMemoryGateway {
    /// hashed phone -> active code
    codes: Mutex<HashMap<String, String>>,
    /// hashed phone -> account
    accounts: Mutex<HashMap<String, Identity>>,
    /// fault injection: fail delivery requests with `Transient`
    fail_requests: AtomicBool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing account so verification reports it as known.
    pub fn insert_account(&self, identity: Identity) {
        if let Some(phone) = &identity.phone {
            self.accounts
                .lock()
                .expect("accounts lock")
                .insert(phone.hashed(), identity);
        }
    }

    /// The code most recently delivered to `phone`. Test accessor; the
    /// flow itself has no path to this value.
    pub fn last_code(&self, phone: &PhoneNumber) -> Option<String> {
        self.codes
            .lock()
            .expect("codes lock")
            .get(&phone.hashed())
            .cloned()
    }

    /// Make subsequent delivery requests fail with `Transient`.
    pub fn set_fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthGateway for InMemoryGateway {
    async fn request_otp(&self, phone: &PhoneNumber) -> Result<(), AuthError> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(AuthError::Transient("delivery unavailable".into()));
        }
        let code = generate_code();
        debug!(phone = %phone.hashed(), "in-memory code generated");
        self.codes
            .lock()
            .expect("codes lock")
            .insert(phone.hashed(), code);
        Ok(())
    }

    async fn verify_otp(
        &self,
        phone: &PhoneNumber,
        code: &str,
    ) -> Result<VerifyOutcome, AuthError> {
        let stored = self
            .codes
            .lock()
            .expect("codes lock")
            .get(&phone.hashed())
            .cloned();
        match stored {
            Some(active) if active == code => {
                match self.accounts.lock().expect("accounts lock").get(&phone.hashed()) {
                    Some(identity) => Ok(VerifyOutcome::Known(identity.clone())),
                    None => Ok(VerifyOutcome::Unknown),
                }
            }
            _ => Err(AuthError::OtpMismatch),
        }
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        role: RoleKind,
    ) -> Result<Identity, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Transient("invalid credentials".into()));
        }
        let existing = self
            .accounts
            .lock()
            .expect("accounts lock")
            .values()
            .find(|identity| identity.email == email)
            .cloned();
        if let Some(identity) = existing {
            return Ok(identity);
        }
        // demo identities are minted on the fly, mirroring the mock backend
        let name = email.split('@').next().unwrap_or(email).to_string();
        Ok(Identity {
            id: Uuid::new_v4(),
            name,
            email: email.to_string(),
            phone: None,
            role: demo_role(role),
        })
    }

    async fn register(&self, draft: &RegistrationDraft) -> Result<Identity, AuthError> {
        let phone = PhoneNumber::parse(&draft.phone).ok();
        let identity = Identity {
            id: Uuid::new_v4(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone,
            role: Role::Registered,
        };
        if let Some(phone) = &identity.phone {
            let key = phone.hashed();
            self.accounts
                .lock()
                .expect("accounts lock")
                .insert(key.clone(), identity.clone());
            // the verification that led here is spent
            self.codes.lock().expect("codes lock").remove(&key);
        }
        Ok(identity)
    }
}

/// Directory counterpart for exercising [`TwilioGateway`] wiring without
/// network access.
#[derive(Default)]
pub struct InMemoryDirectory {
    accounts: Mutex<HashMap<String, Identity>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identity: Identity) {
        if let Some(phone) = &identity.phone {
            self.accounts
                .lock()
                .expect("accounts lock")
                .insert(phone.hashed(), identity);
        }
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Identity>, AuthError> {
        Ok(self
            .accounts
            .lock()
            .expect("accounts lock")
            .get(&phone.hashed())
            .cloned())
    }

    async fn create(&self, draft: &RegistrationDraft) -> Result<Identity, AuthError> {
        let identity = Identity {
            id: Uuid::new_v4(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone: PhoneNumber::parse(&draft.phone).ok(),
            role: Role::Registered,
        };
        if let Some(phone) = &identity.phone {
            self.accounts
                .lock()
                .expect("accounts lock")
                .insert(phone.hashed(), identity.clone());
        }
        Ok(identity)
    }

    async fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
        role: RoleKind,
    ) -> Result<Identity, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Transient("invalid credentials".into()));
        }
        let name = email.split('@').next().unwrap_or(email).to_string();
        Ok(Identity {
            id: Uuid::new_v4(),
            name,
            email: email.to_string(),
            phone: None,
            role: demo_role(role),
        })
    }
}

/// Demo accounts offered on the sign-in screen.
pub fn demo_accounts() -> Vec<(&'static str, RoleKind)> {
    vec![
        ("user@demo.com", RoleKind::Registered),
        ("kyc@demo.com", RoleKind::Kyc),
        ("admin@demo.com", RoleKind::Admin),
    ]
}
