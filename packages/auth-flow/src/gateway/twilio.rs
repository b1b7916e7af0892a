//! Production gateway: Twilio Verify owns code custody, the host's
//! identity directory owns accounts.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use twilio::{TwilioOptions, TwilioService};

use crate::config::Config;
use crate::error::AuthError;
use crate::gateway::{AuthGateway, IdentityDirectory, VerifyOutcome};
use crate::models::identity::{Identity, RoleKind};
use crate::models::phone::PhoneNumber;
use crate::models::registration::RegistrationDraft;

/// Dialing prefix re-attached for delivery; canonical numbers carry none.
const DIAL_PREFIX: &str = "+91";

pub struct TwilioGateway {
    twilio: TwilioService,
    directory: Arc<dyn IdentityDirectory>,
}

impl TwilioGateway {
    pub fn new(twilio: TwilioService, directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { twilio, directory }
    }

    pub fn from_config(config: &Config, directory: Arc<dyn IdentityDirectory>) -> Self {
        Self::new(
            TwilioService::new(TwilioOptions {
                account_sid: config.twilio_account_sid.clone(),
                auth_token: config.twilio_auth_token.clone(),
                service_id: config.twilio_verify_service_sid.clone(),
            }),
            directory,
        )
    }

    fn recipient(phone: &PhoneNumber) -> String {
        format!("{DIAL_PREFIX}{}", phone.as_str())
    }
}

#[async_trait]
impl AuthGateway for TwilioGateway {
    async fn request_otp(&self, phone: &PhoneNumber) -> Result<(), AuthError> {
        self.twilio
            .send_otp(&Self::recipient(phone))
            .await
            .map_err(|e| {
                error!(phone = %phone.hashed(), error = %e, "OTP delivery failed");
                AuthError::Transient(e.to_string())
            })?;
        info!(phone = %phone.hashed(), "OTP delivery requested");
        Ok(())
    }

    async fn verify_otp(
        &self,
        phone: &PhoneNumber,
        code: &str,
    ) -> Result<VerifyOutcome, AuthError> {
        let approved = self
            .twilio
            .verify_otp(&Self::recipient(phone), code)
            .await
            .map_err(|e| {
                error!(phone = %phone.hashed(), error = %e, "verification check failed");
                AuthError::Transient(e.to_string())
            })?;

        if !approved {
            return Err(AuthError::OtpMismatch);
        }

        match self.directory.find_by_phone(phone).await? {
            Some(identity) => Ok(VerifyOutcome::Known(identity)),
            None => Ok(VerifyOutcome::Unknown),
        }
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        role: RoleKind,
    ) -> Result<Identity, AuthError> {
        self.directory.find_by_credentials(email, password, role).await
    }

    async fn register(&self, draft: &RegistrationDraft) -> Result<Identity, AuthError> {
        let identity = self.directory.create(draft).await?;
        info!(identity = %identity.id, "account created");
        Ok(identity)
    }
}
