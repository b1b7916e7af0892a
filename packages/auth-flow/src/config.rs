//! Environment-backed configuration.

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Settings for the production gateway, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_verify_service_sid: String,
}

impl Config {
    /// Load configuration from environment variables. Reads `.env` first
    /// when present (development).
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID")
                .context("TWILIO_ACCOUNT_SID must be set")?,
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN")
                .context("TWILIO_AUTH_TOKEN must be set")?,
            twilio_verify_service_sid: env::var("TWILIO_VERIFY_SERVICE_SID")
                .context("TWILIO_VERIFY_SERVICE_SID must be set")?,
        })
    }
}
