//! Twilio Verify v2 client.
//!
//! Thin wrapper over the Verifications and VerificationCheck endpoints.
//! Code custody stays with Twilio: this crate never generates or stores
//! OTP codes, it only requests delivery and checks candidates.

use std::collections::HashMap;

pub mod models;

use reqwest::{header, Client};
use thiserror::Error;
use tracing::{debug, error};

use crate::models::{VerificationCheck, VerificationStarted};

#[derive(Debug, Error)]
pub enum TwilioError {
    #[error("request to Twilio failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Twilio returned {status}: {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub service_id: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
}

/// Delivery channel for a recipient. Email addresses go over the email
/// channel, everything else is treated as a phone number.
fn channel_for(recipient: &str) -> &'static str {
    if recipient.contains('@') {
        "email"
    } else {
        "sms"
    }
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    /// Start a verification: Twilio generates a code and delivers it
    /// out-of-band to `recipient`.
    pub async fn send_otp(&self, recipient: &str) -> Result<VerificationStarted, TwilioError> {
        let url = format!(
            "https://verify.twilio.com/v2/Services/{}/Verifications",
            self.options.service_id
        );

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "Content-Type",
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let mut form_body: HashMap<&str, String> = HashMap::new();
        form_body.insert("To", recipient.to_string());
        form_body.insert("Channel", channel_for(recipient).to_string());

        let response = self
            .client
            .post(url)
            .basic_auth(
                &self.options.account_sid,
                Some(&self.options.auth_token),
            )
            .headers(headers)
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "verification start rejected");
            return Err(TwilioError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let started = response.json::<VerificationStarted>().await?;
        debug!(sid = %started.sid, channel = %started.channel, "verification started");
        Ok(started)
    }

    /// Check a candidate code against the pending verification. Returns
    /// `Ok(true)` when Twilio approves the code, `Ok(false)` when the code
    /// is wrong or the verification lapsed, `Err` on transport failure.
    pub async fn verify_otp(&self, recipient: &str, code: &str) -> Result<bool, TwilioError> {
        let url = format!(
            "https://verify.twilio.com/v2/Services/{}/VerificationCheck",
            self.options.service_id
        );

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "Content-Type",
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Code", code);

        let response = self
            .client
            .post(url)
            .basic_auth(
                &self.options.account_sid,
                Some(&self.options.auth_token),
            )
            .headers(headers)
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "verification check rejected");
            return Err(TwilioError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let check = response.json::<VerificationCheck>().await?;
        Ok(check.approved())
    }
}
