//! Response payloads from the Verify v2 API.

use serde::Deserialize;

/// Returned when a verification is started. Twilio keeps the code; we only
/// see delivery metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationStarted {
    pub sid: String,
    pub status: String,
    pub to: String,
    pub channel: String,
}

/// Returned from a VerificationCheck call.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationCheck {
    pub status: String,
    #[serde(default)]
    pub to: Option<String>,
}

impl VerificationCheck {
    pub fn approved(&self) -> bool {
        self.status == "approved"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verification_started() {
        let body = r#"{
            "sid": "VE1234",
            "status": "pending",
            "to": "+919876543210",
            "channel": "sms",
            "valid": false
        }"#;
        let started: VerificationStarted = serde_json::from_str(body).unwrap();
        assert_eq!(started.sid, "VE1234");
        assert_eq!(started.channel, "sms");
    }

    #[test]
    fn test_check_approved() {
        let approved: VerificationCheck =
            serde_json::from_str(r#"{"status": "approved", "to": "+919876543210"}"#).unwrap();
        assert!(approved.approved());

        let pending: VerificationCheck = serde_json::from_str(r#"{"status": "pending"}"#).unwrap();
        assert!(!pending.approved());
    }
}
