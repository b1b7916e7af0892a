//! Canonical phone numbers.
//!
//! The canonical form is a 10-digit string with no country prefix; the
//! prefix is a display (and delivery) concern. Identifiers are hashed with
//! SHA-256 before they appear in logs or lookup keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AuthError, Field};

/// Reduce raw input to digits, then strip leading zeros. Total: never
/// fails, empty input yields an empty string.
pub fn normalize(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').to_string()
}

/// Hash an identifier (phone number or email) using SHA-256.
///
/// Raw identifiers never appear in logs or in-memory maps; the hash is the
/// lookup key.
pub fn hash_identifier(identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A canonical 10-digit phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize and validate raw user input.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let normalized = normalize(raw);
        if normalized.len() != 10 {
            return Err(AuthError::validation(
                Field::Phone,
                "Phone number must be 10 digits",
            ));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Privacy-safe form for logs and lookup keys.
    pub fn hashed(&self) -> String {
        hash_identifier(&self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
