//! Registration drafts and submit-time validation.
//!
//! Validation runs atomically when the form is submitted; nothing is
//! re-validated between keystrokes. Consent is deliberately not a field
//! error: a missing checkbox blocks the form as a whole.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Field;
use crate::models::location::LocationSelection;
use crate::models::phone::PhoneNumber;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^\S+@\S+\.\S+$").expect("static pattern");
}

const MIN_PASSWORD_CHARS: usize = 8;

/// The signup form being filled in after a phone is verified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: LocationSelection,
    pub password: String,
    pub confirm_password: String,
    pub consent: bool,
}

impl RegistrationDraft {
    /// Fresh draft pre-seeded with the verified phone.
    pub fn for_phone(phone: &PhoneNumber) -> Self {
        Self {
            phone: phone.as_str().to_string(),
            ..Self::default()
        }
    }
}

/// Field errors from one validation pass, in form order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    errors: Vec<(Field, String)>,
}

impl ValidationReport {
    fn push(&mut self, field: Field, message: &str) {
        self.errors.push((field, message.to_string()));
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn first(&self) -> Option<(Field, &str)> {
        self.errors
            .first()
            .map(|(field, message)| (*field, message.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.errors
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }
}

/// Validate a draft. Field errors only; consent is a form-level check the
/// flow performs separately.
pub fn validate(draft: &RegistrationDraft) -> ValidationReport {
    let mut report = ValidationReport::default();

    if draft.name.trim().is_empty() {
        report.push(Field::Name, "Full name is required");
    }
    if !EMAIL_RE.is_match(&draft.email) {
        report.push(Field::Email, "Invalid email address");
    }
    if !draft.location.is_complete() {
        report.push(Field::Location, "Please select country, state, and city");
    }
    if draft.password.chars().count() < MIN_PASSWORD_CHARS {
        report.push(Field::Password, "Password must be at least 8 characters");
    }
    if draft.password != draft.confirm_password {
        report.push(Field::ConfirmPassword, "Passwords do not match");
    }

    report
}
