//! Data model for the auth flow: canonical phones, OTP sessions, account
//! identities, location selections and registration drafts.

pub mod identity;
pub mod location;
pub mod otp;
pub mod phone;
pub mod registration;
