//! Account identities and role gating.
//!
//! Roles are a closed set; anything that gates on a role matches
//! exhaustively so a new variant cannot slip through a `_` arm.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::phone::PhoneNumber;

/// KYC review state for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotStarted,
    Pending,
    Approved,
    Rejected,
}

/// Role discriminant, used where a role is requested rather than held
/// (e.g. the demo login contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Guest,
    Registered,
    Kyc,
    Admin,
}

/// Account role with role-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Guest,
    Registered,
    Kyc {
        status: KycStatus,
        wallet_balance: Decimal,
    },
    Admin,
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Guest => RoleKind::Guest,
            Role::Registered => RoleKind::Registered,
            Role::Kyc { .. } => RoleKind::Kyc,
            Role::Admin => RoleKind::Admin,
        }
    }

    /// Investment access requires approved KYC. Admins manage the platform
    /// but do not invest through it.
    pub fn can_invest(&self) -> bool {
        match self {
            Role::Kyc {
                status: KycStatus::Approved,
                ..
            } => true,
            Role::Guest | Role::Registered | Role::Kyc { .. } | Role::Admin => false,
        }
    }

    pub fn is_admin(&self) -> bool {
        match self {
            Role::Admin => true,
            Role::Guest | Role::Registered | Role::Kyc { .. } => false,
        }
    }
}

/// An authenticated account as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<PhoneNumber>,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_approved_kyc_can_invest() {
        assert!(Role::Kyc {
            status: KycStatus::Approved,
            wallet_balance: Decimal::from(125_000),
        }
        .can_invest());

        assert!(!Role::Kyc {
            status: KycStatus::Pending,
            wallet_balance: Decimal::ZERO,
        }
        .can_invest());
        assert!(!Role::Registered.can_invest());
        assert!(!Role::Admin.can_invest());
        assert!(!Role::Guest.can_invest());
    }

    #[test]
    fn test_role_kind() {
        assert_eq!(Role::Admin.kind(), RoleKind::Admin);
        assert_eq!(
            Role::Kyc {
                status: KycStatus::NotStarted,
                wallet_balance: Decimal::ZERO,
            }
            .kind(),
            RoleKind::Kyc
        );
    }

    #[test]
    fn test_admin_gate() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Registered.is_admin());
    }
}
