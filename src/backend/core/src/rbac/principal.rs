//! Identifiers and the authenticated principal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::role::Role;

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Strongly-typed user identifier.
    UserId
);

uuid_id!(
    /// Strongly-typed organization (tenant) identifier.
    OrganizationId
);

uuid_id!(
    /// Strongly-typed task identifier.
    TaskId
);

uuid_id!(
    /// Strongly-typed audit log entry identifier.
    AuditEntryId
);

// ═══════════════════════════════════════════════════════════════════════════════
// Principal
// ═══════════════════════════════════════════════════════════════════════════════

/// The authenticated actor attached to a request.
///
/// A principal always carries exactly one active organization context per
/// request, even if the underlying account could hold roles elsewhere.
/// It is reconstructed on every request from the token plus a live user
/// lookup, so the role and organization here reflect the current database
/// state, not the state at token issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub organization_id: OrganizationId,
    pub role: Role,
}

impl Principal {
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
        organization_id: OrganizationId,
        role: Role,
    ) -> Self {
        Self {
            user_id,
            email: email.into(),
            name: name.into(),
            organization_id,
            role,
        }
    }

    /// Check whether this principal belongs to the given organization.
    pub fn belongs_to(&self, organization_id: &OrganizationId) -> bool {
        &self.organization_id == organization_id
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
