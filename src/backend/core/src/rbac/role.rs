//! The closed role set and its total privilege order.
//!
//! Taskhive ships with four built-in roles:
//!
//! | Role   | Description                                                    |
//! |--------|----------------------------------------------------------------|
//! | Owner  | Full control of the organization, including member management   |
//! | Admin  | Manage organizations, users, tasks, and the audit log           |
//! | Editor | Create and edit tasks                                           |
//! | Viewer | Read-only access plus task status transitions                   |
//!
//! Privilege comparisons always go through the total order
//! `Viewer < Editor < Admin < Owner`; role names are never compared as
//! strings. A required role is a *minimum threshold*, so Owner implicitly
//! holds every Admin capability, and so on down the lattice.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A role in the closed, totally ordered role set.
///
/// The `Ord` derive relies on declaration order: variants are declared from
/// least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
    Owner,
}

impl Role {
    /// Numeric rank within the privilege order (higher = more privileged).
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Viewer => 0,
            Self::Editor => 1,
            Self::Admin => 2,
            Self::Owner => 3,
        }
    }

    /// Check whether this role meets a minimum threshold.
    pub const fn at_least(&self, minimum: Role) -> bool {
        self.rank() >= minimum.rank()
    }

    /// The minimum role allowed to cross tenant boundaries.
    ///
    /// Admin and Owner are administrative roles; everyone else is strictly
    /// confined to their own organization.
    pub const CROSS_TENANT_MINIMUM: Role = Role::Admin;

    /// Check whether this role may act across organization boundaries.
    pub const fn is_administrative(&self) -> bool {
        self.at_least(Self::CROSS_TENANT_MINIMUM)
    }

    /// Canonical string form, matching the serialized representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "VIEWER",
            Self::Editor => "EDITOR",
            Self::Admin => "ADMIN",
            Self::Owner => "OWNER",
        }
    }

    /// All roles, least privileged first.
    pub const fn all() -> [Role; 4] {
        [Self::Viewer, Self::Editor, Self::Admin, Self::Owner]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VIEWER" => Ok(Self::Viewer),
            "EDITOR" => Ok(Self::Editor),
            "ADMIN" => Ok(Self::Admin),
            "OWNER" => Ok(Self::Owner),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        assert!(Role::Viewer < Role::Editor);
        assert!(Role::Editor < Role::Admin);
        assert!(Role::Admin < Role::Owner);
    }

    #[test]
    fn test_at_least_is_reflexive() {
        for role in Role::all() {
            assert!(role.at_least(role));
        }
    }

    #[test]
    fn test_owner_meets_every_threshold() {
        for minimum in Role::all() {
            assert!(Role::Owner.at_least(minimum));
        }
    }

    #[test]
    fn test_viewer_meets_only_viewer() {
        assert!(Role::Viewer.at_least(Role::Viewer));
        assert!(!Role::Viewer.at_least(Role::Editor));
        assert!(!Role::Viewer.at_least(Role::Admin));
        assert!(!Role::Viewer.at_least(Role::Owner));
    }

    #[test]
    fn test_administrative_roles() {
        assert!(!Role::Viewer.is_administrative());
        assert!(!Role::Editor.is_administrative());
        assert!(Role::Admin.is_administrative());
        assert!(Role::Owner.is_administrative());
    }

    #[test]
    fn test_round_trip_parse() {
        for role in Role::all() {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("SUPERUSER".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_representation() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let parsed: Role = serde_json::from_str("\"VIEWER\"").unwrap();
        assert_eq!(parsed, Role::Viewer);
    }
}
