//! The RBAC decision point.
//!
//! Answers two questions, and nothing else:
//!
//! - does this principal's role meet a required minimum?
//! - may this principal act on a resource owned by a given organization?
//!
//! Both checks are pure functions of request-scoped data. There is no I/O,
//! no clock, and no shared state, which makes every role × tenant
//! combination exhaustively testable.
//!
//! Call sites translate a `Deny` into 403 Forbidden (role) or a 404-shaped
//! tenant denial (foreign resource); the *absence* of a principal is 401 and
//! never reaches these functions.

use crate::error::HiveError;

use super::principal::{OrganizationId, Principal};
use super::role::Role;

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The action is allowed.
    Allow,
    /// The action is denied, with a reason.
    Deny(String),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision Point
// ═══════════════════════════════════════════════════════════════════════════════

/// Check a principal's role against a minimum threshold.
///
/// `None` means the endpoint is public-but-authenticated: any principal
/// passes. Otherwise the principal's role must be at least as privileged as
/// the minimum under the total order; there is no exact-match semantics.
pub fn authorize(principal: &Principal, minimum: Option<Role>) -> PolicyDecision {
    match minimum {
        None => PolicyDecision::Allow,
        Some(min) if principal.role.at_least(min) => PolicyDecision::Allow,
        Some(min) => PolicyDecision::Deny(format!(
            "role {} does not meet required minimum {}",
            principal.role, min
        )),
    }
}

/// Check whether a principal may act on a resource owned by
/// `target_organization`.
///
/// Allowed iff the principal belongs to that organization, or holds an
/// administrative role (Admin or Owner), which may cross tenant boundaries.
pub fn authorize_tenant(
    principal: &Principal,
    target_organization: &OrganizationId,
) -> PolicyDecision {
    if principal.belongs_to(target_organization) || principal.role.is_administrative() {
        PolicyDecision::Allow
    } else {
        PolicyDecision::Deny(format!(
            "user {} (org {}) may not access organization {}",
            principal.user_id, principal.organization_id, target_organization
        ))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service-layer helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Enforce a minimum role, mapping a denial to `Forbidden`.
pub fn require_role(principal: &Principal, minimum: Role) -> Result<(), HiveError> {
    match authorize(principal, Some(minimum)) {
        PolicyDecision::Allow => Ok(()),
        PolicyDecision::Deny(reason) => Err(HiveError::forbidden(
            "You do not have permission to perform this action",
        )
        .with_internal_message(reason)),
    }
}

/// Enforce tenant ownership, mapping a denial to `Forbidden`.
///
/// Use this when the caller named the organization themselves (the target's
/// existence is not a secret). For row-level resources where existence must
/// not leak, use [`HiveError::tenant_denied`] at the call site instead.
pub fn require_tenant(
    principal: &Principal,
    target_organization: &OrganizationId,
) -> Result<(), HiveError> {
    match authorize_tenant(principal, target_organization) {
        PolicyDecision::Allow => Ok(()),
        PolicyDecision::Deny(reason) => Err(HiveError::forbidden(
            "You do not have access to this organization",
        )
        .with_internal_message(reason)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::principal::UserId;

    fn principal(role: Role, org: OrganizationId) -> Principal {
        Principal::new(UserId::generate(), "t@example.com", "Test", org, role)
    }

    #[test]
    fn test_no_minimum_allows_every_role() {
        let org = OrganizationId::generate();
        for role in Role::all() {
            assert!(authorize(&principal(role, org), None).is_allowed());
        }
    }

    #[test]
    fn test_threshold_matrix() {
        // Exhaustive role x minimum grid: allow iff rank(role) >= rank(min).
        let org = OrganizationId::generate();
        for role in Role::all() {
            for minimum in Role::all() {
                let decision = authorize(&principal(role, org), Some(minimum));
                assert_eq!(
                    decision.is_allowed(),
                    role.rank() >= minimum.rank(),
                    "role={} minimum={}",
                    role,
                    minimum
                );
            }
        }
    }

    #[test]
    fn test_threshold_is_not_exact_match() {
        let org = OrganizationId::generate();
        // Owner passes an Admin requirement: hierarchy, not set membership.
        assert!(authorize(&principal(Role::Owner, org), Some(Role::Admin)).is_allowed());
        assert!(authorize(&principal(Role::Admin, org), Some(Role::Editor)).is_allowed());
    }

    #[test]
    fn test_tenant_matrix() {
        // Exhaustive role x (own org | foreign org) grid.
        let own = OrganizationId::generate();
        let foreign = OrganizationId::generate();

        for role in Role::all() {
            let p = principal(role, own);
            assert!(
                authorize_tenant(&p, &own).is_allowed(),
                "own-org access must always be allowed (role={})",
                role
            );
            assert_eq!(
                authorize_tenant(&p, &foreign).is_allowed(),
                role.is_administrative(),
                "cross-tenant access is administrative-only (role={})",
                role
            );
        }
    }

    #[test]
    fn test_deny_carries_reason() {
        let own = OrganizationId::generate();
        let foreign = OrganizationId::generate();
        let p = principal(Role::Viewer, own);

        match authorize_tenant(&p, &foreign) {
            PolicyDecision::Deny(reason) => {
                assert!(reason.contains(&foreign.to_string()));
            }
            PolicyDecision::Allow => panic!("expected deny"),
        }
    }

    #[test]
    fn test_require_role_maps_to_forbidden() {
        let org = OrganizationId::generate();
        let err = require_role(&principal(Role::Viewer, org), Role::Admin).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Forbidden);
        assert!(err.internal_message().unwrap().contains("VIEWER"));
    }

    #[test]
    fn test_require_tenant_maps_to_forbidden() {
        let own = OrganizationId::generate();
        let foreign = OrganizationId::generate();
        let err = require_tenant(&principal(Role::Editor, own), &foreign).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Forbidden);
    }
}
