//! User entity and API projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rbac::{OrganizationId, Principal, Role, UserId};

/// A credential holder.
///
/// The password is stored only as a salted argon2id hash. Users are never
/// hard-deleted: deactivation flips `is_active` so historical tasks and
/// audit entries keep a valid actor reference.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user.
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password_hash: impl Into<String>,
        organization_id: OrganizationId,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            email: email.into(),
            name: name.into(),
            password_hash: password_hash.into(),
            organization_id,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the request principal for this user from its live state.
    pub fn to_principal(&self) -> Principal {
        Principal::new(
            self.id,
            self.email.clone(),
            self.name.clone(),
            self.organization_id,
            self.role,
        )
    }

    /// Logically deactivate the account.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

/// The user shape exposed through the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            organization_id: user.organization_id,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_reflects_live_state() {
        let org = OrganizationId::generate();
        let mut user = User::new("a@example.com", "A", "hash", org, Role::Viewer);

        user.role = Role::Admin;
        let principal = user.to_principal();
        assert_eq!(principal.role, Role::Admin);
        assert_eq!(principal.organization_id, org);
    }

    #[test]
    fn test_view_has_no_password_hash() {
        let user = User::new(
            "a@example.com",
            "A",
            "$argon2id$secret",
            OrganizationId::generate(),
            Role::Viewer,
        );
        let json = serde_json::to_string(&UserView::from(&user)).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("organizationId"));
    }

    #[test]
    fn test_deactivate_is_logical() {
        let mut user = User::new(
            "a@example.com",
            "A",
            "hash",
            OrganizationId::generate(),
            Role::Editor,
        );
        assert!(user.is_active);
        user.deactivate();
        assert!(!user.is_active);
    }
}
