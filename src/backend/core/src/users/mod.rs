//! User service.

pub mod models;

pub use models::{User, UserView};

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::audit::{AuditEvent, AuditRecorder};
use crate::error::{HiveError, Result};
use crate::middleware::context::RequestContext;
use crate::rbac::{authorize_tenant, require_role, Principal, Role, UserId};
use crate::repository::UserStore;

/// Partial update for a user. Role changes take effect on the target's next
/// request because principals are rebuilt from the live record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub role: Option<Role>,
}

/// User operations, tenant-gated.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    audit: AuditRecorder,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, audit: AuditRecorder) -> Self {
        Self { users, audit }
    }

    /// Fetch one user, hiding foreign-tenant rows as not-found.
    pub async fn get(&self, principal: &Principal, id: &UserId) -> Result<UserView> {
        let user = self.load(id).await?;

        if authorize_tenant(principal, &user.organization_id).is_denied() {
            return Err(HiveError::tenant_denied("user", id.to_string()));
        }

        Ok(UserView::from(&user))
    }

    /// Update a user's name or role. Admin-and-up; the target must be in
    /// the caller's tenant unless the caller is administrative.
    pub async fn update(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<UserView> {
        require_role(principal, Role::Admin)?;
        let mut user = self.load(id).await?;

        if authorize_tenant(principal, &user.organization_id).is_denied() {
            return Err(HiveError::tenant_denied("user", id.to_string()));
        }

        let old_role = user.role;
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(HiveError::validation("User name must not be empty"));
            }
            user.name = name;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        user.updated_at = chrono::Utc::now();

        self.users.update(&user).await?;

        self.audit
            .record(
                AuditEvent::action("user.update")
                    .by(principal)
                    .resource("user", user.id)
                    .request(ctx)
                    .detail(json!({ "oldRole": old_role, "newRole": user.role })),
            )
            .await;

        Ok(UserView::from(&user))
    }

    /// Logically deactivate a user. Admin-and-up. The record survives so
    /// historical tasks and audit entries keep a valid actor; any
    /// still-unexpired token stops working at the validator's live check.
    pub async fn deactivate(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        id: &UserId,
    ) -> Result<UserView> {
        require_role(principal, Role::Admin)?;
        let mut user = self.load(id).await?;

        if authorize_tenant(principal, &user.organization_id).is_denied() {
            return Err(HiveError::tenant_denied("user", id.to_string()));
        }

        user.deactivate();
        self.users.update(&user).await?;

        self.audit
            .record(
                AuditEvent::action("user.deactivate")
                    .by(principal)
                    .resource("user", user.id)
                    .request(ctx)
                    .detail(json!({ "email": user.email })),
            )
            .await;

        Ok(UserView::from(&user))
    }

    async fn load(&self, id: &UserId) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| HiveError::not_found("user", id.to_string()))
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish()
    }
}
