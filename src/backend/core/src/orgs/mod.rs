//! Organization (tenant) service.

pub mod models;

pub use models::{generate_api_key, Organization};

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::audit::{AuditEvent, AuditRecorder};
use crate::error::{HiveError, Result};
use crate::middleware::context::RequestContext;
use crate::observability::HiveEvent;
use crate::rbac::{authorize_tenant, require_role, OrganizationId, Principal, Role};
use crate::repository::{OrganizationStore, UserStore};
use crate::users::models::{User, UserView};

/// Input for organization creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<OrganizationId>,
}

/// Partial update for an organization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Organization operations.
#[derive(Clone)]
pub struct OrgService {
    orgs: Arc<dyn OrganizationStore>,
    users: Arc<dyn UserStore>,
    audit: AuditRecorder,
}

impl OrgService {
    pub fn new(
        orgs: Arc<dyn OrganizationStore>,
        users: Arc<dyn UserStore>,
        audit: AuditRecorder,
    ) -> Self {
        Self { orgs, users, audit }
    }

    /// Create an organization. Admin-and-up; unique name; an optional
    /// parent makes it a sub-organization.
    pub async fn create(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        input: NewOrganization,
    ) -> Result<Organization> {
        require_role(principal, Role::Admin)?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(HiveError::validation("Organization name must not be empty"));
        }

        if self.orgs.find_by_name(name).await?.is_some() {
            return Err(HiveError::duplicate(format!(
                "An organization named '{}' already exists",
                name
            )));
        }

        let mut organization = Organization::new(name, input.description);
        if let Some(parent_id) = input.parent_id {
            // The parent must exist and be active; only administrators get
            // here, so no tenant restriction applies.
            self.orgs
                .find_by_id(&parent_id)
                .await?
                .filter(|o| o.is_active)
                .ok_or_else(|| HiveError::not_found("organization", parent_id.to_string()))?;
            organization = organization.with_parent(parent_id);
        }

        self.orgs.insert(&organization).await?;

        HiveEvent::OrganizationCreated {
            organization_id: organization.id.to_string(),
            name: organization.name.clone(),
        }
        .log();

        self.audit
            .record(
                AuditEvent::action("organization.create")
                    .by(principal)
                    .resource("organization", organization.id)
                    .request(ctx)
                    .detail(json!({ "name": organization.name })),
            )
            .await;

        Ok(organization)
    }

    /// List organizations: all of them for administrators, the caller's
    /// own organization for everyone else.
    pub async fn list(&self, principal: &Principal) -> Result<Vec<Organization>> {
        if principal.role.is_administrative() {
            return self.orgs.list_active().await;
        }

        let own = self.load_active(&principal.organization_id).await?;
        Ok(vec![own])
    }

    /// Fetch one organization, tenant-gated.
    pub async fn get(&self, principal: &Principal, id: &OrganizationId) -> Result<Organization> {
        if authorize_tenant(principal, id).is_denied() {
            return Err(HiveError::tenant_denied("organization", id.to_string()));
        }
        self.load_active(id).await
    }

    /// Update name/description. Admin-and-up.
    pub async fn update(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        id: &OrganizationId,
        patch: OrganizationPatch,
    ) -> Result<Organization> {
        require_role(principal, Role::Admin)?;
        let mut organization = self.load_active(id).await?;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(HiveError::validation("Organization name must not be empty"));
            }
            if name != organization.name && self.orgs.find_by_name(&name).await?.is_some() {
                return Err(HiveError::duplicate(format!(
                    "An organization named '{}' already exists",
                    name
                )));
            }
            organization.name = name;
        }
        if let Some(description) = patch.description {
            organization.description = Some(description);
        }
        organization.updated_at = chrono::Utc::now();

        self.orgs.update(&organization).await?;

        self.audit
            .record(
                AuditEvent::action("organization.update")
                    .by(principal)
                    .resource("organization", organization.id)
                    .request(ctx)
                    .detail(json!({ "name": organization.name })),
            )
            .await;

        Ok(organization)
    }

    /// Soft-delete an organization. Admin-and-up.
    pub async fn deactivate(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        id: &OrganizationId,
    ) -> Result<()> {
        require_role(principal, Role::Admin)?;
        let mut organization = self.load_active(id).await?;

        organization.deactivate();
        self.orgs.update(&organization).await?;

        self.audit
            .record(
                AuditEvent::action("organization.deactivate")
                    .by(principal)
                    .resource("organization", organization.id)
                    .request(ctx)
                    .detail(json!({ "name": organization.name })),
            )
            .await;

        Ok(())
    }

    /// Active users in an organization, tenant-gated.
    pub async fn users_in(
        &self,
        principal: &Principal,
        id: &OrganizationId,
    ) -> Result<Vec<UserView>> {
        if authorize_tenant(principal, id).is_denied() {
            return Err(HiveError::tenant_denied("organization", id.to_string()));
        }
        self.load_active(id).await?;

        let users: Vec<User> = self.users.list_by_organization(id).await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    /// Direct (non-transitive) children of an organization, tenant-gated on
    /// the requested parent.
    pub async fn children(
        &self,
        principal: &Principal,
        id: &OrganizationId,
    ) -> Result<Vec<Organization>> {
        if authorize_tenant(principal, id).is_denied() {
            return Err(HiveError::tenant_denied("organization", id.to_string()));
        }
        self.load_active(id).await?;

        self.orgs.list_children(id).await
    }

    /// Resolve an organization by its API key. This is the org-level
    /// programmatic access path; no principal is involved.
    pub async fn find_by_api_key(&self, api_key: &str) -> Result<Organization> {
        self.orgs
            .find_by_api_key(api_key)
            .await?
            .filter(|o| o.is_active)
            .ok_or_else(|| HiveError::not_found("organization", "by-api-key"))
    }

    async fn load_active(&self, id: &OrganizationId) -> Result<Organization> {
        self.orgs
            .find_by_id(id)
            .await?
            .filter(|o| o.is_active)
            .ok_or_else(|| HiveError::not_found("organization", id.to_string()))
    }
}

impl std::fmt::Debug for OrgService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgService").finish()
    }
}
