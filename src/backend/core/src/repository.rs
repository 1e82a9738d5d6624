//! Repository traits — the persistence seam.
//!
//! The core treats storage as an external collaborator: one async trait per
//! entity, implemented by the PostgreSQL layer in [`crate::db`] and by the
//! in-memory store used in tests. Services only ever see these traits.
//!
//! Tenant filtering is *not* delegated to implementations: services pass
//! explicit organization scopes in queries, so an implementation cannot
//! accidentally widen a tenant's view.

use async_trait::async_trait;

use crate::audit::models::{AuditFilter, AuditLogEntry, AuditStats};
use crate::error::Result;
use crate::orgs::models::Organization;
use crate::pagination::Page;
use crate::rbac::{OrganizationId, TaskId, UserId};
use crate::tasks::models::Task;
use crate::users::models::User;

// ═══════════════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<()>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Active users in an organization.
    async fn list_by_organization(&self, organization_id: &OrganizationId) -> Result<Vec<User>>;

    async fn update(&self, user: &User) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Organizations
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn insert(&self, organization: &Organization) -> Result<()>;

    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Organization>>;

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Organization>>;

    /// All active organizations.
    async fn list_active(&self) -> Result<Vec<Organization>>;

    /// Direct (non-transitive) active children of a parent organization.
    async fn list_children(&self, parent_id: &OrganizationId) -> Result<Vec<Organization>>;

    async fn update(&self, organization: &Organization) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════════

/// Query scope for task listings. `organization_id = None` means
/// all organizations — services only produce that for administrative
/// principals.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub organization_id: Option<OrganizationId>,
    /// Match tasks created by or assigned to this user.
    pub involving_user: Option<UserId>,
    pub include_deleted: bool,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: &Task) -> Result<()>;

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>>;

    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>>;

    async fn update(&self, task: &Task) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Audit
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append an entry. The store never updates or deletes entries.
    async fn append(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Filtered query, newest first, with the total match count.
    async fn query(&self, filter: &AuditFilter, page: &Page)
        -> Result<(Vec<AuditLogEntry>, u64)>;

    /// Aggregate statistics over the matching entries.
    async fn stats(&self, filter: &AuditFilter) -> Result<AuditStats>;
}
