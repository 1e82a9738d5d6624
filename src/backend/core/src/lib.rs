//! # Taskhive Core
//!
//! Multi-tenant task management backend with role-based access control and
//! an immutable audit trail.
//!
//! ## Architecture
//!
//! - **Auth**: argon2id credentials, RS256 token issuance, validation with
//!   a live user re-check on every request
//! - **RBAC**: a closed, totally ordered role set with pure authorization
//!   predicates and a declarative route policy table
//! - **Tenant-scoped services**: organizations, users, and tasks, every
//!   operation filtered and re-validated against the caller's organization
//! - **Audit**: best-effort, causally ordered recording of every
//!   authorization-relevant action, with query and aggregation
//! - **Persistence**: repository traits with PostgreSQL (sqlx) and
//!   in-memory implementations
//! - **Observability**: tracing with optional OTLP export, Prometheus
//!   metrics

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod orgs;
pub mod pagination;
pub mod rbac;
pub mod repository;
pub mod tasks;
pub mod users;

pub use error::{ErrorCode, ErrorContext, HiveError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::audit::{
        AuditEvent, AuditFilter, AuditLogEntry, AuditOutcome, AuditRecorder, AuditStats,
    };
    pub use crate::auth::{
        AuthError, AuthSession, Claims, KeyMaterial, RegisterRequest, TokenIssuer, TokenValidator,
    };
    pub use crate::error::{ErrorCode, ErrorContext, HiveError, Result};
    pub use crate::middleware::{AuthLayer, RequestContext};
    pub use crate::orgs::{NewOrganization, OrgService, Organization, OrganizationPatch};
    pub use crate::pagination::{Page, PageMetadata, Paginated};
    pub use crate::rbac::{
        authorize, authorize_tenant, require_role, require_tenant, AuditEntryId, OrganizationId,
        PolicyDecision, PolicyTable, Principal, RbacLayer, Role, RoutePolicy, TaskId, UserId,
    };
    pub use crate::repository::{
        AuditStore, OrganizationStore, TaskQuery, TaskStore, UserStore,
    };
    pub use crate::tasks::{
        NewTask, Task, TaskCategory, TaskPatch, TaskPriority, TaskService, TaskStatus,
    };
    pub use crate::users::{User, UserPatch, UserService, UserView};
}
