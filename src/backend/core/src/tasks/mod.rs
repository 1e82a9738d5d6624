//! Tenant-scoped task service.
//!
//! Every read takes an implicit tenant filter derived from the caller's
//! principal; every write loads the row first and re-validates tenant
//! ownership before mutating. Trusting a client-supplied id without that
//! re-check is the canonical tenant-isolation bug this layer exists to
//! prevent.
//!
//! Two distinct authorization tiers apply to mutations: any organization
//! member may transition status, while editing fields requires Editor and
//! deletion requires Admin.

pub mod models;

pub use models::{NewTask, Task, TaskCategory, TaskPatch, TaskPriority, TaskStatus};

use std::sync::Arc;

use serde_json::json;

use crate::audit::{AuditEvent, AuditRecorder};
use crate::error::{HiveError, Result};
use crate::middleware::context::RequestContext;
use crate::observability::HiveEvent;
use crate::rbac::{authorize_tenant, require_role, OrganizationId, Principal, Role, TaskId, UserId};
use crate::repository::{TaskQuery, TaskStore};

/// Task operations, all scoped to the caller's tenant.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    audit: AuditRecorder,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskStore>, audit: AuditRecorder) -> Self {
        Self { tasks, audit }
    }

    /// Create a task in the caller's organization.
    ///
    /// `organization_id` and `created_by` always come from the principal;
    /// any client-supplied values for those fields were dropped before this
    /// point.
    pub async fn create(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        input: NewTask,
    ) -> Result<Task> {
        if let Err(e) = require_role(principal, Role::Editor) {
            self.audit_denied(principal, ctx, "task.create", None).await;
            return Err(e);
        }

        if input.title.trim().is_empty() {
            return Err(HiveError::validation("Task title must not be empty"));
        }

        let task = Task::create(principal, input);
        self.tasks.insert(&task).await?;

        HiveEvent::TaskCreated {
            task_id: task.id.to_string(),
            organization_id: task.organization_id.to_string(),
        }
        .log();

        self.audit
            .record(
                AuditEvent::action("task.create")
                    .by(principal)
                    .resource("task", task.id)
                    .request(ctx)
                    .detail(json!({ "title": task.title })),
            )
            .await;

        Ok(task)
    }

    /// List tasks visible to the principal.
    ///
    /// Non-administrative callers are pinned to their own organization no
    /// matter what filter they supply; administrators may pass an explicit
    /// organization or none at all (all tenants).
    pub async fn list(
        &self,
        principal: &Principal,
        organization: Option<OrganizationId>,
        involving: Option<UserId>,
    ) -> Result<Vec<Task>> {
        let scope = if principal.role.is_administrative() {
            organization
        } else {
            Some(principal.organization_id)
        };

        self.tasks
            .list(&TaskQuery {
                organization_id: scope,
                involving_user: involving,
                include_deleted: false,
            })
            .await
    }

    /// Tasks created by or assigned to the caller, within their own
    /// organization.
    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<Task>> {
        self.tasks
            .list(&TaskQuery {
                organization_id: Some(principal.organization_id),
                involving_user: Some(principal.user_id),
                include_deleted: false,
            })
            .await
    }

    /// Fetch one task, hiding foreign-tenant rows as not-found.
    pub async fn get(&self, principal: &Principal, id: &TaskId) -> Result<Task> {
        self.load_in_tenant(principal, id).await
    }

    /// Edit a task's fields. Editor-and-up, same tenant.
    pub async fn update(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        id: &TaskId,
        patch: TaskPatch,
    ) -> Result<Task> {
        if let Err(e) = require_role(principal, Role::Editor) {
            self.audit_denied(principal, ctx, "task.update", Some(id)).await;
            return Err(e);
        }

        let mut task = self.load_in_tenant(principal, id).await?;
        task.apply(patch);
        self.tasks.update(&task).await?;

        self.audit
            .record(
                AuditEvent::action("task.update")
                    .by(principal)
                    .resource("task", task.id)
                    .request(ctx)
                    .detail(json!({ "title": task.title })),
            )
            .await;

        Ok(task)
    }

    /// Transition a task's status.
    ///
    /// Narrower privilege than a full update: any authenticated member of
    /// the task's organization may move it through the state machine.
    /// Re-asserting the current status is an idempotent no-op success, and
    /// each call produces exactly one audit entry.
    pub async fn update_status(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Task> {
        let mut task = self.load_in_tenant(principal, id).await?;

        let from = task.status;
        let changed = match task.transition(status) {
            Ok(changed) => changed,
            Err(e) => {
                self.audit
                    .record(
                        AuditEvent::action("task.status")
                            .by(principal)
                            .resource("task", *id)
                            .request(ctx)
                            .failure()
                            .detail(json!({ "from": from, "to": status })),
                    )
                    .await;
                return Err(e);
            }
        };

        if changed {
            self.tasks.update(&task).await?;
            HiveEvent::TaskStatusChanged {
                task_id: task.id.to_string(),
                from: from.to_string(),
                to: status.to_string(),
            }
            .log();
        }

        self.audit
            .record(
                AuditEvent::action("task.status")
                    .by(principal)
                    .resource("task", task.id)
                    .request(ctx)
                    .detail(json!({ "from": from, "to": status, "changed": changed })),
            )
            .await;

        Ok(task)
    }

    /// Soft-delete a task. Admin-and-up.
    pub async fn delete(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        id: &TaskId,
    ) -> Result<()> {
        if let Err(e) = require_role(principal, Role::Admin) {
            self.audit_denied(principal, ctx, "task.delete", Some(id)).await;
            return Err(e);
        }

        let mut task = self.load_in_tenant(principal, id).await?;
        task.soft_delete();
        self.tasks.update(&task).await?;

        self.audit
            .record(
                AuditEvent::action("task.delete")
                    .by(principal)
                    .resource("task", task.id)
                    .request(ctx)
                    .detail(json!({ "title": task.title })),
            )
            .await;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Load a live task and re-validate tenant ownership.
    ///
    /// Missing and soft-deleted rows are `RecordNotFound`; rows in a
    /// foreign tenant are `TenantDenied`, which clients see as the same
    /// 404.
    async fn load_in_tenant(&self, principal: &Principal, id: &TaskId) -> Result<Task> {
        let task = self
            .tasks
            .find_by_id(id)
            .await?
            .filter(|t| !t.is_deleted)
            .ok_or_else(|| HiveError::not_found("task", id.to_string()))?;

        if authorize_tenant(principal, &task.organization_id).is_denied() {
            return Err(HiveError::tenant_denied("task", id.to_string()));
        }

        Ok(task)
    }

    async fn audit_denied(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        action: &str,
        id: Option<&TaskId>,
    ) {
        let mut event = AuditEvent::action(action)
            .by(principal)
            .resource_type("task")
            .request(ctx)
            .failure()
            .detail(json!({ "reason": "insufficient role", "role": principal.role }));
        if let Some(id) = id {
            event = event.resource("task", id);
        }
        self.audit.record(event).await;
    }
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService").finish()
    }
}
