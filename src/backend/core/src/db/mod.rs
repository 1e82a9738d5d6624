//! PostgreSQL persistence layer.
//!
//! One [`Database`] over a `PgPool` implements every repository trait.
//! Rows are mapped by hand; enums are stored as their canonical text form.

pub mod memory;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::audit::models::{AuditFilter, AuditLogEntry, AuditStats, CountedBucket};
use crate::audit::AuditOutcome;
use crate::error::{ErrorCode, HiveError, Result};
use crate::orgs::models::Organization;
use crate::pagination::Page;
use crate::rbac::{AuditEntryId, OrganizationId, Role, TaskId, UserId};
use crate::repository::{AuditStore, OrganizationStore, TaskQuery, TaskStore, UserStore};
use crate::tasks::models::{Task, TaskCategory, TaskPriority, TaskStatus};
use crate::users::models::User;

/// Database connection and operations.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn new(database_url: &str, max_connections: u32, min_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                HiveError::with_internal(
                    ErrorCode::DatabaseError,
                    "Database migration failed",
                    e.to_string(),
                )
            })?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Row Mapping
// ═══════════════════════════════════════════════════════════════════════════════

fn corrupt_row(column: &str, value: &str) -> HiveError {
    HiveError::with_internal(
        ErrorCode::DatabaseError,
        "A database error occurred",
        format!("unexpected value in column {}: {}", column, value),
    )
}

fn row_to_user(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId(row.try_get("id")?),
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        organization_id: OrganizationId(row.try_get("organization_id")?),
        role: role.parse::<Role>().map_err(|_| corrupt_row("role", &role))?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_organization(row: &PgRow) -> Result<Organization> {
    Ok(Organization {
        id: OrganizationId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        parent_id: row
            .try_get::<Option<uuid::Uuid>, _>("parent_id")?
            .map(OrganizationId),
        api_key: row.try_get("api_key")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_task(row: &PgRow) -> Result<Task> {
    let category: String = row.try_get("category")?;
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;

    Ok(Task {
        id: TaskId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: TaskCategory::parse(&category)
            .ok_or_else(|| corrupt_row("category", &category))?,
        status: TaskStatus::parse(&status).ok_or_else(|| corrupt_row("status", &status))?,
        priority: TaskPriority::parse(&priority)
            .ok_or_else(|| corrupt_row("priority", &priority))?,
        organization_id: OrganizationId(row.try_get("organization_id")?),
        created_by: UserId(row.try_get("created_by")?),
        assigned_to: row
            .try_get::<Option<uuid::Uuid>, _>("assigned_to")?
            .map(UserId),
        due_date: row.try_get("due_date")?,
        is_deleted: row.try_get("is_deleted")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_audit_entry(row: &PgRow) -> Result<AuditLogEntry> {
    let outcome: String = row.try_get("outcome")?;
    Ok(AuditLogEntry {
        id: AuditEntryId(row.try_get("id")?),
        actor_id: row.try_get::<Option<uuid::Uuid>, _>("actor_id")?.map(UserId),
        action: row.try_get("action")?,
        resource_type: row.try_get("resource_type")?,
        resource_id: row.try_get("resource_id")?,
        organization_id: row
            .try_get::<Option<uuid::Uuid>, _>("organization_id")?
            .map(OrganizationId),
        outcome: AuditOutcome::parse(&outcome)
            .ok_or_else(|| corrupt_row("outcome", &outcome))?,
        detail: row
            .try_get::<Option<serde_json::Value>, _>("detail")?
            .unwrap_or(serde_json::Value::Null),
        client_ip: row.try_get("client_ip")?,
        user_agent: row.try_get("user_agent")?,
        request_id: row.try_get("request_id")?,
        created_at: row.try_get("created_at")?,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl UserStore for Database {
    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, email, name, password_hash, organization_id, role, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.organization_id.as_uuid())
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_by_organization(&self, organization_id: &OrganizationId) -> Result<Vec<User>> {
        let rows = sqlx::query(
            "SELECT * FROM users WHERE organization_id = $1 AND is_active ORDER BY created_at",
        )
        .bind(organization_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, name = $3, password_hash = $4, role = $5, is_active = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(HiveError::not_found("user", user.id.to_string()));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Organizations
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl OrganizationStore for Database {
    async fn insert(&self, organization: &Organization) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO organizations
                (id, name, description, parent_id, api_key, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.name)
        .bind(&organization.description)
        .bind(organization.parent_id.map(|p| p.as_uuid()))
        .bind(&organization.api_key)
        .bind(organization.is_active)
        .bind(organization.created_at)
        .bind(organization.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>> {
        let row = sqlx::query("SELECT * FROM organizations WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_organization).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Organization>> {
        let row = sqlx::query("SELECT * FROM organizations WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_organization).transpose()
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Organization>> {
        let row = sqlx::query("SELECT * FROM organizations WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_organization).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Organization>> {
        let rows = sqlx::query("SELECT * FROM organizations WHERE is_active ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_organization).collect()
    }

    async fn list_children(&self, parent_id: &OrganizationId) -> Result<Vec<Organization>> {
        let rows = sqlx::query(
            "SELECT * FROM organizations WHERE parent_id = $1 AND is_active ORDER BY created_at",
        )
        .bind(parent_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_organization).collect()
    }

    async fn update(&self, organization: &Organization) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET name = $2, description = $3, api_key = $4, is_active = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.name)
        .bind(&organization.description)
        .bind(&organization.api_key)
        .bind(organization.is_active)
        .bind(organization.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(HiveError::not_found(
                "organization",
                organization.id.to_string(),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl TaskStore for Database {
    async fn insert(&self, task: &Task) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks
                (id, title, description, category, status, priority, organization_id,
                 created_by, assigned_to, due_date, is_deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(task.id.as_uuid())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.category.as_str())
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.organization_id.as_uuid())
        .bind(task.created_by.as_uuid())
        .bind(task.assigned_to.map(|u| u.as_uuid()))
        .bind(task.due_date)
        .bind(task.is_deleted)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM tasks WHERE TRUE");

        if !query.include_deleted {
            builder.push(" AND NOT is_deleted");
        }
        if let Some(org) = &query.organization_id {
            builder.push(" AND organization_id = ");
            builder.push_bind(org.as_uuid());
        }
        if let Some(user) = &query.involving_user {
            builder.push(" AND (created_by = ");
            builder.push_bind(user.as_uuid());
            builder.push(" OR assigned_to = ");
            builder.push_bind(user.as_uuid());
            builder.push(")");
        }
        builder.push(" ORDER BY created_at DESC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn update(&self, task: &Task) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, category = $4, status = $5, priority = $6,
                assigned_to = $7, due_date = $8, is_deleted = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(task.id.as_uuid())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.category.as_str())
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.assigned_to.map(|u| u.as_uuid()))
        .bind(task.due_date)
        .bind(task.is_deleted)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(HiveError::not_found("task", task.id.to_string()));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Audit
// ═══════════════════════════════════════════════════════════════════════════════

fn push_audit_filter(builder: &mut QueryBuilder<Postgres>, filter: &AuditFilter) {
    if let Some(org) = &filter.organization_id {
        builder.push(" AND organization_id = ");
        builder.push_bind(org.as_uuid());
    }
    if let Some(actor) = &filter.actor_id {
        builder.push(" AND actor_id = ");
        builder.push_bind(actor.as_uuid());
    }
    if let Some(action) = &filter.action {
        builder.push(" AND action = ");
        builder.push_bind(action.clone());
    }
    if let Some(from) = filter.from {
        builder.push(" AND created_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND created_at <= ");
        builder.push_bind(to);
    }
}

#[async_trait]
impl AuditStore for Database {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, actor_id, action, resource_type, resource_id, organization_id,
                 outcome, detail, client_ip, user_agent, request_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.actor_id.map(|a| a.as_uuid()))
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(entry.organization_id.map(|o| o.as_uuid()))
        .bind(entry.outcome.as_str())
        .bind(&entry.detail)
        .bind(&entry.client_ip)
        .bind(&entry.user_agent)
        .bind(&entry.request_id)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        filter: &AuditFilter,
        page: &Page,
    ) -> Result<(Vec<AuditLogEntry>, u64)> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) AS total FROM audit_logs WHERE TRUE");
        push_audit_filter(&mut count_builder, filter);
        let total: i64 = count_builder
            .build()
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM audit_logs WHERE TRUE");
        push_audit_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(page.limit as i64);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let entries: Result<Vec<AuditLogEntry>> = rows.iter().map(row_to_audit_entry).collect();

        Ok((entries?, total as u64))
    }

    async fn stats(&self, filter: &AuditFilter) -> Result<AuditStats> {
        let mut totals_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE outcome = 'success') AS successes \
             FROM audit_logs WHERE TRUE",
        );
        push_audit_filter(&mut totals_builder, filter);
        let row = totals_builder.build().fetch_one(&self.pool).await?;
        let total: i64 = row.try_get("total")?;
        let successes: i64 = row.try_get("successes")?;

        let top = |column: &str| {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                "SELECT {col} AS key, COUNT(*) AS count FROM audit_logs WHERE {col} <> ''",
                col = column
            ));
            push_audit_filter(&mut builder, filter);
            builder.push(format!(
                " GROUP BY {col} ORDER BY count DESC, key LIMIT 5",
                col = column
            ));
            builder
        };

        let actions = top("action").build().fetch_all(&self.pool).await?;
        let resources = top("resource_type").build().fetch_all(&self.pool).await?;

        let to_buckets = |rows: &[PgRow]| -> Result<Vec<CountedBucket>> {
            rows.iter()
                .map(|row| {
                    Ok(CountedBucket {
                        key: row.try_get("key")?,
                        count: row.try_get::<i64, _>("count")? as u64,
                    })
                })
                .collect()
        };

        Ok(AuditStats {
            total_actions: total as u64,
            success_rate: AuditStats::rate(successes as u64, total as u64),
            top_actions: to_buckets(&actions)?,
            top_resources: to_buckets(&resources)?,
        })
    }
}
