//! Request handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{ApiResponse, AppState};
use crate::audit::{AuditEvent, AuditFilter};
use crate::auth::{AuthError, RegisterRequest};
use crate::error::HiveError;
use crate::middleware::context::RequestContext;
use crate::orgs::{NewOrganization, OrganizationPatch};
use crate::pagination::{Page, Paginated};
use crate::rbac::{OrganizationId, Principal, TaskId, UserId};
use crate::tasks::{NewTask, TaskCategory, TaskPatch, TaskPriority, TaskStatus};
use crate::users::{UserPatch, UserView};

// ═══════════════════════════════════════════════════════════════════════════════
// System Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339()
    }))
}

pub async fn prometheus_metrics() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Auth Handlers
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login/registration response: token plus the safe user projection.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user: UserView,
}

pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    match state.issuer.login(&request.email, &request.password).await {
        Ok(session) => {
            state
                .audit
                .record(
                    AuditEvent::action("auth.login")
                        .by(&session.principal())
                        .resource("user", session.user.id)
                        .request(&ctx),
                )
                .await;

            Ok(Json(ApiResponse::success(SessionResponse {
                token: session.token,
                user: UserView::from(&session.user),
            })))
        }
        Err(e) => {
            // The audit trail keeps the specific cause; the response stays
            // generic.
            state
                .audit
                .record(
                    AuditEvent::action("auth.login")
                        .resource_type("user")
                        .request(&ctx)
                        .failure()
                        .detail(json!({ "email": request.email, "reason": e.code() })),
                )
                .await;
            Err(e)
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let email = request.email.clone();
    let organization_id = request.organization_id;

    match state.issuer.register(request).await {
        Ok(session) => {
            state
                .audit
                .record(
                    AuditEvent::action("auth.register")
                        .by(&session.principal())
                        .resource("user", session.user.id)
                        .request(&ctx),
                )
                .await;

            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::success(SessionResponse {
                    token: session.token,
                    user: UserView::from(&session.user),
                })),
            ))
        }
        Err(e) => {
            state
                .audit
                .record(
                    AuditEvent::action("auth.register")
                        .resource_type("user")
                        .organization(organization_id)
                        .request(&ctx)
                        .failure()
                        .detail(json!({ "email": email, "reason": e.code() })),
                )
                .await;
            Err(e)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Organization Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn create_organization(
    State(state): State<AppState>,
    principal: Principal,
    ctx: RequestContext,
    Json(request): Json<NewOrganization>,
) -> Result<impl IntoResponse, HiveError> {
    let organization = state.orgs.create(&principal, &ctx, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(organization)),
    ))
}

pub async fn list_organizations(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, HiveError> {
    let organizations = state.orgs.list(&principal).await?;
    Ok(Json(ApiResponse::success(organizations)))
}

pub async fn get_organization(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<OrganizationId>,
) -> Result<impl IntoResponse, HiveError> {
    let organization = state.orgs.get(&principal, &id).await?;
    Ok(Json(ApiResponse::success(organization)))
}

pub async fn update_organization(
    State(state): State<AppState>,
    principal: Principal,
    ctx: RequestContext,
    Path(id): Path<OrganizationId>,
    Json(patch): Json<OrganizationPatch>,
) -> Result<impl IntoResponse, HiveError> {
    let organization = state.orgs.update(&principal, &ctx, &id, patch).await?;
    Ok(Json(ApiResponse::success(organization)))
}

pub async fn delete_organization(
    State(state): State<AppState>,
    principal: Principal,
    ctx: RequestContext,
    Path(id): Path<OrganizationId>,
) -> Result<impl IntoResponse, HiveError> {
    state.orgs.deactivate(&principal, &ctx, &id).await?;
    Ok(Json(ApiResponse::success(json!({ "deactivated": true }))))
}

pub async fn organization_users(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<OrganizationId>,
) -> Result<impl IntoResponse, HiveError> {
    let users = state.orgs.users_in(&principal, &id).await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn organization_children(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<OrganizationId>,
) -> Result<impl IntoResponse, HiveError> {
    let children = state.orgs.children(&principal, &id).await?;
    Ok(Json(ApiResponse::success(children)))
}

/// Org-level programmatic access: resolve an organization by API key.
pub async fn organization_by_api_key(
    State(state): State<AppState>,
    Path(api_key): Path<String>,
) -> Result<impl IntoResponse, HiveError> {
    let organization = state.orgs.find_by_api_key(&api_key).await?;
    Ok(Json(ApiResponse::success(organization)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// User Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, HiveError> {
    let user = state.users.get(&principal, &id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    ctx: RequestContext,
    Path(id): Path<UserId>,
    Json(patch): Json<UserPatch>,
) -> Result<impl IntoResponse, HiveError> {
    let user = state.users.update(&principal, &ctx, &id, patch).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    principal: Principal,
    ctx: RequestContext,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, HiveError> {
    let user = state.users.deactivate(&principal, &ctx, &id).await?;
    Ok(Json(ApiResponse::success(user)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Task Handlers
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,

    // Accepted but ignored: tenant and creator always come from the
    // authenticated principal, so a payload cannot plant a task in a
    // foreign organization.
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub created_by: Option<UserId>,
}

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<TaskCategory>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    /// Honored for administrative callers only; everyone else is pinned to
    /// their own organization.
    pub organization_id: Option<OrganizationId>,
    pub user: Option<UserId>,
}

pub async fn create_task(
    State(state): State<AppState>,
    principal: Principal,
    ctx: RequestContext,
    Json(request): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, HiveError> {
    let input = NewTask {
        title: request.title,
        description: request.description,
        category: request.category,
        priority: request.priority,
        assigned_to: request.assigned_to,
        due_date: request.due_date,
    };

    let task = state.tasks.create(&principal, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(task))))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<TaskListParams>,
) -> Result<impl IntoResponse, HiveError> {
    let tasks = state
        .tasks
        .list(&principal, params.organization_id, params.user)
        .await?;
    Ok(Json(ApiResponse::success(tasks)))
}

pub async fn my_tasks(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, HiveError> {
    let tasks = state.tasks.list_mine(&principal).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

pub async fn get_task(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<TaskId>,
) -> Result<impl IntoResponse, HiveError> {
    let task = state.tasks.get(&principal, &id).await?;
    Ok(Json(ApiResponse::success(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    principal: Principal,
    ctx: RequestContext,
    Path(id): Path<TaskId>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, HiveError> {
    let patch = TaskPatch {
        title: request.title,
        description: request.description,
        category: request.category,
        priority: request.priority,
        assigned_to: request.assigned_to,
        due_date: request.due_date,
    };

    let task = state.tasks.update(&principal, &ctx, &id, patch).await?;
    Ok(Json(ApiResponse::success(task)))
}

pub async fn update_task_status(
    State(state): State<AppState>,
    principal: Principal,
    ctx: RequestContext,
    Path(id): Path<TaskId>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, HiveError> {
    let task = state
        .tasks
        .update_status(&principal, &ctx, &id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    principal: Principal,
    ctx: RequestContext,
    Path(id): Path<TaskId>,
) -> Result<impl IntoResponse, HiveError> {
    state.tasks.delete(&principal, &ctx, &id).await?;
    Ok(Json(ApiResponse::success(json!({ "deleted": true }))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Audit Handlers
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub organization_id: Option<OrganizationId>,
    pub actor_id: Option<UserId>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditLogParams {
    fn filter(&self) -> AuditFilter {
        AuditFilter {
            organization_id: self.organization_id,
            actor_id: self.actor_id,
            action: self.action.clone(),
            from: self.from,
            to: self.to,
        }
    }
}

pub async fn audit_log(
    State(state): State<AppState>,
    _principal: Principal,
    Query(params): Query<AuditLogParams>,
) -> Result<impl IntoResponse, HiveError> {
    let page = Page::from_params(params.limit, params.offset);
    let (entries, total) = state.audit.query(&params.filter(), &page).await?;

    Ok(Json(ApiResponse::success(Paginated::new(
        entries, &page, total,
    ))))
}

pub async fn audit_stats(
    State(state): State<AppState>,
    _principal: Principal,
    Query(params): Query<AuditLogParams>,
) -> Result<impl IntoResponse, HiveError> {
    let stats = state.audit.stats(&params.filter()).await?;
    Ok(Json(ApiResponse::success(stats)))
}
