//! Route definitions.
//!
//! Authorization requirements for these routes live in the policy table
//! ([`crate::rbac::PolicyTable::taskhive_defaults`]), not here: a route
//! carries its handler, the table carries its guard.

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::{handlers, AppState};

/// Build the resource router.
///
/// # Endpoints
///
/// ## Auth
/// - `POST /auth/login` - Authenticate and mint a token
/// - `POST /auth/register` - Register into an existing organization
///
/// ## Organizations
/// - `POST /organizations` - Create (Admin+)
/// - `GET /organizations` - All for admins, own org otherwise
/// - `GET /organizations/lookup/:api_key` - Resolve by API key (programmatic)
/// - `GET|PATCH|DELETE /organizations/:id` - Tenant-gated
/// - `GET /organizations/:id/users`, `/organizations/:id/children`
///
/// ## Users
/// - `GET|PATCH /users/:id`, `POST /users/:id/deactivate`
///
/// ## Tasks
/// - `POST|GET /tasks`, `GET /tasks/mine`
/// - `GET|PATCH|DELETE /tasks/:id`, `PATCH /tasks/:id/status`
///
/// ## Audit
/// - `GET /audit-log`, `GET /audit-log/stats` (Admin+)
pub fn router() -> Router<AppState> {
    Router::new()
        // Auth endpoints
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        // Organization endpoints
        .route(
            "/organizations",
            post(handlers::create_organization).get(handlers::list_organizations),
        )
        .route(
            "/organizations/lookup/:api_key",
            get(handlers::organization_by_api_key),
        )
        .route(
            "/organizations/:id",
            get(handlers::get_organization)
                .patch(handlers::update_organization)
                .delete(handlers::delete_organization),
        )
        .route("/organizations/:id/users", get(handlers::organization_users))
        .route(
            "/organizations/:id/children",
            get(handlers::organization_children),
        )
        // User endpoints
        .route(
            "/users/:id",
            get(handlers::get_user).patch(handlers::update_user),
        )
        .route("/users/:id/deactivate", post(handlers::deactivate_user))
        // Task endpoints
        .route("/tasks", post(handlers::create_task).get(handlers::list_tasks))
        .route("/tasks/mine", get(handlers::my_tasks))
        .route(
            "/tasks/:id",
            get(handlers::get_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/tasks/:id/status", patch(handlers::update_task_status))
        // Audit endpoints
        .route("/audit-log", get(handlers::audit_log))
        .route("/audit-log/stats", get(handlers::audit_stats))
}
