//! API layer: router assembly, shared state, and the response envelope.
//!
//! Middleware order per request: CORS → compression → trace → request
//! context → authentication (token → principal) → authorization (route
//! policy table) → handler. Within one request, authentication always
//! completes before authorization, which completes before the resource
//! operation; the audit write happens last, inside the service.

pub mod handlers;
pub mod routes;

use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::audit::AuditRecorder;
use crate::auth::{TokenIssuer, TokenValidator};
use crate::middleware::{context, AuthLayer};
use crate::orgs::OrgService;
use crate::rbac::{PolicyTable, RbacLayer};
use crate::tasks::TaskService;
use crate::users::UserService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub orgs: OrgService,
    pub users: UserService,
    pub tasks: TaskService,
    pub audit: AuditRecorder,
}

/// Build the full application router.
pub fn build_router(state: AppState, validator: Arc<TokenValidator>) -> Router {
    build_router_with_policies(state, validator, PolicyTable::taskhive_defaults())
}

/// Build the router with a custom route policy table.
pub fn build_router_with_policies(
    state: AppState,
    validator: Arc<TokenValidator>,
    policies: PolicyTable,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Unversioned endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        // Resource routes
        .merge(routes::router())
        // Middleware (the last layer added runs first)
        .layer(RbacLayer::new(policies))
        .layer(AuthLayer::new(validator))
        .layer(axum_middleware::from_fn(context::propagate_context))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// API response wrapper.
#[derive(Debug, serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let response: ApiResponse<()> = ApiResponse::error("test error");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error, Some("test error".to_string()));
    }
}
