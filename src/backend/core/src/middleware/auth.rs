//! Authentication middleware.
//!
//! Extracts the bearer token, runs it through the [`TokenValidator`], and
//! injects the reconstructed [`Principal`] into request extensions for
//! handlers and the authorization middleware downstream. Public paths pass
//! through without a principal.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use metrics::counter;
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};

use crate::auth::{AuthError, TokenValidator};
use crate::rbac::Principal;

// ═══════════════════════════════════════════════════════════════════════════════
// Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication layer for Tower.
#[derive(Clone)]
pub struct AuthLayer {
    validator: Arc<TokenValidator>,
    public_paths: Arc<Vec<String>>,
}

impl AuthLayer {
    /// Create an auth layer with the default public paths.
    pub fn new(validator: Arc<TokenValidator>) -> Self {
        Self {
            validator,
            public_paths: Arc::new(vec![
                "/health".to_string(),
                "/metrics".to_string(),
                "/auth/login".to_string(),
                "/auth/register".to_string(),
                "/organizations/lookup/*".to_string(),
            ]),
        }
    }

    /// Override the public path list. A trailing `*` makes an entry a
    /// prefix match.
    pub fn with_public_paths(mut self, paths: Vec<String>) -> Self {
        self.public_paths = Arc::new(paths);
        self
    }

    fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| {
            if let Some(prefix) = p.strip_suffix('*') {
                path.starts_with(prefix)
            } else {
                path == p
            }
        })
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            layer: self.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication service.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    layer: AuthLayer,
}

/// Extract the bearer token from the Authorization header.
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| {
            s.strip_prefix("Bearer ")
                .or_else(|| s.strip_prefix("bearer "))
                .map(|t| t.to_string())
        })
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let layer = self.layer.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = request.uri().path();

            if layer.is_public_path(path) {
                return inner.call(request).await;
            }

            let token = match extract_bearer(request.headers()) {
                Some(token) => token,
                None => return Ok(AuthError::MissingCredentials.into_response()),
            };

            match layer.validator.authenticate(&token).await {
                Ok(principal) => {
                    counter!("taskhive_auth_success_total").increment(1);
                    request.extensions_mut().insert(principal);
                    inner.call(request).await
                }
                Err(e) => Ok(e.into_response()),
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Extractor
// ═══════════════════════════════════════════════════════════════════════════════

/// Extractor for the authenticated principal in handlers.
///
/// Rejects with 401 when no principal was injected (no/invalid token).
#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(extract_bearer(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert!(extract_bearer(&headers).is_none());
    }

    #[test]
    fn test_public_path_matching() {
        let validator_free_layer = |paths: Vec<&str>| AuthLayer {
            validator: test_validator(),
            public_paths: Arc::new(paths.into_iter().map(String::from).collect()),
        };

        let layer = validator_free_layer(vec!["/health", "/organizations/lookup/*"]);
        assert!(layer.is_public_path("/health"));
        assert!(layer.is_public_path("/organizations/lookup/org_abc"));
        assert!(!layer.is_public_path("/tasks"));
        assert!(!layer.is_public_path("/healthz"));
    }

    fn test_validator() -> Arc<TokenValidator> {
        use crate::auth::KeyMaterial;
        use crate::db::memory::MemoryStore;

        let store = Arc::new(MemoryStore::new());
        Arc::new(TokenValidator::new(
            Arc::new(KeyMaterial::hs256("test")),
            store,
        ))
    }
}
