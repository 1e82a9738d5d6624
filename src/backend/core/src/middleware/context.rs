//! Request-scoped context.
//!
//! A `RequestContext` is built once per request and threaded explicitly to
//! anything that needs correlation data (primarily the audit recorder).
//! There is no process-global request state: the context lives in the
//! request's extensions and dies with the request.

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Correlation data for one in-flight request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request id (taken from `x-request-id` or freshly generated).
    pub request_id: String,

    /// Client IP as reported by proxy headers.
    pub client_ip: Option<String>,

    /// User agent string.
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Build a context from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let client_ip = headers
            .get("x-forwarded-for")
            .or_else(|| headers.get("x-real-ip"))
            .and_then(|v| v.to_str().ok())
            // x-forwarded-for may carry a chain; the client is first.
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());

        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Self {
            request_id,
            client_ip,
            user_agent,
        }
    }

    /// A context for actions with no originating request (startup tasks,
    /// tests).
    pub fn system() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            client_ip: None,
            user_agent: None,
        }
    }
}

/// Middleware that inserts a `RequestContext` into request extensions and
/// echoes the request id back on the response.
pub async fn propagate_context(mut req: Request, next: Next) -> Response {
    let ctx = RequestContext::from_headers(req.headers());
    let request_id = ctx.request_id.clone();
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).await;

    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Extractor for the request context in handlers.
#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Fall back to rebuilding from headers if the layer was not applied
        // (e.g. in handler-level tests).
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::from_headers(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_from_headers_generates_request_id() {
        let ctx = RequestContext::from_headers(&HeaderMap::new());
        assert!(!ctx.request_id.is_empty());
        assert!(ctx.client_ip.is_none());
    }

    #[test]
    fn test_from_headers_reads_proxy_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-1"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.1, 172.16.0.1"),
        );
        headers.insert("user-agent", HeaderValue::from_static("curl/8"));

        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.request_id, "req-1");
        assert_eq!(ctx.client_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8"));
    }
}
