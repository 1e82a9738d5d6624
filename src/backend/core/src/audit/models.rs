//! Audit log entry, filters, and aggregate statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::middleware::context::RequestContext;
use crate::rbac::{AuditEntryId, OrganizationId, Principal, UserId};

// ═══════════════════════════════════════════════════════════════════════════════
// Outcome
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of the action an audit entry describes. Failures are recorded
/// with the same shape as successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl AuditOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Entry
// ═══════════════════════════════════════════════════════════════════════════════

/// An immutable record of an authorization-relevant action.
///
/// Entries are append-only: once written they are never mutated. The actor
/// is optional because some actions are system-initiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub actor_id: Option<UserId>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub organization_id: Option<OrganizationId>,
    pub outcome: AuditOutcome,
    pub detail: serde_json::Value,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Builder for audit entries, used at call sites as
/// `AuditEvent::action("task.create").by(&principal).resource("task", id)…`.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    action: String,
    resource_type: String,
    resource_id: Option<String>,
    actor_id: Option<UserId>,
    organization_id: Option<OrganizationId>,
    outcome: AuditOutcome,
    detail: serde_json::Value,
    client_ip: Option<String>,
    user_agent: Option<String>,
    request_id: Option<String>,
}

impl AuditEvent {
    /// Start building an entry for the given action name (e.g.
    /// `"task.create"`).
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource_type: String::new(),
            resource_id: None,
            actor_id: None,
            organization_id: None,
            outcome: AuditOutcome::Success,
            detail: serde_json::Value::Null,
            client_ip: None,
            user_agent: None,
            request_id: None,
        }
    }

    /// Record the acting principal (actor id + organization scope).
    pub fn by(mut self, principal: &Principal) -> Self {
        self.actor_id = Some(principal.user_id);
        self.organization_id = Some(principal.organization_id);
        self
    }

    /// Record the target resource.
    pub fn resource(mut self, resource_type: impl Into<String>, id: impl fmt::Display) -> Self {
        self.resource_type = resource_type.into();
        self.resource_id = Some(id.to_string());
        self
    }

    /// Record a resource type without a concrete id (e.g. failed lookups).
    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    /// Override the organization scope (for actions without a principal).
    pub fn organization(mut self, organization_id: OrganizationId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn failure(self) -> Self {
        self.outcome(AuditOutcome::Failure)
    }

    /// Attach a free-form detail payload. Sensitive fields are redacted.
    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = redact_value(detail);
        self
    }

    /// Attach request metadata (correlation id, client ip, user agent).
    pub fn request(mut self, ctx: &RequestContext) -> Self {
        self.client_ip = ctx.client_ip.clone();
        self.user_agent = ctx.user_agent.clone();
        self.request_id = Some(ctx.request_id.clone());
        self
    }

    /// Finalize into an entry, stamping id and timestamp.
    pub fn build(self) -> AuditLogEntry {
        AuditLogEntry {
            id: AuditEntryId::generate(),
            actor_id: self.actor_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            organization_id: self.organization_id,
            outcome: self.outcome,
            detail: self.detail,
            client_ip: self.client_ip,
            user_agent: self.user_agent,
            request_id: self.request_id,
            created_at: Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Query & Stats
// ═══════════════════════════════════════════════════════════════════════════════

/// Filters for audit queries. All fields are conjunctive; `None` matches
/// everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    pub organization_id: Option<OrganizationId>,
    pub actor_id: Option<UserId>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Whether an entry matches this filter.
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(org) = &self.organization_id {
            if entry.organization_id.as_ref() != Some(org) {
                return false;
            }
        }
        if let Some(actor) = &self.actor_id {
            if entry.actor_id.as_ref() != Some(actor) {
                return false;
            }
        }
        if let Some(action) = &self.action {
            if &entry.action != action {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.created_at > to {
                return false;
            }
        }
        true
    }
}

/// A named bucket in an aggregate (action or resource type with its count).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedBucket {
    pub key: String,
    pub count: u64,
}

/// Aggregate view of the audit trail for compliance dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub total_actions: u64,
    /// successes / total, defined as 0 when total is 0.
    pub success_rate: f64,
    pub top_actions: Vec<CountedBucket>,
    pub top_resources: Vec<CountedBucket>,
}

impl AuditStats {
    pub fn empty() -> Self {
        Self {
            total_actions: 0,
            success_rate: 0.0,
            top_actions: Vec::new(),
            top_resources: Vec::new(),
        }
    }

    /// Compute the success rate without dividing by zero.
    pub fn rate(successes: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            successes as f64 / total as f64
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Redaction
// ═══════════════════════════════════════════════════════════════════════════════

const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "credential",
    "private_key",
    "authorization",
];

/// Whether a field name looks like it carries credentials.
pub fn is_sensitive_field(name: &str) -> bool {
    let lower = name.to_lowercase();
    SENSITIVE_FIELDS.iter().any(|p| lower.contains(p))
}

/// Recursively replace sensitive fields in a JSON value with `"[REDACTED]"`.
pub fn redact_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    if is_sensitive_field(&k) {
                        (k, serde_json::Value::String("[REDACTED]".into()))
                    } else {
                        (k, redact_value(v))
                    }
                })
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(redact_value).collect())
        }
        other => other,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::Role;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let principal = Principal::new(
            UserId::generate(),
            "a@example.com",
            "A",
            OrganizationId::generate(),
            Role::Admin,
        );

        let entry = AuditEvent::action("task.create")
            .by(&principal)
            .resource("task", "t-1")
            .detail(json!({"title": "x"}))
            .build();

        assert_eq!(entry.action, "task.create");
        assert_eq!(entry.actor_id, Some(principal.user_id));
        assert_eq!(entry.organization_id, Some(principal.organization_id));
        assert_eq!(entry.outcome, AuditOutcome::Success);
        assert_eq!(entry.resource_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn test_failure_same_shape_as_success() {
        let entry = AuditEvent::action("auth.login")
            .resource_type("user")
            .failure()
            .detail(json!({"reason": "bad password"}))
            .build();

        assert_eq!(entry.outcome, AuditOutcome::Failure);
        assert!(entry.actor_id.is_none());
        // Same struct, so audit queries need no special-casing.
        let _json = serde_json::to_value(&entry).unwrap();
    }

    #[test]
    fn test_redaction() {
        let detail = redact_value(json!({
            "email": "a@example.com",
            "password": "hunter2",
            "nested": {"api_key": "org_abc", "ok": 1},
        }));

        assert_eq!(detail["email"], "a@example.com");
        assert_eq!(detail["password"], "[REDACTED]");
        assert_eq!(detail["nested"]["api_key"], "[REDACTED]");
        assert_eq!(detail["nested"]["ok"], 1);
    }

    #[test]
    fn test_filter_matching() {
        let org = OrganizationId::generate();
        let entry = AuditEvent::action("task.delete")
            .organization(org)
            .resource("task", "t")
            .build();

        let mut filter = AuditFilter::default();
        assert!(filter.matches(&entry));

        filter.organization_id = Some(org);
        filter.action = Some("task.delete".into());
        assert!(filter.matches(&entry));

        filter.action = Some("task.create".into());
        assert!(!filter.matches(&entry));
    }

    #[test]
    fn test_success_rate_zero_safe() {
        assert_eq!(AuditStats::rate(0, 0), 0.0);
        assert_eq!(AuditStats::rate(1, 2), 0.5);
        assert_eq!(AuditStats::empty().success_rate, 0.0);
    }
}
