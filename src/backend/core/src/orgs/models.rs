//! Organization (tenant) entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::rbac::OrganizationId;

/// A tenant boundary. Every user, task, and audit entry belongs to exactly
/// one organization. Organizations may form a tree via `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<OrganizationId>,
    /// Secondary, non-user credential for org-level programmatic access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create a new active organization with a fresh API key.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: OrganizationId::generate(),
            name: name.into(),
            description,
            parent_id: None,
            api_key: Some(generate_api_key()),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach this organization under a parent.
    pub fn with_parent(mut self, parent_id: OrganizationId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Logically deactivate the organization.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

/// Generate an organization API key: `org_` followed by 64 hex characters
/// derived from fresh random material.
pub fn generate_api_key() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    format!("org_{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_format() {
        let key = generate_api_key();
        assert!(key.starts_with("org_"));
        assert_eq!(key.len(), 4 + 64);
        assert!(key[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_api_keys_are_unique() {
        assert_ne!(generate_api_key(), generate_api_key());
    }

    #[test]
    fn test_new_org_is_active_with_key() {
        let org = Organization::new("Acme", Some("desc".into()));
        assert!(org.is_active);
        assert!(org.api_key.is_some());
        assert!(org.parent_id.is_none());
    }

    #[test]
    fn test_with_parent() {
        let parent = Organization::new("Parent", None);
        let child = Organization::new("Child", None).with_parent(parent.id);
        assert_eq!(child.parent_id, Some(parent.id));
    }
}
