//! In-memory store.
//!
//! Implements every repository trait over `HashMap`s behind `RwLock`s.
//! Used by the test suites and for running the server without PostgreSQL.
//! Unique constraints (user email, organization name) are enforced to match
//! the SQL schema.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::audit::models::{AuditFilter, AuditLogEntry, AuditStats, CountedBucket};
use crate::audit::AuditOutcome;
use crate::error::{HiveError, Result};
use crate::orgs::models::Organization;
use crate::pagination::Page;
use crate::rbac::{OrganizationId, TaskId, UserId};
use crate::repository::{AuditStore, OrganizationStore, TaskQuery, TaskStore, UserStore};
use crate::tasks::models::Task;
use crate::users::models::User;

/// A process-local implementation of all repository traits.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    organizations: RwLock<HashMap<Uuid, Organization>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
    audit: RwLock<Vec<AuditLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of audit entries currently stored (test helper).
    pub fn audit_len(&self) -> usize {
        self.audit.read().len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == user.email) {
            return Err(HiveError::duplicate(format!(
                "email already registered: {}",
                user.email
            )));
        }
        users.insert(user.id.as_uuid(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.users.read().get(&id.as_uuid()).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_by_organization(&self, organization_id: &OrganizationId) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|u| &u.organization_id == organization_id && u.is_active)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.write();
        if !users.contains_key(&user.id.as_uuid()) {
            return Err(HiveError::not_found("user", user.id.to_string()));
        }
        users.insert(user.id.as_uuid(), user.clone());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Organizations
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn insert(&self, organization: &Organization) -> Result<()> {
        let mut orgs = self.organizations.write();
        if orgs.values().any(|o| o.name == organization.name) {
            return Err(HiveError::duplicate(format!(
                "organization name already taken: {}",
                organization.name
            )));
        }
        orgs.insert(organization.id.as_uuid(), organization.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>> {
        Ok(self.organizations.read().get(&id.as_uuid()).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Organization>> {
        Ok(self
            .organizations
            .read()
            .values()
            .find(|o| o.name == name)
            .cloned())
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Organization>> {
        Ok(self
            .organizations
            .read()
            .values()
            .find(|o| o.api_key.as_deref() == Some(api_key))
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<Organization>> {
        let mut orgs: Vec<Organization> = self
            .organizations
            .read()
            .values()
            .filter(|o| o.is_active)
            .cloned()
            .collect();
        orgs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orgs)
    }

    async fn list_children(&self, parent_id: &OrganizationId) -> Result<Vec<Organization>> {
        let mut children: Vec<Organization> = self
            .organizations
            .read()
            .values()
            .filter(|o| o.parent_id.as_ref() == Some(parent_id) && o.is_active)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(children)
    }

    async fn update(&self, organization: &Organization) -> Result<()> {
        let mut orgs = self.organizations.write();
        if !orgs.contains_key(&organization.id.as_uuid()) {
            return Err(HiveError::not_found(
                "organization",
                organization.id.to_string(),
            ));
        }
        orgs.insert(organization.id.as_uuid(), organization.clone());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════════

fn task_matches(task: &Task, query: &TaskQuery) -> bool {
    if !query.include_deleted && task.is_deleted {
        return false;
    }
    if let Some(org) = &query.organization_id {
        if &task.organization_id != org {
            return false;
        }
    }
    if let Some(user) = &query.involving_user {
        let involved = &task.created_by == user || task.assigned_to.as_ref() == Some(user);
        if !involved {
            return false;
        }
    }
    true
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert(&self, task: &Task) -> Result<()> {
        self.tasks.write().insert(task.id.as_uuid(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>> {
        Ok(self.tasks.read().get(&id.as_uuid()).cloned())
    }

    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .values()
            .filter(|t| task_matches(t, query))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn update(&self, task: &Task) -> Result<()> {
        let mut tasks = self.tasks.write();
        if !tasks.contains_key(&task.id.as_uuid()) {
            return Err(HiveError::not_found("task", task.id.to_string()));
        }
        tasks.insert(task.id.as_uuid(), task.clone());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Audit
// ═══════════════════════════════════════════════════════════════════════════════

fn top_buckets<'a, I: Iterator<Item = &'a str>>(keys: I, limit: usize) -> Vec<CountedBucket> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for key in keys {
        if key.is_empty() {
            continue;
        }
        *counts.entry(key).or_default() += 1;
    }

    let mut buckets: Vec<CountedBucket> = counts
        .into_iter()
        .map(|(key, count)| CountedBucket {
            key: key.to_string(),
            count,
        })
        .collect();
    // Deterministic: by count descending, then key.
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    buckets.truncate(limit);
    buckets
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<()> {
        self.audit.write().push(entry.clone());
        Ok(())
    }

    async fn query(
        &self,
        filter: &AuditFilter,
        page: &Page,
    ) -> Result<(Vec<AuditLogEntry>, u64)> {
        let mut matching: Vec<AuditLogEntry> = self
            .audit
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        Ok((page.slice(&matching), total))
    }

    async fn stats(&self, filter: &AuditFilter) -> Result<AuditStats> {
        let audit = self.audit.read();
        let matching: Vec<&AuditLogEntry> =
            audit.iter().filter(|e| filter.matches(e)).collect();

        let total = matching.len() as u64;
        let successes = matching
            .iter()
            .filter(|e| e.outcome == AuditOutcome::Success)
            .count() as u64;

        Ok(AuditStats {
            total_actions: total,
            success_rate: AuditStats::rate(successes, total),
            top_actions: top_buckets(matching.iter().map(|e| e.action.as_str()), 5),
            top_resources: top_buckets(matching.iter().map(|e| e.resource_type.as_str()), 5),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEvent;
    use crate::rbac::Role;

    #[tokio::test]
    async fn test_user_email_unique() {
        let store = MemoryStore::new();
        let org = OrganizationId::generate();

        let a = User::new("dup@example.com", "A", "h", org, Role::Viewer);
        let b = User::new("dup@example.com", "B", "h", org, Role::Viewer);

        UserStore::insert(&store, &a).await.unwrap();
        let err = UserStore::insert(&store, &b).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::DuplicateRecord);
    }

    #[tokio::test]
    async fn test_org_name_unique() {
        let store = MemoryStore::new();
        OrganizationStore::insert(&store, &Organization::new("Acme", None))
            .await
            .unwrap();
        let err = OrganizationStore::insert(&store, &Organization::new("Acme", None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::DuplicateRecord);
    }

    #[tokio::test]
    async fn test_children_are_direct_only() {
        let store = MemoryStore::new();
        let root = Organization::new("root", None);
        let child = Organization::new("child", None).with_parent(root.id);
        let grandchild = Organization::new("grandchild", None).with_parent(child.id);

        for org in [&root, &child, &grandchild] {
            OrganizationStore::insert(&store, org).await.unwrap();
        }

        let children = store.list_children(&root.id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, child.id);
    }

    #[tokio::test]
    async fn test_audit_query_newest_first() {
        let store = MemoryStore::new();
        for i in 0..3 {
            let entry = AuditEvent::action(format!("a.{}", i)).build();
            store.append(&entry).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let (entries, total) = store
            .query(&AuditFilter::default(), &Page::new(10, 0))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(entries[0].action, "a.2");
        assert_eq!(entries[2].action, "a.0");
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let store = MemoryStore::new();
        let stats = store.stats(&AuditFilter::default()).await.unwrap();
        assert_eq!(stats.total_actions, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert!(stats.top_actions.is_empty());
    }
}
