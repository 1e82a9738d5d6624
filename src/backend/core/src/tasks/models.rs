//! Task entity, enums, and the status state machine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rbac::{OrganizationId, Principal, TaskId, UserId};

// ═══════════════════════════════════════════════════════════════════════════════
// Enums
// ═══════════════════════════════════════════════════════════════════════════════

/// Task lifecycle status.
///
/// Legal transitions: `Todo → InProgress → Done`, and `Cancelled` from
/// `Todo` or `InProgress`. `Done` is terminal. Re-asserting the current
/// status is an idempotent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    /// Whether a transition from `self` to `to` is legal.
    pub const fn can_transition(self, to: TaskStatus) -> bool {
        matches!(
            (self, to),
            (TaskStatus::Todo, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Done)
                | (TaskStatus::Todo, TaskStatus::Cancelled)
                | (TaskStatus::InProgress, TaskStatus::Cancelled)
        ) || self as u8 == to as u8
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(Self::Todo),
            "IN_PROGRESS" => Some(Self::InProgress),
            "DONE" => Some(Self::Done),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "URGENT" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Work,
    Personal,
    Home,
}

impl TaskCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Home => "home",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "work" => Some(Self::Work),
            "personal" => Some(Self::Personal),
            "home" => Some(Self::Home),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Task
// ═══════════════════════════════════════════════════════════════════════════════

/// A unit of work.
///
/// `organization_id` and `created_by` are fixed at creation from the
/// authenticated principal and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub organization_id: OrganizationId,
    pub created_by: UserId,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for task creation. Tenant and creator are not part of this type:
/// they always come from the principal, so a client cannot plant a task in a
/// foreign organization by payload.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub priority: TaskPriority,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
}

/// Partial update for a task's editable fields. `None` leaves a field
/// unchanged. Status is excluded: it moves only through the state machine.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<TaskCategory>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
}

impl Task {
    /// Create a task owned by the principal's organization.
    ///
    /// An unassigned task defaults to the creator.
    pub fn create(principal: &Principal, input: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            title: input.title,
            description: input.description,
            category: input.category,
            status: TaskStatus::Todo,
            priority: input.priority,
            organization_id: principal.organization_id,
            created_by: principal.user_id,
            assigned_to: input.assigned_to.or(Some(principal.user_id)),
            due_date: input.due_date,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch to the editable fields.
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = Some(assigned_to);
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
        self.updated_at = Utc::now();
    }

    /// Move the task to a new status through the state machine.
    ///
    /// Returns `Ok(false)` for the idempotent same-status case, `Ok(true)`
    /// when the status actually changed.
    pub fn transition(&mut self, to: TaskStatus) -> Result<bool, crate::error::HiveError> {
        if self.status == to {
            return Ok(false);
        }
        if !self.status.can_transition(to) {
            return Err(crate::error::HiveError::invalid_transition(self.status, to));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Soft-delete the task.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
        self.updated_at = Utc::now();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
