//! Task domain model.
//!
//! The server is authoritative for every field except `color`, which is a
//! client-side display tag. `total_time_secs` is refreshed from the server
//! after each stopped session rather than accumulated locally.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Display color assigned to tasks the backend has no color for.
pub const DEFAULT_COLOR: &str = "#3B82F6";

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// Task lifecycle status, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Active,
    Completed,
}

/// A user's task, as held in the task store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque server-assigned identifier, unique within a user's task set.
    pub id: String,
    /// Task name.
    pub name: String,
    /// Display tag, not authoritative.
    pub color: String,
    /// Accumulated seconds across closed sessions, server-authoritative.
    pub total_time_secs: u64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
}

/// Fields for creating a task. The server assigns id and totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<TaskPriority>,
}

impl TaskDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Local validation, performed before any remote call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyTaskName);
        }
        Ok(())
    }
}

/// Partial update for an existing task. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    /// Local validation, performed before any remote call.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyTaskName);
            }
        }
        Ok(())
    }
}
