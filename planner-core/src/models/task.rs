use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

use super::validate::{check_len, check_optional_len, TASK_DESCRIPTION_MAX, TASK_TITLE_MAX};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    pub plan_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    /// Position within the plan. Dense from zero at creation, never renumbered.
    pub sequence_index: i64,
    pub status: TaskStatus,
    /// Append-only audit trail, one timestamped line per recorded note.
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Soft-deleted tasks stay in the table but take no part in completion.
    pub fn is_live(&self) -> bool {
        self.status != TaskStatus::Deleted
    }

    /// Moves the task to `status`.
    ///
    /// Every transition is allowed. `started_at` is only set the first time the
    /// task enters `in_progress`; `completed_at` is set on entering `completed`
    /// unless already set, and cleared when a task is reopened.
    pub fn apply_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        match status {
            TaskStatus::InProgress => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
                self.completed_at = None;
            }
            TaskStatus::Completed => {
                if self.completed_at.is_none() {
                    self.completed_at = Some(now);
                }
            }
            TaskStatus::Pending => {
                self.completed_at = None;
            }
            TaskStatus::Deleted => {}
        }
        self.status = status;
    }

    pub fn append_note(&mut self, status: TaskStatus, note: &str, now: DateTime<Utc>) {
        let line = format!(
            "[{}] {}: {}",
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
            status.as_str(),
            note.trim()
        );
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, line),
            _ => line,
        });
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Deleted,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s.trim()).ok_or_else(|| {
            let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
            PlannerError::validation(format!(
                "invalid status '{}', expected one of: {}",
                s,
                valid.join(", ")
            ))
        })
    }
}

/// Ordinal task priority, `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Lenient parse for model output: unknown values become `Medium`.
    pub fn from_str_lossy(s: &str) -> Self {
        Self::from_str(s.trim().to_ascii_lowercase().as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl CreateTaskInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: Priority::Medium,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_len("task title", &self.title, TASK_TITLE_MAX)?;
        check_optional_len("task description", self.description.as_deref(), TASK_DESCRIPTION_MAX)
    }
}
