use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

use super::task::{CreateTaskInput, Task, TaskStatus};
use super::validate::{
    check_len, check_optional_len, PLAN_DESCRIPTION_MAX, PLAN_GOAL_MAX, PLAN_TITLE_MAX,
};

pub const DEFAULT_PAGE_SIZE: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: i64,
    pub title: String,
    pub goal: String,
    pub description: Option<String>,
    pub category: PlanCategory,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Ordered by `sequence_index`.
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlanCategory {
    Project,
    Personal,
    Learning,
    Business,
    Creative,
    Research,
    Maintenance,
}

impl PlanCategory {
    pub const ALL: [PlanCategory; 7] = [
        Self::Project,
        Self::Personal,
        Self::Learning,
        Self::Business,
        Self::Creative,
        Self::Research,
        Self::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Personal => "personal",
            Self::Learning => "learning",
            Self::Business => "business",
            Self::Creative => "creative",
            Self::Research => "research",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "project" => Some(Self::Project),
            "personal" => Some(Self::Personal),
            "learning" => Some(Self::Learning),
            "business" => Some(Self::Business),
            "creative" => Some(Self::Creative),
            "research" => Some(Self::Research),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }

    /// The enumeration is closed: unknown names are a validation error, never a default.
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s.trim()).ok_or_else(|| {
            let valid: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
            PlannerError::validation(format!(
                "invalid category '{}', expected one of: {}",
                s,
                valid.join(", ")
            ))
        })
    }
}

/// Derived plan status. Never written by callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Completed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Completed iff the plan has at least one live task and every live task
    /// is completed. Deleted tasks are ignored.
    pub fn derive<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut live = 0usize;
        let mut completed = 0usize;
        for task in tasks.into_iter().filter(|t| t.is_live()) {
            live += 1;
            if task.status == TaskStatus::Completed {
                completed += 1;
            }
        }
        Self::from_counts(live, completed)
    }

    pub fn from_counts(live: usize, completed: usize) -> Self {
        if live > 0 && completed == live {
            Self::Completed
        } else {
            Self::Active
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanSummary {
    pub id: i64,
    pub title: String,
    pub goal: String,
    pub category: PlanCategory,
    pub status: PlanStatus,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub progress_percent: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PlanSummary {
    pub fn progress(total: u32, completed: u32) -> f64 {
        if total == 0 {
            0.0
        } else {
            f64::from(completed) * 100.0 / f64::from(total)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanInput {
    pub title: String,
    pub goal: String,
    pub category: PlanCategory,
    pub description: Option<String>,
}

impl CreatePlanInput {
    pub fn validate(&self) -> Result<()> {
        check_len("title", &self.title, PLAN_TITLE_MAX)?;
        check_len("goal", &self.goal, PLAN_GOAL_MAX)?;
        check_optional_len("description", self.description.as_deref(), PLAN_DESCRIPTION_MAX)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlanInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub new_tasks: Vec<CreateTaskInput>,
}

impl UpdatePlanInput {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            check_len("title", title, PLAN_TITLE_MAX)?;
        }
        check_optional_len("description", self.description.as_deref(), PLAN_DESCRIPTION_MAX)?;
        self.new_tasks.iter().try_for_each(CreateTaskInput::validate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanListQuery {
    #[serde(default)]
    pub include_completed: bool,
    /// One-based.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PlanListQuery {
    fn default() -> Self {
        Self {
            include_completed: false,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PlanListQuery {
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(PlannerError::validation("page must be a positive integer"));
        }
        if self.page_size == 0 {
            return Err(PlannerError::validation("page_size must be a positive integer"));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPage {
    pub plans: Vec<PlanSummary>,
    /// Count of plans matching the filter, independent of the page requested.
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}
