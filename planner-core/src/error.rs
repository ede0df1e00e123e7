//! Error taxonomy shared by the store and everything built on top of it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// Bad input shape, length or enumeration value. Raised before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A store write or read failed after validation passed.
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid workflow transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

impl PlannerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn plan_not_found(plan_id: i64) -> Self {
        Self::NotFound {
            entity: "plan",
            id: plan_id.to_string(),
        }
    }

    pub fn tasks_not_found(plan_id: i64, task_ids: &[i64]) -> Self {
        let ids = task_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self::NotFound {
            entity: "task",
            id: format!("[{}] in plan {}", ids, plan_id),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
