//! Input limits shared by the store and the transports.

use crate::error::{PlannerError, Result};

pub const PLAN_TITLE_MAX: usize = 200;
pub const PLAN_GOAL_MAX: usize = 500;
pub const PLAN_DESCRIPTION_MAX: usize = 1000;
pub const ADDITIONAL_CONTEXT_MAX: usize = 2000;
pub const TASK_TITLE_MAX: usize = 200;
pub const TASK_DESCRIPTION_MAX: usize = 1000;
pub const NOTES_MAX: usize = 500;

/// Required, non-blank, at most `max` characters.
pub fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PlannerError::validation(format!("{} must not be empty", field)));
    }
    check_optional_len(field, Some(value), max)
}

pub fn check_optional_len(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(PlannerError::validation(format!(
            "{} exceeds {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}
