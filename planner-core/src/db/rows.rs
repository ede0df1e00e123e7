use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::models::*;

pub(super) const PLAN_COLUMNS: &str =
    "id, title, goal, description, category, created_at, updated_at, completed_at";

pub(super) const TASK_COLUMNS: &str = "id, plan_id, title, description, priority, sequence_index, status, notes, created_at, started_at, completed_at";

/// Maps a plans row. Tasks are loaded separately; status follows `completed_at`.
pub(super) fn plan_from_row(row: &Row<'_>) -> rusqlite::Result<Plan> {
    let completed_at = opt_ts_col(row, 7)?;
    Ok(Plan {
        id: row.get(0)?,
        title: row.get(1)?,
        goal: row.get(2)?,
        description: row.get(3)?,
        category: enum_col(row, 4, PlanCategory::from_str)?,
        status: if completed_at.is_some() {
            PlanStatus::Completed
        } else {
            PlanStatus::Active
        },
        created_at: ts_col(row, 5)?,
        updated_at: ts_col(row, 6)?,
        completed_at,
        tasks: Vec::new(),
    })
}

pub(super) fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        plan_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: enum_col(row, 4, Priority::from_str)?,
        sequence_index: row.get(5)?,
        status: enum_col(row, 6, TaskStatus::from_str)?,
        notes: row.get(7)?,
        created_at: ts_col(row, 8)?,
        started_at: opt_ts_col(row, 9)?,
        completed_at: opt_ts_col(row, 10)?,
    })
}

pub(super) fn enum_col<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected value '{}'", raw).into(),
        )
    })
}

pub(super) fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

pub(super) fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
