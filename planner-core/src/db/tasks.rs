use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Transaction};

use super::plans::ensure_plan_exists;
use super::rows::{task_from_row, TASK_COLUMNS};
use super::{now, ts, Database};
use crate::error::{PlannerError, Result};
use crate::models::*;

impl Database {
    /// Appends `tasks` after the plan's current last task, preserving their order.
    pub fn add_tasks(&self, plan_id: i64, tasks: &[CreateTaskInput]) -> Result<Vec<Task>> {
        tasks.iter().try_for_each(CreateTaskInput::validate)?;
        let created = self.write("add_tasks", |tx| {
            ensure_plan_exists(tx, plan_id)?;
            let now = now();
            let created = insert_tasks(tx, plan_id, tasks, now)?;
            recompute_completion(tx, plan_id, now)?;
            Ok(created)
        })?;
        tracing::info!("Added {} tasks to plan {}", created.len(), plan_id);
        Ok(created)
    }

    /// Moves every listed task to `status`, or none of them.
    ///
    /// Fails with `NotFound` if the plan is missing or any id does not belong
    /// to it. `notes`, when given, is appended to each task's audit trail.
    pub fn update_task_status(
        &self,
        plan_id: i64,
        task_ids: &[i64],
        status: TaskStatus,
        notes: Option<&str>,
    ) -> Result<Vec<Task>> {
        if task_ids.is_empty() {
            return Err(PlannerError::validation("task_ids must not be empty"));
        }
        check_optional_len("notes", notes, NOTES_MAX)?;
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());

        let mut ids: Vec<i64> = Vec::with_capacity(task_ids.len());
        for id in task_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }

        let updated = self.write("update_task_status", |tx| {
            ensure_plan_exists(tx, plan_id)?;

            let mut tasks = Vec::with_capacity(ids.len());
            let mut missing = Vec::new();
            for id in &ids {
                let task = tx
                    .query_row(
                        &format!("SELECT {} FROM tasks WHERE id = ?1 AND plan_id = ?2", TASK_COLUMNS),
                        params![id, plan_id],
                        task_from_row,
                    )
                    .optional()?;
                match task {
                    Some(task) => tasks.push(task),
                    None => missing.push(*id),
                }
            }
            if !missing.is_empty() {
                return Err(PlannerError::tasks_not_found(plan_id, &missing));
            }

            let now = now();
            for task in &mut tasks {
                task.apply_status(status, now);
                if let Some(note) = notes {
                    task.append_note(status, note, now);
                }
                tx.execute(
                    "UPDATE tasks SET status = ?2, started_at = ?3, completed_at = ?4, notes = ?5 WHERE id = ?1",
                    params![
                        task.id,
                        task.status.as_str(),
                        task.started_at.map(ts),
                        task.completed_at.map(ts),
                        task.notes
                    ],
                )?;
            }
            recompute_completion(tx, plan_id, now)?;
            Ok(tasks)
        })?;

        tracing::info!(
            "Moved {} tasks of plan {} to {}",
            updated.len(),
            plan_id,
            status.as_str()
        );
        Ok(updated)
    }
}

pub(super) fn insert_tasks(
    tx: &Transaction<'_>,
    plan_id: i64,
    tasks: &[CreateTaskInput],
    now: DateTime<Utc>,
) -> Result<Vec<Task>> {
    let next_index: i64 = tx.query_row(
        "SELECT COALESCE(MAX(sequence_index), -1) + 1 FROM tasks WHERE plan_id = ?1",
        params![plan_id],
        |row| row.get(0),
    )?;

    let mut stmt = tx.prepare(
        "INSERT INTO tasks (plan_id, title, description, priority, sequence_index, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
    )?;
    let mut created = Vec::with_capacity(tasks.len());
    for (offset, input) in tasks.iter().enumerate() {
        let sequence_index = next_index + offset as i64;
        stmt.execute(params![
            plan_id,
            input.title.trim(),
            input.description,
            input.priority.as_str(),
            sequence_index,
            ts(now)
        ])?;
        created.push(Task {
            id: tx.last_insert_rowid(),
            plan_id,
            title: input.title.trim().to_string(),
            description: input.description.clone(),
            priority: input.priority,
            sequence_index,
            status: TaskStatus::Pending,
            notes: None,
            created_at: now,
            started_at: None,
            completed_at: None,
        });
    }
    Ok(created)
}

/// Re-derives plan completion and touches `updated_at`.
///
/// `completed_at` keeps its first value while the plan stays completed and is
/// cleared as soon as any live task is reopened or added.
pub(super) fn recompute_completion(
    tx: &Transaction<'_>,
    plan_id: i64,
    now: DateTime<Utc>,
) -> Result<PlanStatus> {
    let (live, done): (i64, i64) = tx.query_row(
        "SELECT COUNT(*), COALESCE(SUM(status = 'completed'), 0)
         FROM tasks WHERE plan_id = ?1 AND status != 'deleted'",
        params![plan_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let status = PlanStatus::from_counts(live as usize, done as usize);

    match status {
        PlanStatus::Completed => tx.execute(
            "UPDATE plans SET completed_at = COALESCE(completed_at, ?2), updated_at = ?2 WHERE id = ?1",
            params![plan_id, ts(now)],
        )?,
        PlanStatus::Active => tx.execute(
            "UPDATE plans SET completed_at = NULL, updated_at = ?2 WHERE id = ?1",
            params![plan_id, ts(now)],
        )?,
    };
    Ok(status)
}
