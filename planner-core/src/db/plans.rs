use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use super::rows::{
    enum_col, opt_ts_col, plan_from_row, task_from_row, ts_col, PLAN_COLUMNS, TASK_COLUMNS,
};
use super::tasks::{insert_tasks, recompute_completion};
use super::{now, ts, Database};
use crate::error::{PlannerError, Result};
use crate::models::*;

/// Live/completed task counts per plan, shared by the listing and count queries
/// so the `include_completed` filter always agrees with the derived status.
const SUMMARY_CTE: &str = r#"
WITH summary AS (
    SELECT p.id, p.title, p.goal, p.category, p.created_at, p.updated_at, p.completed_at,
        (SELECT COUNT(*) FROM tasks t WHERE t.plan_id = p.id AND t.status != 'deleted') AS live_tasks,
        (SELECT COUNT(*) FROM tasks t WHERE t.plan_id = p.id AND t.status = 'completed') AS done_tasks
    FROM plans p
)
"#;

const INCOMPLETE_FILTER: &str = "(?1 OR NOT (live_tasks > 0 AND done_tasks = live_tasks))";

impl Database {
    pub fn create_plan(&self, input: &CreatePlanInput) -> Result<Plan> {
        input.validate()?;
        let plan = self.write("create_plan", |tx| {
            let now = now();
            let id = insert_plan(tx, input, now)?;
            Ok(Plan {
                id,
                title: input.title.trim().to_string(),
                goal: input.goal.trim().to_string(),
                description: input.description.clone(),
                category: input.category,
                status: PlanStatus::Active,
                created_at: now,
                updated_at: now,
                completed_at: None,
                tasks: Vec::new(),
            })
        })?;
        tracing::info!("Created plan {} '{}'", plan.id, plan.title);
        Ok(plan)
    }

    /// Creates the plan and its tasks in one transaction, so no reader ever
    /// sees the plan without them.
    pub fn create_plan_with_tasks(
        &self,
        input: &CreatePlanInput,
        tasks: &[CreateTaskInput],
    ) -> Result<Plan> {
        input.validate()?;
        tasks.iter().try_for_each(CreateTaskInput::validate)?;
        let plan = self.write("create_plan_with_tasks", |tx| {
            let now = now();
            let id = insert_plan(tx, input, now)?;
            insert_tasks(tx, id, tasks, now)?;
            recompute_completion(tx, id, now)?;
            load_plan(tx, id, false)
        })?;
        tracing::info!(
            "Created plan {} '{}' with {} tasks",
            plan.id,
            plan.title,
            plan.tasks.len()
        );
        Ok(plan)
    }

    /// Plan with its live tasks in sequence order.
    pub fn get_plan(&self, plan_id: i64) -> Result<Plan> {
        self.read(|conn| load_plan(conn, plan_id, false))
    }

    /// Plan with every task, soft-deleted ones included.
    pub fn get_plan_with_deleted(&self, plan_id: i64) -> Result<Plan> {
        self.read(|conn| load_plan(conn, plan_id, true))
    }

    /// Newest plans first. A page past the end is empty, not an error.
    pub fn list_plans(&self, query: &PlanListQuery) -> Result<PlanPage> {
        query.validate()?;
        self.read(|conn| {
            let total_count: i64 = conn.query_row(
                &format!("{} SELECT COUNT(*) FROM summary WHERE {}", SUMMARY_CTE, INCOMPLETE_FILTER),
                params![query.include_completed],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "{} SELECT id, title, goal, category, created_at, updated_at, completed_at, live_tasks, done_tasks
                 FROM summary WHERE {}
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2 OFFSET ?3",
                SUMMARY_CTE, INCOMPLETE_FILTER
            ))?;
            let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);
            let plans = stmt
                .query_map(
                    params![query.include_completed, i64::from(query.page_size), offset],
                    |row| {
                        let live: u32 = row.get(7)?;
                        let done: u32 = row.get(8)?;
                        Ok(PlanSummary {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            goal: row.get(2)?,
                            category: enum_col(row, 3, PlanCategory::from_str)?,
                            status: PlanStatus::from_counts(live as usize, done as usize),
                            total_tasks: live,
                            completed_tasks: done,
                            progress_percent: PlanSummary::progress(live, done),
                            created_at: ts_col(row, 4)?,
                            updated_at: ts_col(row, 5)?,
                            completed_at: opt_ts_col(row, 6)?,
                        })
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let total_count = u64::try_from(total_count).unwrap_or_default();
            Ok(PlanPage {
                plans,
                total_count,
                page: query.page,
                page_size: query.page_size,
                total_pages: total_count.div_ceil(u64::from(query.page_size)),
            })
        })
    }

    /// Replaces title/description when given and appends `new_tasks`, all in one transaction.
    pub fn update_plan(&self, plan_id: i64, input: &UpdatePlanInput) -> Result<Plan> {
        input.validate()?;
        self.write("update_plan", |tx| {
            ensure_plan_exists(tx, plan_id)?;
            let now = now();
            if let Some(title) = &input.title {
                tx.execute(
                    "UPDATE plans SET title = ?2 WHERE id = ?1",
                    params![plan_id, title.trim()],
                )?;
            }
            if let Some(description) = &input.description {
                tx.execute(
                    "UPDATE plans SET description = ?2 WHERE id = ?1",
                    params![plan_id, description],
                )?;
            }
            if !input.new_tasks.is_empty() {
                insert_tasks(tx, plan_id, &input.new_tasks, now)?;
            }
            recompute_completion(tx, plan_id, now)?;
            load_plan(tx, plan_id, false)
        })
    }

    /// Hard delete. The plan and every task it owns are removed.
    pub fn delete_plan(&self, plan_id: i64) -> Result<()> {
        self.write("delete_plan", |tx| {
            tx.execute("DELETE FROM tasks WHERE plan_id = ?1", params![plan_id])?;
            let removed = tx.execute("DELETE FROM plans WHERE id = ?1", params![plan_id])?;
            if removed == 0 {
                return Err(PlannerError::plan_not_found(plan_id));
            }
            Ok(())
        })?;
        tracing::info!("Deleted plan {}", plan_id);
        Ok(())
    }
}

fn insert_plan(tx: &Transaction<'_>, input: &CreatePlanInput, now: DateTime<Utc>) -> Result<i64> {
    tx.execute(
        "INSERT INTO plans (title, goal, description, category, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            input.title.trim(),
            input.goal.trim(),
            input.description,
            input.category.as_str(),
            ts(now)
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

pub(super) fn ensure_plan_exists(tx: &Transaction<'_>, plan_id: i64) -> Result<()> {
    let found: Option<i64> = tx
        .query_row("SELECT id FROM plans WHERE id = ?1", params![plan_id], |row| row.get(0))
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| PlannerError::plan_not_found(plan_id))
}

pub(super) fn load_plan(conn: &Connection, plan_id: i64, include_deleted: bool) -> Result<Plan> {
    let mut plan = conn
        .query_row(
            &format!("SELECT {} FROM plans WHERE id = ?1", PLAN_COLUMNS),
            params![plan_id],
            plan_from_row,
        )
        .optional()?
        .ok_or_else(|| PlannerError::plan_not_found(plan_id))?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tasks WHERE plan_id = ?1 AND (?2 OR status != 'deleted') ORDER BY sequence_index",
        TASK_COLUMNS
    ))?;
    plan.tasks = stmt
        .query_map(params![plan_id, include_deleted], task_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(plan)
}
