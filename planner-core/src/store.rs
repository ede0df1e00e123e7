//! The store contract the planning workflow is written against.

use crate::db::Database;
use crate::error::Result;
use crate::models::*;

/// Plan/task persistence.
///
/// Every method is a single atomic unit: it either applies completely or
/// leaves the store untouched.
pub trait PlanStore: Send + Sync {
    fn create_plan(&self, input: &CreatePlanInput) -> Result<Plan>;
    fn add_tasks(&self, plan_id: i64, tasks: &[CreateTaskInput]) -> Result<Vec<Task>>;

    /// Creates a plan together with its tasks.
    ///
    /// The default composes `create_plan` and `add_tasks`, deleting the plan
    /// again if the tasks cannot be written. Stores with transactions should
    /// override it with a single atomic write.
    fn create_plan_with_tasks(
        &self,
        input: &CreatePlanInput,
        tasks: &[CreateTaskInput],
    ) -> Result<Plan> {
        let plan = self.create_plan(input)?;
        match self.add_tasks(plan.id, tasks) {
            Ok(_) => self.get_plan(plan.id),
            Err(err) => {
                tracing::warn!(plan_id = plan.id, "Adding tasks failed, removing plan: {}", err);
                if let Err(cleanup) = self.delete_plan(plan.id) {
                    tracing::error!(plan_id = plan.id, "Compensating delete failed: {}", cleanup);
                }
                Err(err)
            }
        }
    }

    fn get_plan(&self, plan_id: i64) -> Result<Plan>;
    /// Like `get_plan`, but soft-deleted tasks are included.
    fn get_plan_with_deleted(&self, plan_id: i64) -> Result<Plan>;
    fn list_plans(&self, query: &PlanListQuery) -> Result<PlanPage>;
    fn update_task_status(
        &self,
        plan_id: i64,
        task_ids: &[i64],
        status: TaskStatus,
        notes: Option<&str>,
    ) -> Result<Vec<Task>>;
    fn update_plan(&self, plan_id: i64, input: &UpdatePlanInput) -> Result<Plan>;
    fn delete_plan(&self, plan_id: i64) -> Result<()>;
}

impl PlanStore for Database {
    fn create_plan(&self, input: &CreatePlanInput) -> Result<Plan> {
        Database::create_plan(self, input)
    }

    fn add_tasks(&self, plan_id: i64, tasks: &[CreateTaskInput]) -> Result<Vec<Task>> {
        Database::add_tasks(self, plan_id, tasks)
    }

    fn create_plan_with_tasks(
        &self,
        input: &CreatePlanInput,
        tasks: &[CreateTaskInput],
    ) -> Result<Plan> {
        Database::create_plan_with_tasks(self, input, tasks)
    }

    fn get_plan(&self, plan_id: i64) -> Result<Plan> {
        Database::get_plan(self, plan_id)
    }

    fn get_plan_with_deleted(&self, plan_id: i64) -> Result<Plan> {
        Database::get_plan_with_deleted(self, plan_id)
    }

    fn list_plans(&self, query: &PlanListQuery) -> Result<PlanPage> {
        Database::list_plans(self, query)
    }

    fn update_task_status(
        &self,
        plan_id: i64,
        task_ids: &[i64],
        status: TaskStatus,
        notes: Option<&str>,
    ) -> Result<Vec<Task>> {
        Database::update_task_status(self, plan_id, task_ids, status, notes)
    }

    fn update_plan(&self, plan_id: i64, input: &UpdatePlanInput) -> Result<Plan> {
        Database::update_plan(self, plan_id, input)
    }

    fn delete_plan(&self, plan_id: i64) -> Result<()> {
        Database::delete_plan(self, plan_id)
    }
}
