use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use planner_core::models::*;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiResult;
use super::AppState;
use crate::planning::{AutoApprove, PlanOutcome, PlanRequest, PlanUpdateRequest};

#[derive(Debug, Deserialize)]
pub struct GetPlanParams {
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateBody {
    pub task_ids: Vec<i64>,
    pub status: String,
    pub notes: Option<String>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<PlanListQuery>,
) -> ApiResult<Json<PlanPage>> {
    Ok(Json(state.orchestrator.store().list_plans(&query)?))
}

pub async fn create_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<(StatusCode, Json<PlanOutcome>)> {
    let outcome = state.orchestrator.new_plan(request, &AutoApprove).await?;
    let status = match outcome {
        PlanOutcome::Committed { .. } => StatusCode::CREATED,
        PlanOutcome::Cancelled { .. } => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Query(params): Query<GetPlanParams>,
) -> ApiResult<Json<Plan>> {
    let store = state.orchestrator.store();
    let plan = if params.include_deleted {
        store.get_plan_with_deleted(plan_id)?
    } else {
        store.get_plan(plan_id)?
    };
    Ok(Json(plan))
}

pub async fn update_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Json(request): Json<PlanUpdateRequest>,
) -> ApiResult<Json<PlanOutcome>> {
    let outcome = state
        .orchestrator
        .update_plan(plan_id, request, &AutoApprove)
        .await?;
    Ok(Json(outcome))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.orchestrator.store().delete_plan(plan_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_task_status(
    State(state): State<AppState>,
    Path(plan_id): Path<i64>,
    Json(body): Json<StatusUpdateBody>,
) -> ApiResult<Json<Vec<Task>>> {
    let status = TaskStatus::parse(&body.status)?;
    let tasks = state.orchestrator.store().update_task_status(
        plan_id,
        &body.task_ids,
        status,
        body.notes.as_deref(),
    )?;
    Ok(Json(tasks))
}
