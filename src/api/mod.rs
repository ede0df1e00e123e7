//! HTTP surface over the plan store and the planning workflow.

mod error;
mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::planning::Orchestrator;

pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = AppState { orchestrator };

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/plans",
            get(handlers::list_plans).post(handlers::create_plan),
        )
        .route(
            "/api/v1/plans/{id}",
            get(handlers::get_plan)
                .patch(handlers::update_plan)
                .delete(handlers::delete_plan),
        )
        .route(
            "/api/v1/plans/{id}/tasks/status",
            post(handlers::update_task_status),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
