mod channel;
mod sampling;

use std::sync::Arc;

use planner_core::models::*;
use planner_core::PlannerError;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ClientCapabilities, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    schemars::JsonSchema,
    ErrorData as McpError, Peer, RoleServer, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::planning::{
    AutoApprove, LlmTaskGenerator, Orchestrator, PlanRequest, PlanUpdateRequest, UserChannel,
};

pub use channel::{
    supports_elicitation, supports_sampling, ClarificationReply, McpChannel, PreviewReview,
};
pub use sampling::SamplingClient;

#[derive(Clone)]
pub struct McpServer {
    orchestrator: Arc<Orchestrator>,
    /// Token limit for client-sampled generations; `None` keeps the server's own backend.
    sampling_max_tokens: Option<u32>,
    tool_router: ToolRouter<Self>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NewPlanRequest {
    #[schemars(description = "Short plan title (max 200 characters)")]
    pub title: String,
    #[schemars(description = "What the plan should achieve (max 500 characters)")]
    pub goal: String,
    #[schemars(
        description = "One of: project, personal, learning, business, creative, research, maintenance"
    )]
    pub category: String,
    #[schemars(description = "Longer description of the plan")]
    pub description: Option<String>,
    #[schemars(description = "Extra context to guide task generation")]
    pub additional_context: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPlansRequest {
    #[schemars(description = "Include plans whose tasks are all completed")]
    #[serde(default)]
    pub include_completed: bool,
    #[schemars(description = "1-based page number")]
    pub page: Option<u32>,
    #[schemars(description = "Plans per page (default 30)")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetPlanRequest {
    #[schemars(description = "The plan ID")]
    pub plan_id: i64,
    #[schemars(description = "Also return soft-deleted tasks")]
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTaskStatusRequest {
    #[schemars(description = "The plan the tasks belong to")]
    pub plan_id: i64,
    #[schemars(description = "IDs of the tasks to update")]
    pub task_ids: Vec<i64>,
    #[schemars(description = "One of: pending, in_progress, completed, deleted")]
    pub status: String,
    #[schemars(description = "Note appended to each task (max 500 characters)")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdatePlanRequest {
    #[schemars(description = "The plan ID")]
    pub plan_id: i64,
    #[schemars(description = "New title")]
    pub title: Option<String>,
    #[schemars(description = "New description")]
    pub description: Option<String>,
    #[schemars(description = "Titles of tasks to append")]
    #[serde(default)]
    pub new_tasks: Vec<String>,
    #[schemars(description = "Describe tasks to add and let the planner propose them")]
    pub additional_context: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeletePlanRequest {
    #[schemars(description = "The plan ID")]
    pub plan_id: i64,
}

#[derive(Debug, Serialize)]
struct TaskUpdateResult {
    updated: Vec<Task>,
    plan_status: PlanStatus,
}

impl McpServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sampling_max_tokens: None,
            tool_router: Self::tool_router(),
        }
    }

    /// Generate tasks with the client's model when the client offers sampling.
    pub fn with_client_sampling(mut self, max_tokens: u32) -> Self {
        self.sampling_max_tokens = Some(max_tokens);
        self
    }

    fn uses_client_sampling(&self, capabilities: &ClientCapabilities) -> bool {
        self.sampling_max_tokens.is_some() && supports_sampling(capabilities)
    }

    /// The workflow and user channel for one tool call, chosen from what the
    /// client declared at initialization.
    fn interaction(&self, peer: &Peer<RoleServer>) -> (Arc<Orchestrator>, Box<dyn UserChannel>) {
        let capabilities = peer
            .peer_info()
            .map(|info| info.capabilities.clone())
            .unwrap_or_default();

        let orchestrator = match self.sampling_max_tokens {
            Some(max_tokens) if self.uses_client_sampling(&capabilities) => {
                tracing::debug!("Generating tasks through client sampling");
                let client = Arc::new(SamplingClient::new(peer.clone()));
                let generator = LlmTaskGenerator::new(
                    client,
                    max_tokens,
                    self.orchestrator.config().max_questions,
                );
                Arc::new(self.orchestrator.with_generator(Arc::new(generator)))
            }
            _ => self.orchestrator.clone(),
        };

        let channel: Box<dyn UserChannel> = if supports_elicitation(&capabilities) {
            Box::new(McpChannel::new(peer.clone()))
        } else {
            tracing::debug!("Client cannot elicit; previews are auto-approved");
            Box::new(AutoApprove)
        };

        (orchestrator, channel)
    }

    async fn create_plan(
        orchestrator: &Orchestrator,
        req: NewPlanRequest,
        channel: &dyn UserChannel,
    ) -> Result<CallToolResult, McpError> {
        let outcome = orchestrator
            .new_plan(
                PlanRequest {
                    title: req.title,
                    goal: req.goal,
                    category: req.category,
                    description: req.description,
                    additional_context: req.additional_context,
                },
                channel,
            )
            .await
            .map_err(mcp_error)?;

        Self::json(&outcome)
    }

    async fn extend_plan(
        orchestrator: &Orchestrator,
        req: UpdatePlanRequest,
        channel: &dyn UserChannel,
    ) -> Result<CallToolResult, McpError> {
        let outcome = orchestrator
            .update_plan(
                req.plan_id,
                PlanUpdateRequest {
                    title: req.title,
                    description: req.description,
                    new_tasks: req.new_tasks,
                    additional_context: req.additional_context,
                },
                channel,
            )
            .await
            .map_err(mcp_error)?;

        Self::json(&outcome)
    }

    fn json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

/// Caller mistakes become `invalid_params`; everything else is internal.
fn mcp_error(err: PlannerError) -> McpError {
    if err.is_validation() || err.is_not_found() {
        McpError::invalid_params(err.to_string(), None)
    } else {
        McpError::internal_error(err.to_string(), None)
    }
}

#[tool_router]
impl McpServer {
    #[tool(description = "Create a plan: generates tasks for the goal and saves them")]
    async fn new_plan(
        &self,
        peer: Peer<RoleServer>,
        params: Parameters<NewPlanRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (orchestrator, channel) = self.interaction(&peer);
        Self::create_plan(&orchestrator, params.0, channel.as_ref()).await
    }

    #[tool(description = "List plans, newest first. Completed plans are hidden unless requested")]
    async fn list_plans(
        &self,
        params: Parameters<ListPlansRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let defaults = PlanListQuery::default();
        let query = PlanListQuery {
            include_completed: req.include_completed,
            page: req.page.unwrap_or(defaults.page),
            page_size: req.page_size.unwrap_or(defaults.page_size),
        };

        let page = self
            .orchestrator
            .store()
            .list_plans(&query)
            .map_err(mcp_error)?;

        Self::json(&page)
    }

    #[tool(description = "Get a plan with its tasks in order")]
    async fn get_plan(
        &self,
        params: Parameters<GetPlanRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let store = self.orchestrator.store();
        let plan = if req.include_deleted {
            store.get_plan_with_deleted(req.plan_id)
        } else {
            store.get_plan(req.plan_id)
        }
        .map_err(mcp_error)?;

        Self::json(&plan)
    }

    #[tool(description = "Set the status of one or more tasks in a plan, optionally adding a note")]
    async fn update_task_status(
        &self,
        params: Parameters<UpdateTaskStatusRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        let status = TaskStatus::parse(&req.status).map_err(mcp_error)?;
        let store = self.orchestrator.store();

        let updated = store
            .update_task_status(req.plan_id, &req.task_ids, status, req.notes.as_deref())
            .map_err(mcp_error)?;
        let plan = store.get_plan(req.plan_id).map_err(mcp_error)?;

        Self::json(&TaskUpdateResult {
            updated,
            plan_status: plan.status,
        })
    }

    #[tool(description = "Edit a plan's title or description and append tasks")]
    async fn update_plan(
        &self,
        peer: Peer<RoleServer>,
        params: Parameters<UpdatePlanRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (orchestrator, channel) = self.interaction(&peer);
        Self::extend_plan(&orchestrator, params.0, channel.as_ref()).await
    }

    #[tool(description = "Delete a plan and all of its tasks")]
    async fn delete_plan(
        &self,
        params: Parameters<DeletePlanRequest>,
    ) -> Result<CallToolResult, McpError> {
        let plan_id = params.0.plan_id;
        self.orchestrator
            .store()
            .delete_plan(plan_id)
            .map_err(mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Plan {} deleted",
            plan_id
        ))]))
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Planner MCP server: turns goals into ordered task plans and tracks their progress"
                    .into(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(orchestrator: Arc<Orchestrator>, llm: &LlmConfig) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    // A configured API key keeps generation on the server's own model.
    let service = if llm.api_key().is_some() {
        McpServer::new(orchestrator)
    } else {
        McpServer::new(orchestrator).with_client_sampling(llm.max_tokens)
    };
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
