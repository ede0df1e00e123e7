//! The plan-generation workflow.
//!
//! An [`Orchestrator`] runs each `new_plan`/`update_plan` request through a
//! small state machine ([`WorkflowState`]) against three collaborators: a
//! [`TaskGenerator`] that proposes tasks, a [`UserChannel`] that answers
//! clarifying questions and previews, and a [`ProgressReporter`]. Nothing
//! touches the store until the user accepts a preview.

mod channels;
mod collaborators;
mod fallback;
mod generator;
mod orchestrator;
mod parse;
mod prompts;
mod session;
mod strategy;

pub use channels::{AutoApprove, StdinChannel};
pub use collaborators::{
    ChannelClosed, Draft, DraftSource, GeneratedTask, GenerationContext, GenerationError,
    LogLevel, ProgressReporter, Sufficiency, TaskGenerator, TracingProgress, UserChannel,
    UserPrompt,
};
pub use fallback::{extension_tasks, plan_tasks};
pub use generator::{generator_from_config, LlmTaskGenerator, UnavailableGenerator};
pub use orchestrator::{Orchestrator, PlanOutcome, PlanRequest, PlanUpdateRequest, TEMPLATE_NOTICE};
pub use parse::{extract_json, parse_judgment, parse_tasks, validate_draft, JsonShape};
pub use session::{PreviewReply, Session, WorkflowState};
pub use strategy::{strategy_for, strategy_for_name, CategoryStrategy};
