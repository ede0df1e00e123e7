//! Capabilities the workflow consumes but does not implement.

use async_trait::async_trait;
use planner_core::models::*;
use serde::Serialize;
use thiserror::Error;

use super::strategy::CategoryStrategy;
use crate::llm::LlmError;

/// Everything the generation capability is told about a request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationContext {
    pub title: String,
    pub goal: String,
    pub description: Option<String>,
    pub additional_context: Option<String>,
    /// Reply to the elicitation round, if one happened.
    pub clarifications: Option<String>,
    /// Feedback from each rejected preview, oldest first.
    pub feedback: Vec<String>,
    /// The draft the latest feedback was about.
    pub previous_draft: Vec<CreateTaskInput>,
    /// Titles already in the plan when extending an existing plan.
    pub existing_tasks: Vec<String>,
    /// Titles the caller explicitly asked to add.
    pub requested_tasks: Vec<String>,
    /// Tasks are being appended to an existing plan.
    pub extending: bool,
    /// Set on retries after unparseable output.
    pub strict_output: bool,
}

impl GenerationContext {
    pub fn for_plan(input: &CreatePlanInput, additional_context: Option<String>) -> Self {
        Self {
            title: input.title.trim().to_string(),
            goal: input.goal.trim().to_string(),
            description: input.description.clone(),
            additional_context,
            ..Default::default()
        }
    }

    pub fn for_extension(
        plan: &Plan,
        requested_tasks: Vec<String>,
        additional_context: Option<String>,
    ) -> Self {
        Self {
            title: plan.title.clone(),
            goal: plan.goal.clone(),
            description: plan.description.clone(),
            additional_context,
            existing_tasks: plan.tasks.iter().map(|t| t.title.clone()).collect(),
            requested_tasks,
            extending: true,
            ..Default::default()
        }
    }

    pub fn is_extension(&self) -> bool {
        self.extending
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sufficiency {
    pub sufficient: bool,
    pub questions: Vec<String>,
}

impl Sufficiency {
    pub fn sufficient() -> Self {
        Self {
            sufficient: true,
            questions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation unavailable: {0}")]
    Unavailable(String),

    #[error("generation failed transiently: {0}")]
    Transient(String),

    #[error("malformed generation output: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Whether asking again could produce a usable answer.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidResponse(message) => Self::Malformed(message),
            err if err.is_retryable() => Self::Transient(err.to_string()),
            err => Self::Unavailable(err.to_string()),
        }
    }
}

/// The text-generation collaborator.
#[async_trait]
pub trait TaskGenerator: Send + Sync {
    async fn judge_sufficiency(
        &self,
        context: &GenerationContext,
        strategy: &CategoryStrategy,
    ) -> Result<Sufficiency, GenerationError>;

    async fn generate_tasks(
        &self,
        context: &GenerationContext,
        strategy: &CategoryStrategy,
    ) -> Result<Vec<GeneratedTask>, GenerationError>;
}

/// Where a draft's tasks came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DraftSource {
    Generated,
    Template,
    Requested,
}

/// An unpersisted task list shown to the user for approval.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Draft {
    pub tasks: Vec<CreateTaskInput>,
    pub source: DraftSource,
}

impl Draft {
    pub fn new(tasks: Vec<CreateTaskInput>, source: DraftSource) -> Self {
        Self { tasks, source }
    }
}

/// What the workflow asks the user.
#[derive(Debug, Clone, Copy)]
pub enum UserPrompt<'a> {
    Clarify {
        plan_title: &'a str,
        questions: &'a [String],
    },
    Preview {
        plan_title: &'a str,
        draft: &'a Draft,
        notice: Option<&'a str>,
    },
}

impl UserPrompt<'_> {
    pub fn render(&self) -> String {
        match self {
            Self::Clarify {
                plan_title,
                questions,
            } => {
                let mut out = format!(
                    "To create an effective plan for '{}', please answer:\n",
                    plan_title
                );
                for (i, q) in questions.iter().enumerate() {
                    out.push_str(&format!("{}. {}\n", i + 1, q));
                }
                out.push_str("(press Enter to proceed with what is known)");
                out
            }
            Self::Preview {
                plan_title,
                draft,
                notice,
            } => {
                let mut out = format!("Plan preview: {}\n", plan_title);
                if draft.source == DraftSource::Template {
                    out.push_str("(plan generated from template)\n");
                }
                for (i, task) in draft.tasks.iter().enumerate() {
                    out.push_str(&format!(
                        "\n{:>2}. [{}] {}",
                        i + 1,
                        task.priority.as_str(),
                        task.title
                    ));
                    if let Some(desc) = &task.description {
                        out.push_str(&format!("\n    {}", desc));
                    }
                }
                out.push_str("\n\n");
                if let Some(notice) = notice {
                    out.push_str(notice);
                    out.push('\n');
                }
                out.push_str(
                    "Reply 'yes' to save, describe changes to regenerate, or 'cancel' to abort.",
                );
                out
            }
        }
    }
}

#[derive(Debug, Error)]
#[error("user channel closed")]
pub struct ChannelClosed;

/// The end-user input collaborator. Suspends until the user answers.
#[async_trait]
pub trait UserChannel: Send + Sync {
    async fn ask_user(&self, prompt: UserPrompt<'_>) -> Result<String, ChannelClosed>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Fire-and-forget observability sink. Nothing here can fail the workflow.
pub trait ProgressReporter: Send + Sync {
    fn report_progress(&self, percent: u8, message: &str);
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards progress and log messages to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report_progress(&self, percent: u8, message: &str) {
        tracing::info!(percent, "{}", message);
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
    }
}
