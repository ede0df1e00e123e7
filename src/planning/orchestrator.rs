//! Drives one planning request from analysis to commit.

use std::sync::Arc;

use planner_core::models::*;
use planner_core::{PlanStore, PlannerError, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::collaborators::{
    Draft, DraftSource, GenerationContext, GenerationError, LogLevel, ProgressReporter,
    TaskGenerator, UserChannel, UserPrompt,
};
use super::fallback;
use super::parse::validate_draft;
use super::session::{PreviewReply, Session, WorkflowState};
use super::strategy::{strategy_for, strategy_for_name};
use crate::config::WorkflowConfig;

pub const TEMPLATE_NOTICE: &str = "plan generated from template";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub title: String,
    pub goal: String,
    pub category: String,
    pub description: Option<String>,
    pub additional_context: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Titles of tasks to append.
    #[serde(default)]
    pub new_tasks: Vec<String>,
    /// Free-form request for the generator to propose additions.
    pub additional_context: Option<String>,
}

impl PlanUpdateRequest {
    fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            check_len("title", title, PLAN_TITLE_MAX)?;
        }
        check_optional_len("description", self.description.as_deref(), PLAN_DESCRIPTION_MAX)?;
        check_optional_len(
            "additional_context",
            self.additional_context.as_deref(),
            ADDITIONAL_CONTEXT_MAX,
        )?;
        self.new_tasks
            .iter()
            .try_for_each(|title| check_len("task title", title, TASK_TITLE_MAX))
    }

    fn adds_tasks(&self) -> bool {
        !self.new_tasks.is_empty()
            || self
                .additional_context
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty())
    }
}

/// How a workflow ended. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlanOutcome {
    Committed { plan: Plan, notices: Vec<String> },
    Cancelled { message: String },
}

impl PlanOutcome {
    fn cancelled(session: &Session) -> Self {
        info!(session = %session.id, "Workflow cancelled");
        Self::Cancelled {
            message: format!("Plan '{}' was cancelled; nothing was saved", session.context.title),
        }
    }

    pub fn plan(&self) -> Option<&Plan> {
        match self {
            Self::Committed { plan, .. } => Some(plan),
            Self::Cancelled { .. } => None,
        }
    }
}

pub struct Orchestrator {
    store: Arc<dyn PlanStore>,
    generator: Arc<dyn TaskGenerator>,
    progress: Arc<dyn ProgressReporter>,
    config: WorkflowConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn PlanStore>,
        generator: Arc<dyn TaskGenerator>,
        progress: Arc<dyn ProgressReporter>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            generator,
            progress,
            config,
        }
    }

    /// The same workflow over a different generation backend.
    pub fn with_generator(&self, generator: Arc<dyn TaskGenerator>) -> Self {
        Self {
            store: self.store.clone(),
            generator,
            progress: self.progress.clone(),
            config: self.config.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn PlanStore> {
        &self.store
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Create a plan: analyze, optionally elicit, generate, preview, commit.
    pub async fn new_plan(
        &self,
        request: PlanRequest,
        channel: &dyn UserChannel,
    ) -> Result<PlanOutcome> {
        let strategy = strategy_for_name(&request.category)?;
        let input = CreatePlanInput {
            title: request.title,
            goal: request.goal,
            category: strategy.category,
            description: request.description,
        };
        input.validate()?;
        check_optional_len(
            "additional_context",
            request.additional_context.as_deref(),
            ADDITIONAL_CONTEXT_MAX,
        )?;

        let context = GenerationContext::for_plan(&input, request.additional_context);
        let mut session = Session::new(context, strategy);
        info!(session = %session.id, "Planning '{}' ({})", input.title, input.category.as_str());

        if !self.analyze(&mut session, channel).await? {
            return Ok(PlanOutcome::cancelled(&session));
        }
        session.advance(WorkflowState::Generating)?;
        let draft = self.generate(&mut session).await;

        let Some(draft) = self.review(&mut session, channel, draft).await? else {
            return Ok(PlanOutcome::cancelled(&session));
        };
        self.commit_new(session, &input, draft)
    }

    /// Edit a plan and append tasks, previewing any additions first.
    pub async fn update_plan(
        &self,
        plan_id: i64,
        request: PlanUpdateRequest,
        channel: &dyn UserChannel,
    ) -> Result<PlanOutcome> {
        request.validate()?;
        let plan = self.store.get_plan(plan_id)?;

        if !request.adds_tasks() {
            let plan = self.store.update_plan(
                plan_id,
                &UpdatePlanInput {
                    title: request.title,
                    description: request.description,
                    new_tasks: Vec::new(),
                },
            )?;
            return Ok(PlanOutcome::Committed {
                plan,
                notices: Vec::new(),
            });
        }

        let context = GenerationContext::for_extension(
            &plan,
            request.new_tasks.iter().map(|t| t.trim().to_string()).collect(),
            request.additional_context.clone(),
        );
        let mut session = Session::for_extension(context, strategy_for(plan.category));
        info!(session = %session.id, plan_id, "Extending plan '{}'", plan.title);

        let draft = if request.new_tasks.is_empty() {
            self.generate(&mut session).await
        } else {
            let draft = Draft::new(
                fallback::extension_tasks(&session.context.requested_tasks, None),
                DraftSource::Requested,
            );
            session.record_draft(draft.clone());
            draft
        };

        let Some(draft) = self.review(&mut session, channel, draft).await? else {
            return Ok(PlanOutcome::cancelled(&session));
        };

        session.advance(WorkflowState::Committed)?;
        self.progress.report_progress(95, "Saving new tasks");
        let mut notices = session.take_notices();
        if draft.source == DraftSource::Template {
            notices.push(TEMPLATE_NOTICE.to_string());
        }
        let input = UpdatePlanInput {
            title: request.title,
            description: request.description,
            new_tasks: draft.tasks,
        };
        match self.store.update_plan(plan_id, &input) {
            Ok(plan) => {
                self.progress.report_progress(100, "Plan updated");
                Ok(PlanOutcome::Committed { plan, notices })
            }
            Err(err) => {
                session.advance(WorkflowState::Failed)?;
                error!(session = %session.id, "Failed to save plan update: {}", err);
                Err(err)
            }
        }
    }

    /// Returns `false` if the user walked away during elicitation.
    async fn analyze(&self, session: &mut Session, channel: &dyn UserChannel) -> Result<bool> {
        self.progress.report_progress(10, "Analyzing requirements");

        let judgment = match self
            .generator
            .judge_sufficiency(&session.context, &session.strategy)
            .await
        {
            Ok(judgment) => judgment,
            Err(err) => {
                warn!(session = %session.id, "Sufficiency check failed, assuming sufficient: {}", err);
                return Ok(true);
            }
        };

        let questions: Vec<String> = judgment
            .questions
            .into_iter()
            .take(self.config.max_questions)
            .collect();
        if judgment.sufficient || questions.is_empty() {
            self.progress.log(LogLevel::Info, "Request has enough detail to plan");
            return Ok(true);
        }

        session.advance(WorkflowState::Eliciting)?;
        self.progress.log(
            LogLevel::Info,
            &format!("Asking {} clarifying question(s)", questions.len()),
        );
        let reply = channel
            .ask_user(UserPrompt::Clarify {
                plan_title: &session.context.title,
                questions: &questions,
            })
            .await;
        match reply {
            Ok(reply) => {
                session.merge_clarifications(&reply);
                Ok(true)
            }
            Err(_) => {
                session.advance(WorkflowState::Cancelled)?;
                Ok(false)
            }
        }
    }

    /// One generation step, shared by GENERATING and REGENERATING. Never fails:
    /// unusable output falls back to the category template.
    async fn generate(&self, session: &mut Session) -> Draft {
        self.progress.report_progress(30, "Generating tasks");
        let attempts = self.config.generation_attempts.max(1);
        let mut context = session.context.clone();

        for attempt in 1..=attempts {
            context.strict_output = attempt > 1;
            let result = self
                .generator
                .generate_tasks(&context, &session.strategy)
                .await
                .and_then(|tasks| validate_draft(tasks, &session.strategy));
            match result {
                Ok(tasks) => {
                    info!(session = %session.id, "Generated {} tasks", tasks.len());
                    self.progress.report_progress(60, "Tasks generated");
                    let draft = Draft::new(tasks, DraftSource::Generated);
                    session.record_draft(draft.clone());
                    return draft;
                }
                Err(err @ GenerationError::Unavailable(_)) => {
                    warn!(session = %session.id, "Generation unavailable: {}", err);
                    session.mark_generation_unavailable();
                    break;
                }
                Err(err) => {
                    warn!(session = %session.id, attempt, "Generation attempt failed: {}", err);
                }
            }
        }

        self.progress
            .log(LogLevel::Warning, "Using template tasks, generation was not usable");
        self.progress.report_progress(60, "Tasks generated from template");
        let draft = Draft::new(
            fallback::tasks_for(&session.context, session.strategy.category),
            DraftSource::Template,
        );
        session.record_draft(draft.clone());
        draft
    }

    /// The PREVIEWING loop. `None` means the user cancelled.
    async fn review(
        &self,
        session: &mut Session,
        channel: &dyn UserChannel,
        mut draft: Draft,
    ) -> Result<Option<Draft>> {
        loop {
            session.advance(WorkflowState::Previewing)?;
            self.progress.report_progress(80, "Awaiting approval");

            // Feedback cannot change a template draft once generation is known to be down.
            let frozen = session.generation_unavailable();
            let capped = session.regenerations() >= self.config.max_regenerations;
            let notice = if frozen {
                Some(
                    "Task generation is unavailable, so feedback cannot be applied: \
                     reply to accept this draft or 'cancel'."
                        .to_string(),
                )
            } else if capped {
                Some(format!(
                    "Regeneration limit ({}) reached: reply to accept this draft or 'cancel'.",
                    self.config.max_regenerations
                ))
            } else {
                None
            };
            let reply = channel
                .ask_user(UserPrompt::Preview {
                    plan_title: &session.context.title,
                    draft: &draft,
                    notice: notice.as_deref(),
                })
                .await
                .map(|r| PreviewReply::parse(&r))
                .unwrap_or(PreviewReply::Cancel);

            match reply {
                PreviewReply::Accept => return Ok(Some(draft)),
                PreviewReply::Cancel => {
                    session.advance(WorkflowState::Cancelled)?;
                    return Ok(None);
                }
                PreviewReply::Feedback(_) if frozen => {
                    session.notice("feedback could not be applied; task generation is unavailable");
                    return Ok(Some(draft));
                }
                PreviewReply::Feedback(_) if capped => {
                    session.notice("regeneration limit reached; last draft accepted");
                    return Ok(Some(draft));
                }
                PreviewReply::Feedback(feedback) => {
                    session.advance(WorkflowState::Regenerating)?;
                    self.progress
                        .log(LogLevel::Info, &format!("Regenerating with feedback: {}", feedback));
                    session.add_feedback(feedback, &draft);
                    draft = self.generate(session).await;
                }
            }
        }
    }

    /// COMMITTED: the plan and its tasks are written as one unit.
    fn commit_new(
        &self,
        mut session: Session,
        input: &CreatePlanInput,
        draft: Draft,
    ) -> Result<PlanOutcome> {
        session.advance(WorkflowState::Committed)?;
        self.progress.report_progress(95, "Saving plan");

        let plan = match self.store.create_plan_with_tasks(input, &draft.tasks) {
            Ok(plan) => plan,
            Err(err) => return Err(self.fail(&mut session, err)),
        };

        let mut notices = session.take_notices();
        if draft.source == DraftSource::Template {
            notices.push(TEMPLATE_NOTICE.to_string());
        }
        self.progress.report_progress(100, "Plan saved");
        info!(session = %session.id, plan_id = plan.id, "Created plan with {} tasks", plan.tasks.len());
        Ok(PlanOutcome::Committed { plan, notices })
    }

    fn fail(&self, session: &mut Session, err: PlannerError) -> PlannerError {
        if let Err(transition) = session.advance(WorkflowState::Failed) {
            return transition;
        }
        self.progress
            .log(LogLevel::Error, &format!("Saving plan failed: {}", err));
        err
    }
}
