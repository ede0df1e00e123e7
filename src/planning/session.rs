//! Per-request workflow state.

use std::fmt;

use planner_core::{PlannerError, Result};
use uuid::Uuid;

use super::collaborators::{Draft, GenerationContext};
use super::strategy::CategoryStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Analyzing,
    Eliciting,
    Generating,
    Previewing,
    Regenerating,
    Committed,
    Cancelled,
    Failed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyzing => "analyzing",
            Self::Eliciting => "eliciting",
            Self::Generating => "generating",
            Self::Previewing => "previewing",
            Self::Regenerating => "regenerating",
            Self::Committed => "committed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled | Self::Failed)
    }

    /// The legal edges of the workflow. `Committed -> Failed` covers a
    /// persistence error during the commit itself.
    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        matches!(
            (self, next),
            (Analyzing, Eliciting)
                | (Analyzing, Generating)
                | (Eliciting, Generating)
                | (Eliciting, Cancelled)
                | (Generating, Previewing)
                | (Previewing, Regenerating)
                | (Previewing, Committed)
                | (Previewing, Cancelled)
                | (Regenerating, Previewing)
                | (Committed, Failed)
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the user answered a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewReply {
    Accept,
    Feedback(String),
    Cancel,
}

impl PreviewReply {
    pub fn parse(reply: &str) -> Self {
        let trimmed = reply.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "y" | "yes" | "ok" | "accept" | "approve" | "save" => Self::Accept,
            "n" | "no" | "cancel" | "abort" | "quit" => Self::Cancel,
            _ => Self::Feedback(trimmed.to_string()),
        }
    }
}

/// One in-flight planning request. Never persisted; dropped once terminal.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub context: GenerationContext,
    pub strategy: CategoryStrategy,
    state: WorkflowState,
    history: Vec<WorkflowState>,
    drafts: Vec<Draft>,
    regenerations: u32,
    generation_unavailable: bool,
    notices: Vec<String>,
}

impl Session {
    /// A new-plan session, starting with analysis.
    pub fn new(context: GenerationContext, strategy: CategoryStrategy) -> Self {
        Self::starting_at(WorkflowState::Analyzing, context, strategy)
    }

    /// An extension session. The plan already exists, so analysis is skipped.
    pub fn for_extension(context: GenerationContext, strategy: CategoryStrategy) -> Self {
        Self::starting_at(WorkflowState::Generating, context, strategy)
    }

    fn starting_at(
        state: WorkflowState,
        context: GenerationContext,
        strategy: CategoryStrategy,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            context,
            strategy,
            state,
            history: vec![state],
            drafts: Vec::new(),
            regenerations: 0,
            generation_unavailable: false,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Every state visited, in order.
    pub fn history(&self) -> &[WorkflowState] {
        &self.history
    }

    pub fn advance(&mut self, next: WorkflowState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(PlannerError::InvalidTransition {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        tracing::debug!(session = %self.id, "{} -> {}", self.state, next);
        if next == WorkflowState::Regenerating {
            self.regenerations += 1;
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Fold the elicitation reply into the context. Blank replies add nothing.
    pub fn merge_clarifications(&mut self, reply: &str) {
        let reply = reply.trim();
        if !reply.is_empty() {
            self.context.clarifications = Some(reply.to_string());
        }
    }

    /// Record preview feedback against the draft it rejected.
    pub fn add_feedback(&mut self, feedback: String, rejected: &Draft) {
        self.context.feedback.push(feedback);
        self.context.previous_draft = rejected.tasks.clone();
    }

    pub fn record_draft(&mut self, draft: Draft) {
        self.drafts.push(draft);
    }

    pub fn drafts(&self) -> &[Draft] {
        &self.drafts
    }

    pub fn regenerations(&self) -> u32 {
        self.regenerations
    }

    /// Generation reported it cannot run at all for this session.
    pub fn mark_generation_unavailable(&mut self) {
        self.generation_unavailable = true;
    }

    pub fn generation_unavailable(&self) -> bool {
        self.generation_unavailable
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}
