//! Prompt text sent to the completion model.

use std::fmt::Write;

use super::collaborators::GenerationContext;
use super::strategy::CategoryStrategy;

pub const SYSTEM_PROMPT: &str = "You are a planning assistant. You break goals into \
concrete, actionable tasks and you answer only in the JSON format requested.";

const STRICT_SUFFIX: &str = "\n\nYour previous answer could not be parsed. Respond with the \
JSON value only: no prose, no markdown fences, no comments.";

fn describe_request(out: &mut String, context: &GenerationContext, strategy: &CategoryStrategy) {
    let _ = writeln!(out, "Plan title: {}", context.title);
    let _ = writeln!(out, "Goal: {}", context.goal);
    let _ = writeln!(out, "Category: {}", strategy.category.as_str());
    if let Some(description) = &context.description {
        let _ = writeln!(out, "Description: {}", description);
    }
    if let Some(extra) = &context.additional_context {
        let _ = writeln!(out, "Additional context: {}", extra);
    }
    if let Some(answers) = &context.clarifications {
        let _ = writeln!(out, "Answers to clarifying questions: {}", answers);
    }
}

/// Ask whether the request carries enough detail to plan well.
pub fn analysis_prompt(
    context: &GenerationContext,
    strategy: &CategoryStrategy,
    max_questions: usize,
) -> String {
    let mut out = String::from("Decide whether this request has enough detail to produce a useful task plan.\n\n");
    describe_request(&mut out, context, strategy);
    let _ = writeln!(out, "\n{}", strategy.context_fragment);
    let _ = writeln!(out, "Plans of this kind are ordered by {}.", strategy.ordering_hint);
    let _ = write!(
        out,
        "\nIf important details are missing, list at most {} short, specific questions \
         whose answers would change the plan.\n\
         Respond with a JSON object:\n\
         {{\"has_sufficient_info\": true|false, \"specific_questions\": [\"...\"]}}",
        max_questions
    );
    if context.strict_output {
        out.push_str(STRICT_SUFFIX);
    }
    out
}

/// Ask for the task list, for a new plan or an extension of an existing one.
pub fn generation_prompt(context: &GenerationContext, strategy: &CategoryStrategy) -> String {
    let mut out = String::new();
    if context.is_extension() {
        out.push_str("Propose tasks to add to an existing plan.\n\n");
    } else {
        out.push_str("Create a task plan.\n\n");
    }
    describe_request(&mut out, context, strategy);

    let _ = writeln!(out, "\n{}", strategy.context_fragment);
    let _ = writeln!(out, "Order the tasks by {}.", strategy.ordering_hint);

    if context.is_extension() {
        if !context.existing_tasks.is_empty() {
            out.push_str("\nThe plan already contains these tasks (do not repeat them):\n");
            for title in &context.existing_tasks {
                let _ = writeln!(out, "- {}", title);
            }
        }
        if !context.requested_tasks.is_empty() {
            out.push_str("\nThe user asked for these tasks to be added:\n");
            for title in &context.requested_tasks {
                let _ = writeln!(out, "- {}", title);
            }
        }
        out.push_str("Propose only the new tasks.\n");
    } else {
        let _ = writeln!(
            out,
            "Produce between {} and {} tasks.",
            strategy.expected_tasks.start(),
            strategy.expected_tasks.end()
        );
    }

    if !context.previous_draft.is_empty() {
        out.push_str("\nA previous draft was rejected:\n");
        for task in &context.previous_draft {
            let _ = writeln!(out, "- [{}] {}", task.priority.as_str(), task.title);
        }
    }
    if !context.feedback.is_empty() {
        out.push_str("\nUser feedback to address (oldest first):\n");
        for note in &context.feedback {
            let _ = writeln!(out, "- {}", note);
        }
    }

    out.push_str(
        "\nRespond with a JSON array. Each element is an object:\n\
         {\"title\": \"...\", \"description\": \"...\", \"priority\": \"low|medium|high|critical\"}\n\
         Titles stay under 200 characters, descriptions under 1000.",
    );
    if context.strict_output {
        out.push_str(STRICT_SUFFIX);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::strategy::strategy_for;
    use planner_core::models::{CreateTaskInput, PlanCategory};

    fn context() -> GenerationContext {
        GenerationContext {
            title: "Build REST API".into(),
            goal: "expose CRUD endpoints".into(),
            ..Default::default()
        }
    }

    #[test]
    fn generation_prompt_carries_strategy() {
        let strategy = strategy_for(PlanCategory::Project);
        let prompt = generation_prompt(&context(), &strategy);
        assert!(prompt.contains("Build REST API"));
        assert!(prompt.contains("between 6 and 20 tasks"));
        assert!(prompt.contains(strategy.ordering_hint));
        assert!(!prompt.contains("could not be parsed"));
    }

    #[test]
    fn feedback_and_previous_draft_are_included() {
        let mut ctx = context();
        ctx.previous_draft = vec![CreateTaskInput::titled("Old task")];
        ctx.feedback = vec!["add a testing task".into()];
        ctx.strict_output = true;
        let prompt = generation_prompt(&ctx, &strategy_for(PlanCategory::Project));
        assert!(prompt.contains("Old task"));
        assert!(prompt.contains("add a testing task"));
        assert!(prompt.contains("could not be parsed"));
    }

    #[test]
    fn extension_lists_existing_tasks() {
        let mut ctx = context();
        ctx.existing_tasks = vec!["Design schema".into()];
        ctx.extending = true;
        let prompt = generation_prompt(&ctx, &strategy_for(PlanCategory::Project));
        assert!(prompt.contains("existing plan"));
        assert!(prompt.contains("- Design schema"));
        assert!(!prompt.contains("between 6 and 20"));
    }

    #[test]
    fn analysis_prompt_caps_questions() {
        let strategy = strategy_for(PlanCategory::Learning);
        let prompt = analysis_prompt(&context(), &strategy, 5);
        assert!(prompt.contains("at most 5"));
        assert!(prompt.contains("has_sufficient_info"));
        assert!(prompt.contains(strategy.context_fragment));
        assert!(prompt.contains(strategy.ordering_hint));
    }
}
