//! Deterministic task templates used when generation is unusable.

use planner_core::models::{
    CreateTaskInput, PlanCategory, Priority, TASK_DESCRIPTION_MAX, TASK_TITLE_MAX,
};

use super::collaborators::GenerationContext;

type Template = &'static [(&'static str, Priority, &'static str)];

const PROJECT: Template = &[
    ("Clarify requirements and acceptance criteria", Priority::High, "Pin down what must be delivered and how success is measured."),
    ("Design the architecture and data model", Priority::High, "Choose components, interfaces and storage before writing code."),
    ("Set up the repository, tooling and CI", Priority::Medium, "Prepare the build, lint and test pipeline."),
    ("Implement the core functionality", Priority::Critical, "Build the smallest end-to-end slice first, then fill it out."),
    ("Write unit and integration tests", Priority::High, "Cover the main paths and the known edge cases."),
    ("Document and deploy", Priority::Medium, "Write usage notes and ship the first release."),
];

const PERSONAL: Template = &[
    ("Define what success looks like", Priority::High, "Write down a concrete, checkable outcome."),
    ("Break the goal into weekly milestones", Priority::High, "Split the goal into steps small enough for one week each."),
    ("Schedule the first small step", Priority::Medium, "Put a specific time in the calendar and do it."),
    ("Set up a way to track progress", Priority::Medium, "Use a journal, checklist or app to record each step."),
    ("Review progress and adjust the plan", Priority::Low, "Look back regularly and change what is not working."),
];

const LEARNING: Template = &[
    ("Assess current knowledge and gaps", Priority::High, "List what is already known and what is missing."),
    ("Gather learning resources", Priority::Medium, "Pick a small set of books, courses or documentation to follow."),
    ("Study the fundamentals", Priority::High, "Work through the core concepts before advanced topics."),
    ("Practice with hands-on exercises", Priority::High, "Apply each concept with short exercises."),
    ("Build a small project applying the material", Priority::Medium, "Use the new skills on something real."),
    ("Review and consolidate what was learned", Priority::Low, "Summarize key points and revisit weak spots."),
];

const BUSINESS: Template = &[
    ("Research the market and validate the need", Priority::High, "Talk to potential customers and study alternatives."),
    ("Define the offering and its scope", Priority::High, "Decide exactly what will be offered first."),
    ("Plan budget and resources", Priority::Medium, "Estimate costs, people and time required."),
    ("Build and launch a first version", Priority::Critical, "Ship the smallest version that delivers value."),
    ("Set success metrics and track them", Priority::Medium, "Choose a few numbers that show whether it works."),
    ("Collect feedback and iterate", Priority::Medium, "Use customer feedback to decide the next changes."),
];

const CREATIVE: Template = &[
    ("Collect inspiration and references", Priority::Medium, "Gather examples, moods and materials."),
    ("Sketch initial concepts", Priority::High, "Produce several rough ideas quickly."),
    ("Develop the strongest concept", Priority::High, "Turn the best idea into a full draft."),
    ("Gather feedback on the draft", Priority::Medium, "Show the draft to others and note reactions."),
    ("Refine and finish the piece", Priority::High, "Polish the work and prepare it for sharing."),
];

const RESEARCH: Template = &[
    ("Define the research question", Priority::Critical, "State the question precisely enough to be answered."),
    ("Review existing literature and prior work", Priority::High, "Find out what is already known."),
    ("Choose the method and evaluation criteria", Priority::High, "Decide how the question will be investigated and judged."),
    ("Run the investigation and collect data", Priority::High, "Carry out the method and record results carefully."),
    ("Analyze the findings", Priority::Medium, "Interpret the data against the evaluation criteria."),
    ("Write up conclusions", Priority::Medium, "Document results, limitations and next questions."),
];

const MAINTENANCE: Template = &[
    ("Audit the current state and known issues", Priority::High, "Inventory problems, debt and risks."),
    ("Prioritize the issues to address", Priority::High, "Rank by impact and effort."),
    ("Back up and prepare a rollback path", Priority::Critical, "Make sure every change can be undone."),
    ("Apply the changes incrementally", Priority::High, "Change one thing at a time and check after each."),
    ("Verify with tests and monitoring", Priority::High, "Confirm nothing regressed."),
    ("Update documentation", Priority::Low, "Record what changed and why it matters to users."),
];

const EXTENSION: Template = &[
    ("Scope the requested addition", Priority::High, "Decide what the addition covers and how it fits the existing tasks."),
    ("Carry out the requested addition", Priority::High, "Do the work described in the request."),
    ("Review the result against the plan goal", Priority::Medium, "Check that the addition moves the plan toward its goal."),
];

fn template(category: PlanCategory) -> Template {
    match category {
        PlanCategory::Project => PROJECT,
        PlanCategory::Personal => PERSONAL,
        PlanCategory::Learning => LEARNING,
        PlanCategory::Business => BUSINESS,
        PlanCategory::Creative => CREATIVE,
        PlanCategory::Research => RESEARCH,
        PlanCategory::Maintenance => MAINTENANCE,
    }
}

fn expand(template: Template, detail: &str) -> Vec<CreateTaskInput> {
    template
        .iter()
        .map(|(title, priority, hint)| CreateTaskInput {
            title: (*title).to_string(),
            description: Some(truncate(&format!("{} {}", hint, detail), TASK_DESCRIPTION_MAX)),
            priority: *priority,
        })
        .collect()
}

/// Template tasks for a brand-new plan.
pub fn plan_tasks(category: PlanCategory, goal: &str) -> Vec<CreateTaskInput> {
    expand(template(category), &format!("Goal: {}", goal.trim()))
}

/// Tasks to append to an existing plan.
///
/// Explicitly requested titles are used as-is; otherwise a short generic
/// sequence is built around the free-form request.
pub fn extension_tasks(requested: &[String], request: Option<&str>) -> Vec<CreateTaskInput> {
    if !requested.is_empty() {
        return requested
            .iter()
            .map(|t| CreateTaskInput::titled(truncate(t.trim(), TASK_TITLE_MAX)))
            .collect();
    }
    let detail = match request.map(str::trim).filter(|r| !r.is_empty()) {
        Some(request) => format!("Request: {}", request),
        None => String::new(),
    };
    expand(EXTENSION, detail.trim())
        .into_iter()
        .map(|mut task| {
            task.description = task.description.map(|d| d.trim_end().to_string());
            task
        })
        .collect()
}

pub fn tasks_for(context: &GenerationContext, category: PlanCategory) -> Vec<CreateTaskInput> {
    if context.is_extension() {
        extension_tasks(&context.requested_tasks, context.additional_context.as_deref())
    } else {
        plan_tasks(category, &context.goal)
    }
}

pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
