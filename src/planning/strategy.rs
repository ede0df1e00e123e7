//! Per-category guidance for task generation.

use std::ops::RangeInclusive;

use planner_core::models::PlanCategory;
use planner_core::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStrategy {
    pub category: PlanCategory,
    pub expected_tasks: RangeInclusive<usize>,
    pub ordering_hint: &'static str,
    pub context_fragment: &'static str,
}

impl CategoryStrategy {
    /// Counts outside this window are treated as malformed output.
    pub fn accepts_count(&self, count: usize) -> bool {
        count > 0 && count <= self.expected_tasks.end() * 2
    }
}

pub fn strategy_for(category: PlanCategory) -> CategoryStrategy {
    let (expected_tasks, ordering_hint, context_fragment) = match category {
        PlanCategory::Project => (
            6..=20,
            "dependency order: requirements, design, build, test, release",
            "This is a software or technical project. Cover requirements, architecture, \
             implementation, testing, documentation and deployment. Keep tasks concrete \
             enough to finish in a few days.",
        ),
        PlanCategory::Personal => (
            4..=10,
            "chronological order, starting with the smallest first step",
            "This is a personal goal. Favour small, realistic steps that fit into daily \
             life, and include a way to track progress and stay motivated.",
        ),
        PlanCategory::Learning => (
            5..=15,
            "progressive difficulty, fundamentals before advanced material",
            "This is a learning plan. Start by assessing current knowledge, then alternate \
             study with hands-on practice, and finish with a project that applies the \
             material.",
        ),
        PlanCategory::Business => (
            5..=15,
            "validate before investing: research, plan, build, launch, measure",
            "This is a business initiative. Include market research, resource and budget \
             planning, measurable outcomes and a feedback loop with customers.",
        ),
        PlanCategory::Creative => (
            4..=12,
            "creative process: explore, draft, refine, finish",
            "This is a creative work. Leave room for exploration and iteration, ask for \
             feedback on early drafts, and end with finishing and sharing the piece.",
        ),
        PlanCategory::Research => (
            5..=12,
            "research method: question, prior work, method, investigation, analysis, write-up",
            "This is a research effort. Define a precise question, review existing work, \
             choose a method with clear evaluation criteria, and document the findings.",
        ),
        PlanCategory::Maintenance => (
            5..=15,
            "risk order: audit and safeguards before changes, verification after",
            "This is maintenance or improvement work on something that already exists. \
             Begin with an audit, protect against regressions with backups and tests, and \
             apply changes incrementally.",
        ),
    };

    CategoryStrategy {
        category,
        expected_tasks,
        ordering_hint,
        context_fragment,
    }
}

/// Resolve a category name. Unknown names are a validation error.
pub fn strategy_for_name(name: &str) -> Result<CategoryStrategy> {
    PlanCategory::parse(name).map(strategy_for)
}
