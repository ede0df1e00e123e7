//! Planner: turns a goal into an ordered, trackable task plan.
//!
//! The store and domain models live in `planner-core`; this crate adds the
//! generation workflow and the MCP, HTTP and CLI front ends.

pub mod api;
pub mod config;
pub mod llm;
pub mod mcp;
pub mod planning;

pub use planner_core::{db, error, models, store};
pub use planner_core::{Database, PlanStore, PlannerError, Result};
