//! Core library for the planner.
//!
//! This crate provides the plan/task domain models, the SQLite-backed plan
//! store and the error taxonomy, independent of any transport layer (MCP,
//! HTTP, CLI) and of the generation workflow that drives it.
//!
//! # Usage
//!
//! ```no_run
//! use planner_core::db::Database;
//! use planner_core::models::*;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let plan = db.create_plan(&CreatePlanInput {
//!     title: "Build REST API".into(),
//!     goal: "expose CRUD endpoints".into(),
//!     category: PlanCategory::Project,
//!     description: None,
//! })?;
//! let page = db.list_plans(&PlanListQuery::default())?;
//! assert_eq!(page.plans[0].id, plan.id);
//! # Ok::<(), planner_core::PlannerError>(())
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod store;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::{PlannerError, Result};
pub use store::PlanStore;
