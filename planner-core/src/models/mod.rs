mod plan;
mod task;
mod validate;

pub use plan::*;
pub use task::*;
pub use validate::*;
