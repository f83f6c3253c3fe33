//! Task execution engine
//!
//! This module holds the task registry, the executor that walks composite
//! tasks, and the plumbing leaf actions use to drive external tools.

pub mod action;
pub mod command;
pub mod context;
pub mod executor;
pub mod interpolate;
pub mod last_run;
pub mod registry;
pub mod report;
pub mod stage;

// Re-export main types
pub use action::*;
pub use command::*;
pub use context::*;
pub use executor::*;
pub use interpolate::*;
pub use last_run::*;
pub use registry::*;
pub use report::*;
pub use stage::*;
