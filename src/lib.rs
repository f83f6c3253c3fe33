//! Brisk - a front-end asset build pipeline
//!
//! Brisk lints, bundles and minifies a static site's scripts, styles, images
//! and HTML through external tools, wired together as a graph of named tasks.
//! In development it serves the site with live reload and rebuilds on change.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod server;
pub mod tasks;
pub mod utils;
pub mod watch;

// Re-export commonly used types
pub use error::{BriskError, Result};

/// Current version of Brisk
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
