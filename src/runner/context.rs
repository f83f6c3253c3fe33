//! Execution context for task running
//!
//! The context carries everything a leaf action needs from the outside world:
//! the project root, the build mode and the interpreter for tool commands.
//! It is built once at startup and shared read-only between concurrent tasks.

use crate::runner::shell_quote;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Environment variable that selects the build mode
pub const MODE_ENV_VAR: &str = "NODE_ENV";

/// Whether leaves should produce production or development output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    Production,
    #[default]
    Development,
}

impl BuildMode {
    /// Read the mode from `NODE_ENV`
    pub fn from_env() -> Self {
        Self::from_value(env::var(MODE_ENV_VAR).ok().as_deref())
    }

    /// Only the exact value `production` selects production mode
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some("production") => BuildMode::Production,
            _ => BuildMode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildMode::Production => "production",
            BuildMode::Development => "development",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Verbosity {
    /// Default log filter directive for this verbosity
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Silent => "off",
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Execution context shared by all tasks of a run
#[derive(Debug, Clone)]
pub struct Context {
    /// Project root; tool commands run here and layout paths hang off it
    pub root: PathBuf,

    /// Build mode, fixed for the process lifetime
    pub mode: BuildMode,

    /// Interpreter for tool commands (e.g., ["sh", "-c"])
    pub interpreter: Vec<String>,
}

impl Context {
    /// Create a context rooted at `root` with default settings
    pub fn new(root: PathBuf) -> Self {
        Context {
            root,
            mode: BuildMode::default(),
            interpreter: default_interpreter(),
        }
    }

    /// Set the build mode
    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Variables every tool command template can use
    pub fn base_vars(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert(
            "root".to_string(),
            shell_quote(&self.root.display().to_string()),
        );
        vars.insert("mode".to_string(), self.mode.to_string());
        vars
    }
}

fn default_interpreter() -> Vec<String> {
    if cfg!(windows) {
        vec!["cmd".to_string(), "/C".to_string()]
    } else {
        vec!["sh".to_string(), "-c".to_string()]
    }
}
