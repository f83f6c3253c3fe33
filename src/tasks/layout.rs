//! The fixed project layout
//!
//! Input and output locations are a convention, not configuration. All
//! paths here are relative to the project root.

use std::path::{Path, PathBuf};

/// Build output directory removed by `clean`
pub const DIST_DIR: &str = "dist";

pub const SCRIPT_ENTRY: &str = "scripts/main.js";
pub const SCRIPT_BUNDLE: &str = "scripts/main.min.js";
pub const SCRIPT_SOURCE_MAP: &str = "scripts/main.min.js.map";

pub const STYLE_ENTRY: &str = "styles/main.css";
pub const STYLE_OUTPUT: &str = "styles/main.min.css";

pub const IMAGES_DIR: &str = "images";

pub const HTML_SOURCE: &str = "index-src.html";
pub const HTML_OUTPUT: &str = "index.html";

/// Lint inputs for scripts
pub const SCRIPT_LINT_GLOBS: &[&str] = &["scripts/**/*.js"];
pub const SCRIPT_LINT_EXCLUDES: &[&str] = &["scripts/**/*.min.js*", "node_modules/**"];

/// Lint inputs for styles
pub const STYLE_LINT_GLOBS: &[&str] = &["styles/**/*.css"];
pub const STYLE_LINT_EXCLUDES: &[&str] = &["styles/**/*.min.css"];

/// Absolute form of a layout path
pub fn resolve(root: &Path, relative: &str) -> PathBuf {
    root.join(relative)
}
