//! Small filesystem helpers shared by the leaf tasks

use crate::error::{ConfigError, ConfigResult, ExecutionError, ExecutionResult};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Build a glob set where `*` stays within one path segment
pub fn build_globset<S: AsRef<str>>(patterns: &[S]) -> ConfigResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile_glob(pattern.as_ref())?);
    }
    builder.build().map_err(|e| ConfigError::InvalidGlob {
        pattern: patterns
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(", "),
        error: e.to_string(),
    })
}

fn compile_glob(pattern: &str) -> ConfigResult<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| ConfigError::InvalidGlob {
            pattern: pattern.to_string(),
            error: e.to_string(),
        })
}

/// Files under `root` matching any `include` glob and no `exclude` glob.
///
/// Paths are returned relative to `root`, sorted.
pub fn collect_files(root: &Path, include: &[&str], exclude: &[&str]) -> ExecutionResult<Vec<PathBuf>> {
    let excluded = build_globset(exclude).map_err(|e| ExecutionError::Pattern(e.to_string()))?;
    let escaped_root = glob::Pattern::escape(&root.display().to_string());

    let mut files = Vec::new();
    for pattern in include {
        let full = format!("{}/{}", escaped_root, pattern);
        let entries = glob::glob_with(&full, match_options())
            .map_err(|e| ExecutionError::Pattern(e.to_string()))?;

        for entry in entries {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                ExecutionError::io(path, e.into_error())
            })?;
            if !path.is_file() {
                continue;
            }
            let relative = relative_to(&path, root);
            if excluded.is_match(&relative) {
                continue;
            }
            files.push(relative);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Wildcards never match a leading dot, so `.gitkeep` and `.DS_Store` are skipped
fn match_options() -> glob::MatchOptions {
    glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    }
}

/// `path` relative to `root`, or unchanged when it is outside it
pub fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Human readable byte count: `512 B`, `1.5 kB`, `2.31 MB`
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1000.0;
    const MB: f64 = KB * 1000.0;

    let value = bytes as f64;
    if value < KB {
        format!("{} B", bytes)
    } else if value < MB {
        format!("{:.2} kB", value / KB)
    } else {
        format!("{:.2} MB", value / MB)
    }
}

/// Total size of the given files; unreadable files count as zero
pub async fn total_size(paths: &[PathBuf]) -> u64 {
    let mut total = 0;
    for path in paths {
        if let Ok(metadata) = tokio::fs::metadata(path).await {
            total += metadata.len();
        }
    }
    total
}

/// A size line in the style of `styles all files 1.23 kB`
pub fn size_report(title: &str, bytes: u64) -> String {
    format!("{} all files {}", title, format_size(bytes))
}
