//! Advisory linting of scripts and styles
//!
//! Findings are printed and returned as diagnostics but never fail the
//! task. Only a linter that cannot be launched at all is an error.

use crate::error::ExecutionResult;
use crate::runner::{Action, Context, Diagnostics, ToolCommand};
use crate::tasks::layout;
use crate::utils::collect_files;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info, warn};

pub struct Lint {
    /// Config key of the linter, used as the log prefix
    tool: &'static str,
    template: String,
    include: &'static [&'static str],
    exclude: &'static [&'static str],
}

impl Lint {
    /// Lint `scripts/**/*.js`, skipping built bundles
    pub fn scripts(template: impl Into<String>) -> Self {
        Lint {
            tool: "lint-scripts",
            template: template.into(),
            include: layout::SCRIPT_LINT_GLOBS,
            exclude: layout::SCRIPT_LINT_EXCLUDES,
        }
    }

    /// Lint `styles/**/*.css`, skipping minified output
    pub fn styles(template: impl Into<String>) -> Self {
        Lint {
            tool: "lint-styles",
            template: template.into(),
            include: layout::STYLE_LINT_GLOBS,
            exclude: layout::STYLE_LINT_EXCLUDES,
        }
    }

    async fn lint(&self, ctx: &Context) -> ExecutionResult<Diagnostics> {
        let files = collect_files(&ctx.root, self.include, self.exclude)?;
        if files.is_empty() {
            debug!("[{}] nothing to lint", self.tool);
            return Ok(Vec::new());
        }

        let output = ToolCommand::new(self.tool, self.template.clone())
            .paths_var("files", &files)
            .output(ctx, None)
            .await?;

        let findings = output.lines();
        if output.success() {
            for line in &findings {
                info!("[{}] {}", self.tool, line);
            }
        } else {
            for line in &findings {
                warn!("[{}] {}", self.tool, line);
            }
            warn!(
                "[{}] reported problems in {} file(s); continuing",
                self.tool,
                files.len()
            );
        }

        Ok(findings)
    }
}

impl Action for Lint {
    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, ExecutionResult<Diagnostics>> {
        self.lint(ctx).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("scripts")).unwrap();
        fs::write(temp_dir.path().join("scripts/main.js"), "var a = 1").unwrap();
        fs::write(temp_dir.path().join("scripts/main.min.js"), "var a=1").unwrap();
        temp_dir
    }

    #[tokio::test]
    async fn test_findings_do_not_fail() {
        let temp_dir = project();
        let ctx = Context::new(temp_dir.path().to_path_buf());
        let lint = Lint::scripts("echo \"${files}: missing semicolon\"; exit 1");

        let findings = lint.run(&ctx).await.unwrap();
        assert_eq!(findings, vec!["scripts/main.js: missing semicolon".to_string()]);
    }

    #[tokio::test]
    async fn test_only_sources_are_linted() {
        let temp_dir = project();
        let ctx = Context::new(temp_dir.path().to_path_buf());
        let lint = Lint::scripts("echo ${files}");

        let findings = lint.run(&ctx).await.unwrap();
        assert_eq!(findings, vec!["scripts/main.js".to_string()]);
    }

    #[tokio::test]
    async fn test_no_files_skips_tool() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = Context::new(temp_dir.path().to_path_buf());
        let lint = Lint::styles("exit 1");

        assert!(lint.run(&ctx).await.unwrap().is_empty());
    }

    #[test]
    fn test_tool_names_are_config_keys() {
        assert_eq!(Lint::scripts("eslint").tool, "lint-scripts");
        assert_eq!(Lint::styles("stylelint").tool, "lint-styles");
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_an_error() {
        let temp_dir = project();
        let ctx = Context::new(temp_dir.path().to_path_buf())
            .with_interpreter(vec!["brisk-no-such-shell".to_string()]);
        let lint = Lint::scripts("eslint ${files}");

        let result = lint.run(&ctx).await;
        assert!(matches!(result, Err(ExecutionError::Spawn { .. })));
    }
}
