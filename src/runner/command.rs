//! External tool execution
//!
//! Every collaborator (linters, bundler, minifiers, image optimizer) is a
//! shell command template run through the context's interpreter from the
//! project root. Output is captured so it can be reported as diagnostics.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{interpolate, Context};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished tool process
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Non-empty lines of stdout followed by stderr
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.stdout)
            .lines()
            .chain(String::from_utf8_lossy(&self.stderr).lines())
            .map(|line| line.trim_end().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    fn combined(&self) -> String {
        self.lines().join("\n")
    }
}

/// A tool invocation built from a command template
#[derive(Debug, Clone)]
pub struct ToolCommand {
    /// Short tool name used in logs and errors
    tool: String,
    template: String,
    vars: HashMap<String, String>,
}

impl ToolCommand {
    pub fn new(tool: impl Into<String>, template: impl Into<String>) -> Self {
        ToolCommand {
            tool: tool.into(),
            template: template.into(),
            vars: HashMap::new(),
        }
    }

    /// Set a template variable; the value is inserted verbatim
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Set a template variable to a shell-quoted path
    pub fn path_var(self, key: &str, path: &Path) -> Self {
        let quoted = shell_quote(&path.display().to_string());
        self.var(key, quoted)
    }

    /// Set a template variable to a space separated list of quoted paths
    pub fn paths_var<P: AsRef<Path>>(self, key: &str, paths: &[P]) -> Self {
        let joined = paths
            .iter()
            .map(|p| shell_quote(&p.as_ref().display().to_string()))
            .collect::<Vec<_>>()
            .join(" ");
        self.var(key, joined)
    }

    /// Render the final command line; unknown `${var}` references are errors
    pub fn render(&self, ctx: &Context) -> ExecutionResult<String> {
        let mut vars = ctx.base_vars();
        vars.extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(interpolate(&self.template, &vars)?)
    }

    /// Run the tool and capture its output, whatever the exit status
    pub async fn output(&self, ctx: &Context, stdin: Option<&[u8]>) -> ExecutionResult<ToolOutput> {
        let command_line = self.render(ctx)?;
        debug!(tool = %self.tool, command = %command_line, "running tool");

        let (program, args) = ctx.interpreter.split_first().ok_or_else(|| {
            ExecutionError::Spawn {
                command: command_line.clone(),
                error: io::Error::new(io::ErrorKind::InvalidInput, "empty interpreter"),
            }
        })?;

        let mut command = Command::new(program);
        command
            .args(args)
            .arg(&command_line)
            .current_dir(&ctx.root)
            .env(crate::runner::MODE_ENV_VAR, ctx.mode.as_str())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let spawn_error = |error: io::Error| ExecutionError::Spawn {
            command: command_line.clone(),
            error,
        };

        let mut child = command.spawn().map_err(spawn_error)?;

        let writer = {
            let pipe = child.stdin.take();
            let input = stdin.map(<[u8]>::to_vec);
            async move {
                if let (Some(mut pipe), Some(input)) = (pipe, input) {
                    pipe.write_all(&input).await?;
                    pipe.shutdown().await?;
                }
                Ok::<(), io::Error>(())
            }
        };

        let (written, output) = tokio::join!(writer, child.wait_with_output());
        let output = output.map_err(spawn_error)?;

        // A filter that exits without reading all of stdin is judged by its status
        if let Err(e) = written {
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(spawn_error(e));
            }
        }

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Run the tool; a non-zero exit is an error carrying the tool's output
    pub async fn run(&self, ctx: &Context) -> ExecutionResult<ToolOutput> {
        self.run_with_input(ctx, None).await
    }

    /// Run the tool with `input` on stdin; a non-zero exit is an error
    pub async fn run_with_input(
        &self,
        ctx: &Context,
        input: Option<&[u8]>,
    ) -> ExecutionResult<ToolOutput> {
        let output = self.output(ctx, input).await?;
        if !output.success() {
            return Err(ExecutionError::ToolFailed {
                tool: self.tool.clone(),
                code: output.code,
                output: output.combined(),
            });
        }
        Ok(output)
    }
}

/// Quote a string for a POSIX shell unless it is plainly safe
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@+,%".contains(c));
    if safe || cfg!(windows) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InterpolationError;
    use std::path::PathBuf;

    fn ctx() -> Context {
        Context::new(std::env::temp_dir())
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("scripts/main.js"), "scripts/main.js");
        assert_eq!(shell_quote("my file.png"), "'my file.png'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_render_uses_base_and_task_vars() {
        let cmd = ToolCommand::new("bundler", "bundle ${entry} --mode ${mode}")
            .path_var("entry", &PathBuf::from("scripts/main.js"));
        assert_eq!(
            cmd.render(&ctx()).unwrap(),
            "bundle scripts/main.js --mode development"
        );
    }

    #[test]
    fn test_render_rejects_unknown_variable() {
        let cmd = ToolCommand::new("bundler", "bundle ${brisk_no_such_var}");
        assert!(matches!(
            cmd.render(&ctx()),
            Err(ExecutionError::Template(InterpolationError::UndefinedVariable(name)))
                if name == "brisk_no_such_var"
        ));
    }

    #[test]
    fn test_path_values_are_literal() {
        let cmd = ToolCommand::new("image-optimizer", "optimize ${file}")
            .path_var("file", &PathBuf::from("images/icon-${size}.png"));
        assert_eq!(cmd.render(&ctx()).unwrap(), "optimize 'images/icon-${size}.png'");
    }

    #[test]
    fn test_paths_var() {
        let cmd = ToolCommand::new("lint", "lint ${files}")
            .paths_var("files", &[PathBuf::from("a.js"), PathBuf::from("b c.js")]);
        assert_eq!(cmd.render(&ctx()).unwrap(), "lint a.js 'b c.js'");
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let cmd = ToolCommand::new("echo", "echo hello");
        let output = cmd.run(&ctx()).await.unwrap();
        assert!(output.success());
        assert_eq!(output.lines(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_run_failing_tool() {
        let cmd = ToolCommand::new("broken", "echo oops >&2; exit 3");
        let result = cmd.run(&ctx()).await;
        match result {
            Err(ExecutionError::ToolFailed { tool, code, output }) => {
                assert_eq!(tool, "broken");
                assert_eq!(code, Some(3));
                assert_eq!(output, "oops");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_output_keeps_failure() {
        let cmd = ToolCommand::new("lint", "echo finding; exit 1");
        let output = cmd.output(&ctx(), None).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.lines(), vec!["finding".to_string()]);
    }

    #[tokio::test]
    async fn test_stdin_is_piped() {
        let cmd = ToolCommand::new("filter", "tr a-z A-Z");
        let output = cmd.run_with_input(&ctx(), Some(b"body {}")).await.unwrap();
        assert_eq!(output.stdout, b"BODY {}");
    }

    #[tokio::test]
    async fn test_mode_is_exported() {
        let cmd = ToolCommand::new("env", "printf %s \"$NODE_ENV\"");
        let ctx = ctx().with_mode(crate::runner::BuildMode::Production);
        let output = cmd.run(&ctx).await.unwrap();
        assert_eq!(output.stdout, b"production");
    }
}
