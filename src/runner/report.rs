//! Outcomes of task runs

use crate::error::{ExecutionError, ExecutionResult};
use colored::Colorize;
use std::time::Duration;

/// How a leaf run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Failed with the rendered error
    Failed(String),
}

/// Result of one leaf run
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub name: String,
    pub outcome: Outcome,
    pub diagnostics: Vec<String>,
    pub elapsed: Duration,
}

impl TaskReport {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }
}

/// Everything that happened during one `run(name)` call
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The task that was asked for
    pub task: String,
    /// Leaf reports in completion order
    pub reports: Vec<TaskReport>,
    pub elapsed: Duration,
    success: bool,
}

impl RunSummary {
    pub(crate) fn new(
        task: String,
        reports: Vec<TaskReport>,
        elapsed: Duration,
        success: bool,
    ) -> Self {
        RunSummary {
            task,
            reports,
            elapsed,
            success,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Report for a leaf, if it ran
    pub fn report(&self, name: &str) -> Option<&TaskReport> {
        self.reports.iter().find(|r| r.name == name)
    }

    /// Whether a leaf ran at all
    pub fn ran(&self, name: &str) -> bool {
        self.report(name).is_some()
    }

    /// Names of failed leaves
    pub fn failed(&self) -> Vec<String> {
        self.reports
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.name.clone())
            .collect()
    }

    /// Turn a failed run into an error
    pub fn into_result(self) -> ExecutionResult<RunSummary> {
        if self.success {
            Ok(self)
        } else {
            Err(ExecutionError::TasksFailed(self.failed()))
        }
    }

    /// Print a per-leaf table to stderr
    pub fn print(&self) {
        let width = self.reports.iter().map(|r| r.name.len()).max().unwrap_or(0);
        for report in &self.reports {
            let (mark, name) = match report.outcome {
                Outcome::Succeeded => ("✓".green(), report.name.normal()),
                Outcome::Failed(_) => ("✗".red(), report.name.red()),
            };
            eprintln!(
                "  {} {:<width$}  {}",
                mark,
                name,
                format_duration(report.elapsed).dimmed(),
                width = width
            );
        }

        let verdict = if self.success {
            format!("'{}' finished", self.task).green().bold()
        } else {
            format!("'{}' failed", self.task).red().bold()
        };
        eprintln!("{} after {}", verdict, format_duration(self.elapsed));
    }
}

/// Render a duration the way task runners usually do: `850 ms`, `1.24 s`
pub fn format_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{} ms", millis)
    } else {
        format!("{:.2} s", elapsed.as_secs_f64())
    }
}
