//! Content processing stages
//!
//! A stage turns one buffer into another. Stages are composed into a
//! [`Pipeline`] and applied strictly in order.

use crate::error::ExecutionResult;
use crate::runner::{Context, ToolCommand};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use tracing::warn;

/// One step of a content pipeline
pub trait Stage: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Transform `input`; `vars` are extra template variables from the caller
    fn apply<'a>(
        &'a self,
        input: Vec<u8>,
        ctx: &'a Context,
        vars: &'a HashMap<String, String>,
    ) -> BoxFuture<'a, ExecutionResult<Vec<u8>>>;
}

/// A stage backed by an external filter reading stdin and writing stdout
#[derive(Debug, Clone)]
pub struct CommandStage {
    name: String,
    template: String,
}

impl CommandStage {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        CommandStage {
            name: name.into(),
            template: template.into(),
        }
    }
}

impl Stage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(
        &'a self,
        input: Vec<u8>,
        ctx: &'a Context,
        vars: &'a HashMap<String, String>,
    ) -> BoxFuture<'a, ExecutionResult<Vec<u8>>> {
        async move {
            let command = vars.iter().fold(
                ToolCommand::new(self.name.clone(), self.template.clone()),
                |cmd, (key, value)| cmd.var(key, value.clone()),
            );
            let output = command.run_with_input(ctx, Some(&input)).await?;

            // Filters report warnings on stderr; stdout is the content
            for line in String::from_utf8_lossy(&output.stderr).lines() {
                if !line.trim().is_empty() {
                    warn!("[{}] {}", self.name, line);
                }
            }

            Ok(output.stdout)
        }
        .boxed()
    }
}

/// An ordered list of stages
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Feed `input` through every stage in order
    pub async fn run(
        &self,
        input: Vec<u8>,
        ctx: &Context,
        vars: &HashMap<String, String>,
    ) -> ExecutionResult<Vec<u8>> {
        let mut content = input;
        for stage in &self.stages {
            content = stage.apply(content, ctx, vars).await?;
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;

    struct Suffix(&'static str);

    impl Stage for Suffix {
        fn name(&self) -> &str {
            "suffix"
        }

        fn apply<'a>(
            &'a self,
            mut input: Vec<u8>,
            _ctx: &'a Context,
            _vars: &'a HashMap<String, String>,
        ) -> BoxFuture<'a, ExecutionResult<Vec<u8>>> {
            input.extend_from_slice(self.0.as_bytes());
            async move { Ok(input) }.boxed()
        }
    }

    fn ctx() -> Context {
        Context::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_stages_apply_in_order() {
        let pipeline = Pipeline::new().stage(Suffix("a")).stage(Suffix("b"));
        let out = pipeline.run(b"x".to_vec(), &ctx(), &HashMap::new()).await.unwrap();
        assert_eq!(out, b"xab");
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_identity() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        let out = pipeline.run(b"x".to_vec(), &ctx(), &HashMap::new()).await.unwrap();
        assert_eq!(out, b"x");
    }

    #[tokio::test]
    async fn test_command_stage_uses_vars() {
        let mut vars = HashMap::new();
        vars.insert("suffix".to_string(), "/*m*/".to_string());

        let pipeline = Pipeline::new()
            .stage(CommandStage::new("upper", "tr a-z A-Z"))
            .stage(CommandStage::new("append", "cat; printf %s '${suffix}'"));
        let out = pipeline.run(b"a{}".to_vec(), &ctx(), &vars).await.unwrap();
        assert_eq!(out, b"A{}/*m*/");
    }

    #[tokio::test]
    async fn test_failing_stage_stops_pipeline() {
        let pipeline = Pipeline::new()
            .stage(CommandStage::new("broken", "exit 1"))
            .stage(Suffix("never"));
        let result = pipeline.run(b"x".to_vec(), &ctx(), &HashMap::new()).await;
        assert!(matches!(result, Err(ExecutionError::ToolFailed { .. })));
    }
}
