//! Processes the stylesheet entry through the stage pipeline

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Action, CommandStage, Context, Diagnostics, Pipeline};
use crate::tasks::layout;
use crate::utils::size_report;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use tracing::info;

pub struct Styles {
    pipeline: Pipeline,
}

impl Styles {
    pub fn new(pipeline: Pipeline) -> Self {
        Styles { pipeline }
    }

    /// One command stage per template, named `style-stage-N`
    pub fn from_templates<S: AsRef<str>>(templates: &[S]) -> Self {
        let pipeline = templates
            .iter()
            .enumerate()
            .fold(Pipeline::new(), |pipeline, (index, template)| {
                pipeline.stage(CommandStage::new(
                    format!("style-stage-{}", index + 1),
                    template.as_ref(),
                ))
            });
        Styles::new(pipeline)
    }

    async fn process(&self, ctx: &Context) -> ExecutionResult<Diagnostics> {
        let entry = layout::resolve(&ctx.root, layout::STYLE_ENTRY);
        let output = layout::resolve(&ctx.root, layout::STYLE_OUTPUT);

        let source = tokio::fs::read(&entry)
            .await
            .map_err(|e| ExecutionError::io(&entry, e))?;

        let mut vars = HashMap::new();
        vars.insert("input".to_string(), layout::STYLE_ENTRY.to_string());
        vars.insert("output".to_string(), layout::STYLE_OUTPUT.to_string());
        // Development output carries an inline source map
        let map_flag = if ctx.mode.is_production() {
            "--no-map"
        } else {
            "--map"
        };
        vars.insert("map".to_string(), map_flag.to_string());

        let css = self.pipeline.run(source, ctx, &vars).await?;
        let size = css.len() as u64;

        tokio::fs::write(&output, css)
            .await
            .map_err(|e| ExecutionError::io(&output, e))?;

        let report = size_report("styles", size);
        info!("{}", report);
        Ok(vec![report])
    }
}

impl Action for Styles {
    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, ExecutionResult<Diagnostics>> {
        self.process(ctx).boxed()
    }
}
