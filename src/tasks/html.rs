//! Minifies the source page into the public `index.html`

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Action, Context, Diagnostics, LastRun, ToolCommand};
use crate::tasks::layout;
use crate::utils::size_report;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::Path;
use tracing::{debug, info};

pub struct Html {
    template: String,
    last_run: LastRun,
}

impl Html {
    pub fn new(template: impl Into<String>) -> Self {
        Html {
            template: template.into(),
            last_run: LastRun::new(),
        }
    }

    async fn minify(&self, ctx: &Context) -> ExecutionResult<Diagnostics> {
        let source = layout::resolve(&ctx.root, layout::HTML_SOURCE);
        let output = layout::resolve(&ctx.root, layout::HTML_OUTPUT);

        let metadata = tokio::fs::metadata(&source)
            .await
            .map_err(|e| ExecutionError::io(&source, e))?;

        if !LastRun::is_changed(self.last_run.since(), &metadata) && output.exists() {
            debug!("{} unchanged since last run", layout::HTML_SOURCE);
            return Ok(Vec::new());
        }

        ToolCommand::new("html-minifier", self.template.clone())
            .path_var("input", Path::new(layout::HTML_SOURCE))
            .path_var("output", Path::new(layout::HTML_OUTPUT))
            .run(ctx)
            .await?;

        self.last_run.record();

        let size = tokio::fs::metadata(&output)
            .await
            .map_err(|e| ExecutionError::io(&output, e))?
            .len();
        let report = size_report("html", size);
        info!("{}", report);
        Ok(vec![report])
    }
}

impl Action for Html {
    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, ExecutionResult<Diagnostics>> {
        self.minify(ctx).boxed()
    }
}
