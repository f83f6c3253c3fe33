//! Incremental, in-place image optimization
//!
//! Only files modified since the last successful run are handed to the
//! optimizer. The first run in a process sees every file.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Action, Context, Diagnostics, LastRun, ToolCommand};
use crate::tasks::layout;
use crate::utils::{collect_files, size_report, total_size};
use futures::future::BoxFuture;
use futures::{stream, FutureExt, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct Images {
    template: String,
    concurrency: usize,
    last_run: LastRun,
}

impl Images {
    pub fn new(template: impl Into<String>, concurrency: usize) -> Self {
        Images {
            template: template.into(),
            concurrency: concurrency.max(1),
            last_run: LastRun::new(),
        }
    }

    /// Image files changed since the last successful run, relative to the root
    async fn changed_files(&self, ctx: &Context) -> ExecutionResult<Vec<PathBuf>> {
        let pattern = format!("{}/**/*", layout::IMAGES_DIR);
        let since = self.last_run.since();

        let mut changed = Vec::new();
        for relative in collect_files(&ctx.root, &[pattern.as_str()], &[])? {
            let path = ctx.root.join(&relative);
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|e| ExecutionError::io(&path, e))?;
            if LastRun::is_changed(since, &metadata) {
                changed.push(relative);
            }
        }
        Ok(changed)
    }

    async fn optimize_one(&self, ctx: &Context, relative: &Path) -> ExecutionResult<()> {
        let dir = relative.parent().unwrap_or_else(|| Path::new(layout::IMAGES_DIR));
        debug!("optimizing {}", relative.display());
        ToolCommand::new("image-optimizer", self.template.clone())
            .path_var("file", relative)
            .path_var("dir", dir)
            .run(ctx)
            .await?;
        Ok(())
    }

    async fn optimize(&self, ctx: &Context) -> ExecutionResult<Diagnostics> {
        let changed = self.changed_files(ctx).await?;

        let jobs: Vec<BoxFuture<'_, ExecutionResult<()>>> = changed
            .iter()
            .map(|relative| self.optimize_one(ctx, relative).boxed())
            .collect();
        let results: Vec<ExecutionResult<()>> = stream::iter(jobs)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        for result in results {
            result?;
        }

        self.last_run.record();

        let summary = format!("optimized {} file(s)", changed.len());
        info!("[images] {}", summary);
        let absolute: Vec<PathBuf> = changed.iter().map(|p| ctx.root.join(p)).collect();
        let report = size_report("images", total_size(&absolute).await);
        info!("{}", report);

        Ok(vec![summary, report])
    }
}

impl Action for Images {
    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, ExecutionResult<Diagnostics>> {
        self.optimize(ctx).boxed()
    }
}
