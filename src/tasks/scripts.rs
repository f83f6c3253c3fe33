//! Bundles the script entry module
//!
//! Production builds are minified with comments stripped; development
//! builds are fast and come with a source map. A bundler failure fails the
//! task outright.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Action, BuildMode, Context, Diagnostics, ToolCommand};
use crate::tasks::layout;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io;
use std::path::Path;
use tracing::info;

pub struct Scripts {
    production: String,
    development: String,
}

impl Scripts {
    pub fn new(production: impl Into<String>, development: impl Into<String>) -> Self {
        Scripts {
            production: production.into(),
            development: development.into(),
        }
    }

    fn template(&self, mode: BuildMode) -> &str {
        match mode {
            BuildMode::Production => &self.production,
            BuildMode::Development => &self.development,
        }
    }

    async fn bundle(&self, ctx: &Context) -> ExecutionResult<Diagnostics> {
        let entry = layout::resolve(&ctx.root, layout::SCRIPT_ENTRY);
        if !entry.is_file() {
            return Err(ExecutionError::io(
                entry,
                io::Error::new(io::ErrorKind::NotFound, "script entry module not found"),
            ));
        }

        let output = ToolCommand::new("bundler", self.template(ctx.mode))
            .path_var("entry", Path::new(layout::SCRIPT_ENTRY))
            .path_var("output", Path::new(layout::SCRIPT_BUNDLE))
            .run(ctx)
            .await?;

        if ctx.mode.is_production() {
            // A map from an earlier development build no longer matches
            let map = layout::resolve(&ctx.root, layout::SCRIPT_SOURCE_MAP);
            match tokio::fs::remove_file(&map).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(ExecutionError::io(map, e)),
            }
        }

        let mut diagnostics = output.lines();
        for line in &diagnostics {
            info!("[bundler] {}", line);
        }
        info!("[bundler] Packed successfully!");
        diagnostics.push("Packed successfully!".to_string());

        Ok(diagnostics)
    }
}

impl Action for Scripts {
    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, ExecutionResult<Diagnostics>> {
        self.bundle(ctx).boxed()
    }
}
