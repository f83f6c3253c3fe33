//! Removes the build output directory

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Action, Context, Diagnostics};
use crate::tasks::layout;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Clean;

impl Clean {
    async fn clean(&self, ctx: &Context) -> ExecutionResult<Diagnostics> {
        let dist = layout::resolve(&ctx.root, layout::DIST_DIR);

        match tokio::fs::remove_dir_all(&dist).await {
            Ok(()) => Ok(vec![format!("Deleted {}", layout::DIST_DIR)]),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} already clean", dist.display());
                Ok(Vec::new())
            }
            Err(e) => Err(ExecutionError::io(dist, e)),
        }
    }
}

impl Action for Clean {
    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, ExecutionResult<Diagnostics>> {
        self.clean(ctx).boxed()
    }
}
