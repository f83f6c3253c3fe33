//! Task graph execution
//!
//! The executor walks a task's composite structure. Sequential composites stop
//! at the first failing sub-task; parallel composites let every branch finish
//! and fail afterwards. Each leaf holds its own async lock while running, so
//! two runs of the same leaf never write the same outputs at once.

use crate::error::RegistryResult;
use crate::runner::report::format_duration;
use crate::runner::{CompositeMode, Context, Outcome, RunSummary, TaskDef, TaskRegistry, TaskReport};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs registered tasks against a shared context
pub struct Executor {
    registry: TaskRegistry,
    ctx: Arc<Context>,
    leaf_locks: HashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl Executor {
    pub fn new(registry: TaskRegistry, ctx: Context) -> Self {
        let leaf_locks = registry
            .leaf_names()
            .map(|name| (name.to_string(), Arc::new(tokio::sync::Mutex::new(()))))
            .collect();

        Executor {
            registry,
            ctx: Arc::new(ctx),
            leaf_locks,
        }
    }

    /// Run a task and everything below it.
    ///
    /// Unknown names and cycles are reported before anything runs. Leaf
    /// failures do not make this an `Err`; they are in the summary.
    pub async fn run(&self, name: &str) -> RegistryResult<RunSummary> {
        self.registry.resolve(name)?;

        let reports = Mutex::new(Vec::new());
        let started = Instant::now();
        let success = self.run_node(name, &reports).await;

        let reports = reports.into_inner().unwrap_or_else(|e| e.into_inner());
        Ok(RunSummary::new(
            name.to_string(),
            reports,
            started.elapsed(),
            success,
        ))
    }

    fn run_node<'a>(
        &'a self,
        name: &'a str,
        reports: &'a Mutex<Vec<TaskReport>>,
    ) -> BoxFuture<'a, bool> {
        async move {
            let def = match self.registry.get(name) {
                Ok(def) => def,
                Err(e) => {
                    error!("{}", e);
                    return false;
                }
            };

            match def {
                TaskDef::Leaf(action) => {
                    let report = self.run_leaf(name, action.as_ref()).await;
                    let success = report.is_success();
                    if let Ok(mut reports) = reports.lock() {
                        reports.push(report);
                    }
                    success
                }
                TaskDef::Composite { mode, tasks } => {
                    debug!("Starting composite '{}'", name);
                    let success = match mode {
                        CompositeMode::Sequential => {
                            let mut success = true;
                            for task in tasks {
                                if !self.run_node(task, reports).await {
                                    success = false;
                                    break;
                                }
                            }
                            success
                        }
                        CompositeMode::Parallel => {
                            let branches = tasks.iter().map(|task| self.run_node(task, reports));
                            join_all(branches).await.into_iter().all(|ok| ok)
                        }
                    };
                    debug!("Composite '{}' done (success: {})", name, success);
                    success
                }
            }
        }
        .boxed()
    }

    async fn run_leaf(&self, name: &str, action: &dyn crate::runner::Action) -> TaskReport {
        let _guard = match self.leaf_locks.get(name) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        info!("Starting '{}'...", name);
        let started = Instant::now();
        let result = action.run(&self.ctx).await;
        let elapsed = started.elapsed();

        match result {
            Ok(diagnostics) => {
                info!("Finished '{}' after {}", name, format_duration(elapsed));
                TaskReport {
                    name: name.to_string(),
                    outcome: Outcome::Succeeded,
                    diagnostics,
                    elapsed,
                }
            }
            Err(e) => {
                error!("'{}' errored after {}", name, format_duration(elapsed));
                error!("{}", e);
                TaskReport {
                    name: name.to_string(),
                    outcome: Outcome::Failed(e.to_string()),
                    diagnostics: Vec::new(),
                    elapsed,
                }
            }
        }
    }
}
