//! File watching for the development loop
//!
//! A [`Watcher`] maps globs to task names. Filesystem events whose
//! root-relative path matches a binding start that task in the background;
//! the event loop never waits for it. Triggers for the same task are
//! coalesced: one run in flight, at most one queued behind it, anything
//! beyond that is dropped.

use crate::error::{ConfigResult, Result};
use crate::runner::Executor;
use crate::server::ReloadNotifier;
use crate::utils::{build_globset, relative_to};
use globset::GlobSet;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Top-level directories never watched
const IGNORED_DIRS: &[&str] = &["node_modules", "dist", ".git", "target"];

/// Globs paired with the task to run when they match
#[derive(Debug, Clone)]
pub struct WatchBinding {
    pub globs: Vec<String>,
    pub task: String,
}

impl WatchBinding {
    pub fn new<S: AsRef<str>>(globs: &[S], task: impl Into<String>) -> Self {
        WatchBinding {
            globs: globs.iter().map(|g| g.as_ref().to_string()).collect(),
            task: task.into(),
        }
    }
}

/// Per-binding trigger state
struct Trigger {
    task: String,
    globs: GlobSet,
    running: tokio::sync::Mutex<()>,
    queued: AtomicBool,
}

pub struct Watcher {
    root: PathBuf,
    /// Canonical form of `root`, as reported by some platforms' events
    canonical_root: PathBuf,
    executor: Arc<Executor>,
    triggers: Vec<Arc<Trigger>>,
    reload: Option<(GlobSet, Arc<dyn ReloadNotifier>)>,
}

impl Watcher {
    pub fn new(
        root: impl Into<PathBuf>,
        executor: Arc<Executor>,
        bindings: Vec<WatchBinding>,
    ) -> ConfigResult<Self> {
        let root = root.into();
        let canonical_root = std::fs::canonicalize(&root).unwrap_or_else(|_| root.clone());

        let triggers = bindings
            .into_iter()
            .map(|binding| {
                Ok(Arc::new(Trigger {
                    globs: build_globset(&binding.globs)?,
                    task: binding.task,
                    running: tokio::sync::Mutex::new(()),
                    queued: AtomicBool::new(false),
                }))
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Watcher {
            root,
            canonical_root,
            executor,
            triggers,
            reload: None,
        })
    }

    /// Also tell `notifier` about changes to files matching `assets`
    pub fn with_reload<S: AsRef<str>>(
        mut self,
        assets: &[S],
        notifier: Arc<dyn ReloadNotifier>,
    ) -> ConfigResult<Self> {
        self.reload = Some((build_globset(assets)?, notifier));
        Ok(self)
    }

    /// Root-relative form of an event path, or `None` if it should be ignored
    fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        let relative = if path.is_absolute() {
            if let Ok(rel) = path.strip_prefix(&self.canonical_root) {
                rel.to_path_buf()
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                rel.to_path_buf()
            } else {
                return None;
            }
        } else {
            relative_to(path, &self.root)
        };

        match relative.components().next() {
            Some(Component::Normal(first)) => {
                let first = first.to_string_lossy();
                if IGNORED_DIRS.iter().any(|dir| *dir == first) {
                    None
                } else {
                    Some(relative)
                }
            }
            _ => None,
        }
    }

    /// Tasks bound to a root-relative path
    pub fn matching_tasks(&self, relative: &Path) -> Vec<&str> {
        self.triggers
            .iter()
            .filter(|t| t.globs.is_match(relative))
            .map(|t| t.task.as_str())
            .collect()
    }

    /// React to a changed path: reload browsers and start bound tasks
    pub fn handle_path(&self, path: &Path) -> Vec<JoinHandle<()>> {
        let Some(relative) = self.relative_path(path) else {
            return Vec::new();
        };

        if let Some((assets, notifier)) = &self.reload {
            if assets.is_match(&relative) {
                notifier.on_asset_changed(&relative);
            }
        }

        let mut handles = Vec::new();
        for trigger in &self.triggers {
            if trigger.globs.is_match(&relative) {
                info!("'{}' changed, running '{}'", relative.display(), trigger.task);
                if let Some(handle) = self.fire(trigger) {
                    handles.push(handle);
                }
            }
        }
        handles
    }

    /// Trigger the binding for `task` directly
    pub fn trigger(&self, task: &str) -> Option<JoinHandle<()>> {
        let trigger = self.triggers.iter().find(|t| t.task == task)?;
        self.fire(trigger)
    }

    fn fire(&self, trigger: &Arc<Trigger>) -> Option<JoinHandle<()>> {
        if trigger.queued.swap(true, Ordering::SeqCst) {
            debug!("'{}' already queued, skipping trigger", trigger.task);
            return None;
        }

        let trigger = Arc::clone(trigger);
        let executor = Arc::clone(&self.executor);
        Some(tokio::spawn(async move {
            let _running = trigger.running.lock().await;
            trigger.queued.store(false, Ordering::SeqCst);

            match executor.run(&trigger.task).await {
                Ok(summary) if summary.is_success() => {}
                Ok(summary) => error!(
                    "'{}' failed ({}); still watching",
                    trigger.task,
                    summary.failed().join(", ")
                ),
                Err(e) => error!("{}", e),
            }
        }))
    }

    /// Directories to hand to the OS watcher
    fn watch_targets(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut targets = vec![(self.root.clone(), RecursiveMode::NonRecursive)];

        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                if path.is_dir() && !IGNORED_DIRS.contains(&name.as_str()) {
                    targets.push((path, RecursiveMode::Recursive));
                }
            }
        }
        targets
    }

    /// Watch until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )?;

        for (path, mode) in self.watch_targets() {
            watcher.watch(&path, mode)?;
        }
        info!("Watching {} for changes", self.root.display());

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping watcher");
                    break;
                }
                event = rx.recv() => match event {
                    Some(Ok(event)) => {
                        if is_relevant(&event.kind) {
                            for path in &event.paths {
                                self.handle_path(path);
                            }
                        }
                    }
                    Some(Err(e)) => warn!("watch error: {}", e),
                    None => break,
                },
            }
        }

        Ok(())
    }
}

/// Content changes, creations, removals and renames; not access or metadata
fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(modify) => !matches!(modify, ModifyKind::Metadata(_)),
        _ => false,
    }
}
