//! Task registry
//!
//! Tasks are registered once at startup and looked up by name afterwards.
//! A task is either a leaf wrapping an [`Action`] or a composite naming
//! other tasks to run in sequence or in parallel.

use crate::error::{RegistryError, RegistryResult};
use crate::runner::Action;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// How a composite combines its sub-tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    /// One at a time, in order, stopping at the first failure
    Sequential,
    /// All at once; fails after every branch has finished if any failed
    Parallel,
}

/// A task definition
#[derive(Clone)]
pub enum TaskDef {
    Leaf(Arc<dyn Action>),
    Composite {
        mode: CompositeMode,
        tasks: Vec<String>,
    },
}

impl TaskDef {
    pub fn leaf(action: impl Action + 'static) -> Self {
        TaskDef::Leaf(Arc::new(action))
    }

    pub fn series<S: AsRef<str>>(tasks: &[S]) -> Self {
        TaskDef::Composite {
            mode: CompositeMode::Sequential,
            tasks: tasks.iter().map(|t| t.as_ref().to_string()).collect(),
        }
    }

    pub fn parallel<S: AsRef<str>>(tasks: &[S]) -> Self {
        TaskDef::Composite {
            mode: CompositeMode::Parallel,
            tasks: tasks.iter().map(|t| t.as_ref().to_string()).collect(),
        }
    }

    /// Sub-task names; empty for leaves
    pub fn children(&self) -> &[String] {
        match self {
            TaskDef::Leaf(_) => &[],
            TaskDef::Composite { tasks, .. } => tasks,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TaskDef::Leaf(_))
    }
}

impl fmt::Debug for TaskDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskDef::Leaf(_) => f.write_str("Leaf"),
            TaskDef::Composite { mode, tasks } => f
                .debug_struct("Composite")
                .field("mode", mode)
                .field("tasks", tasks)
                .finish(),
        }
    }
}

/// A registered task with its help text
#[derive(Debug, Clone)]
struct Entry {
    def: TaskDef,
    usage: Option<String>,
}

/// Named tasks
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Entry>,
    /// Registration order, for listing
    order: Vec<String>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under a unique name
    pub fn register(&mut self, name: impl Into<String>, def: TaskDef) -> RegistryResult<()> {
        self.insert(name.into(), def, None)
    }

    /// Register a task with a one-line description
    pub fn register_with_usage(
        &mut self,
        name: impl Into<String>,
        usage: impl Into<String>,
        def: TaskDef,
    ) -> RegistryResult<()> {
        self.insert(name.into(), def, Some(usage.into()))
    }

    fn insert(&mut self, name: String, def: TaskDef, usage: Option<String>) -> RegistryResult<()> {
        if self.tasks.contains_key(&name) {
            return Err(RegistryError::DuplicateTask(name));
        }
        self.order.push(name.clone());
        self.tasks.insert(name, Entry { def, usage });
        Ok(())
    }

    /// Look up a task definition
    pub fn get(&self, name: &str) -> RegistryResult<&TaskDef> {
        self.tasks
            .get(name)
            .map(|entry| &entry.def)
            .ok_or_else(|| RegistryError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn usage(&self, name: &str) -> Option<&str> {
        self.tasks.get(name).and_then(|entry| entry.usage.as_deref())
    }

    /// Task names in registration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Names of all leaf tasks
    pub fn leaf_names(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|name| self.tasks.get(*name).is_some_and(|e| e.def.is_leaf()))
            .map(String::as_str)
    }

    /// Human readable shape of a task, e.g. `series(clean, parallel(images, html))`
    pub fn describe(&self, name: &str) -> RegistryResult<String> {
        let def = self.get(name)?;
        Ok(match def {
            TaskDef::Leaf(_) => "leaf".to_string(),
            TaskDef::Composite { mode, tasks } => {
                let label = match mode {
                    CompositeMode::Sequential => "series",
                    CompositeMode::Parallel => "parallel",
                };
                format!("{}({})", label, tasks.join(", "))
            }
        })
    }

    /// Check that everything reachable from `name` exists and is acyclic
    pub fn resolve(&self, name: &str) -> RegistryResult<()> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        self.check_task_cycle(name, &mut visited, &mut stack)
    }

    /// Check every registered task
    pub fn validate(&self) -> RegistryResult<()> {
        let mut visited = HashSet::new();
        for name in &self.order {
            let mut stack = Vec::new();
            self.check_task_cycle(name, &mut visited, &mut stack)?;
        }
        Ok(())
    }

    /// Depth-first walk tracking the current path to spot cycles
    fn check_task_cycle(
        &self,
        task_name: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> RegistryResult<()> {
        if stack.iter().any(|t| t == task_name) {
            stack.push(task_name.to_string());
            return Err(RegistryError::CircularDependency(stack.join(" -> ")));
        }

        if visited.contains(task_name) {
            return Ok(());
        }

        let def = self.get(task_name)?;

        stack.push(task_name.to_string());
        for child in def.children() {
            self.check_task_cycle(child, visited, stack)?;
        }
        stack.pop();

        visited.insert(task_name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::from_fn;

    fn noop() -> TaskDef {
        TaskDef::leaf(from_fn(|| async { Ok(Vec::new()) }))
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = TaskRegistry::new();
        registry.register("clean", noop()).unwrap();
        assert!(registry.get("clean").unwrap().is_leaf());
        assert_eq!(registry.names().to_vec(), vec!["clean".to_string()]);
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut registry = TaskRegistry::new();
        registry.register("build", noop()).unwrap();

        let result = registry.register("build", TaskDef::series(&["a"]));
        assert_eq!(result, Err(RegistryError::DuplicateTask("build".to_string())));
        assert!(registry.get("build").unwrap().is_leaf());
        assert_eq!(registry.names().len(), 1);
    }

    #[test]
    fn test_unknown_task() {
        let registry = TaskRegistry::new();
        assert_eq!(
            registry.get("nope").unwrap_err(),
            RegistryError::UnknownTask("nope".to_string())
        );
    }

    #[test]
    fn test_resolve_unknown_child() {
        let mut registry = TaskRegistry::new();
        registry.register("a", noop()).unwrap();
        registry.register("all", TaskDef::series(&["a", "missing"])).unwrap();

        assert_eq!(
            registry.resolve("all"),
            Err(RegistryError::UnknownTask("missing".to_string()))
        );
        assert!(registry.resolve("a").is_ok());
    }

    #[test]
    fn test_detect_circular_dependency() {
        let mut registry = TaskRegistry::new();
        registry.register("a", TaskDef::series(&["b"])).unwrap();
        registry.register("b", TaskDef::parallel(&["c"])).unwrap();
        registry.register("c", TaskDef::series(&["a"])).unwrap();

        match registry.validate() {
            Err(RegistryError::CircularDependency(path)) => {
                assert_eq!(path, "a -> b -> c -> a");
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference() {
        let mut registry = TaskRegistry::new();
        registry.register("loop", TaskDef::series(&["loop"])).unwrap();
        assert!(matches!(
            registry.resolve("loop"),
            Err(RegistryError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_shared_child_is_not_a_cycle() {
        let mut registry = TaskRegistry::new();
        registry.register("clean", noop()).unwrap();
        registry.register("x", TaskDef::series(&["clean"])).unwrap();
        registry.register("y", TaskDef::series(&["clean"])).unwrap();
        registry.register("all", TaskDef::parallel(&["x", "y"])).unwrap();
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_describe() {
        let mut registry = TaskRegistry::new();
        registry.register("clean", noop()).unwrap();
        registry
            .register_with_usage("default", "Production build", TaskDef::series(&["clean"]))
            .unwrap();

        assert_eq!(registry.describe("clean").unwrap(), "leaf");
        assert_eq!(registry.describe("default").unwrap(), "series(clean)");
        assert_eq!(registry.usage("default"), Some("Production build"));
        assert_eq!(registry.leaf_names().collect::<Vec<_>>(), vec!["clean"]);
    }
}
