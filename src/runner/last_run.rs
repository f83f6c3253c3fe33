//! Incremental run bookkeeping
//!
//! Remembers when a leaf last completed successfully so it can skip inputs
//! that have not changed since. The record lives in memory only; a fresh
//! process starts from scratch.

use std::fs::Metadata;
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Debug, Default)]
pub struct LastRun {
    completed: Mutex<Option<SystemTime>>,
}

impl LastRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion time of the last successful run, if any
    pub fn since(&self) -> Option<SystemTime> {
        match self.completed.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Mark a successful run as finished now
    pub fn record(&self) {
        let now = SystemTime::now();
        match self.completed.lock() {
            Ok(mut guard) => *guard = Some(now),
            Err(poisoned) => *poisoned.into_inner() = Some(now),
        }
    }

    /// Whether a file with this metadata changed after `since`
    pub fn is_changed(since: Option<SystemTime>, metadata: &Metadata) -> bool {
        match (since, metadata.modified()) {
            (Some(since), Ok(modified)) => modified > since,
            // No previous run, or no mtime support: treat as changed
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_first_run_sees_everything() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("logo.png");
        fs::write(&file, b"png").unwrap();

        let last_run = LastRun::new();
        assert!(last_run.since().is_none());
        assert!(LastRun::is_changed(last_run.since(), &fs::metadata(&file).unwrap()));
    }

    #[test]
    fn test_recorded_run_hides_older_files() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("logo.png");
        fs::write(&file, b"png").unwrap();

        let last_run = LastRun::new();
        last_run.record();
        assert!(last_run.since().is_some());
        assert!(!LastRun::is_changed(last_run.since(), &fs::metadata(&file).unwrap()));
    }
}
