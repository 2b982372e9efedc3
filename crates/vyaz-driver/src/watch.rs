//! Cancellable recompilation for watch mode
//!
//! Every change starts a new [`Task`]. Starting a task cancels the one
//! before it; the pipeline checks its token between modules and stops with
//! [`Cancelled`]. Only the newest task's result is ever accepted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

use crate::fs::FileSystem;

/// The run was superseded before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("compilation cancelled by a newer change")]
pub struct Cancelled;

/// Shared flag set once a run should stop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancelled; called at module boundaries.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One recompilation run.
#[derive(Debug, Clone)]
pub struct Task {
    pub generation: u64,
    pub token: CancellationToken,
}

/// Hands out tasks and decides which result is current.
#[derive(Debug, Default)]
pub struct Recompiler {
    generation: u64,
    current: Option<CancellationToken>,
}

impl Recompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new run, cancelling the one in progress.
    pub fn begin(&mut self) -> Task {
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        self.generation += 1;
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        tracing::debug!(generation = self.generation, "recompilation started");
        Task {
            generation: self.generation,
            token,
        }
    }

    /// Accepts a finished run's result if no newer run has started since.
    pub fn finish<T>(&mut self, task: &Task, result: T) -> Option<T> {
        if task.generation != self.generation || task.token.is_cancelled() {
            tracing::debug!(generation = task.generation, "discarding superseded result");
            return None;
        }
        self.current = None;
        Some(result)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Modification times of a set of watched files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStamps(BTreeMap<PathBuf, Option<SystemTime>>);

impl FileStamps {
    pub fn capture<'p, F: FileSystem>(fs: &F, paths: impl IntoIterator<Item = &'p Path>) -> Self {
        Self(
            paths
                .into_iter()
                .map(|path| (path.to_path_buf(), fs.modified(path)))
                .collect(),
        )
    }

    /// Files whose stamp differs between `self` and `newer`, including
    /// files present in only one of them.
    pub fn changed(&self, newer: &FileStamps) -> Vec<PathBuf> {
        let mut changed: Vec<PathBuf> = newer
            .0
            .iter()
            .filter(|(path, stamp)| self.0.get(*path) != Some(stamp))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(self.0.keys().filter(|path| !newer.0.contains_key(*path)).cloned());
        changed.sort();
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_begin_cancels_previous_task() {
        let mut recompiler = Recompiler::new();
        let first = recompiler.begin();
        assert!(!first.token.is_cancelled());
        let second = recompiler.begin();
        assert!(first.token.is_cancelled());
        assert_eq!(first.token.check(), Err(Cancelled));
        assert!(!second.token.is_cancelled());
        assert_eq!(second.generation, first.generation + 1);
    }

    #[test]
    fn test_only_newest_result_is_accepted() {
        let mut recompiler = Recompiler::new();
        let first = recompiler.begin();
        let second = recompiler.begin();
        assert_eq!(recompiler.finish(&first, "old"), None);
        assert_eq!(recompiler.finish(&second, "new"), Some("new"));
    }

    #[test]
    fn test_changed_stamps() {
        let start = SystemTime::UNIX_EPOCH;
        let old = FileStamps(BTreeMap::from([
            (PathBuf::from("/a.vz"), Some(start)),
            (PathBuf::from("/b.vz"), Some(start)),
        ]));
        let new = FileStamps(BTreeMap::from([
            (PathBuf::from("/a.vz"), Some(start)),
            (PathBuf::from("/b.vz"), Some(start + Duration::from_secs(1))),
            (PathBuf::from("/c.vz"), None),
        ]));
        assert_eq!(old.changed(&new), vec![PathBuf::from("/b.vz"), PathBuf::from("/c.vz")]);
        assert!(new.changed(&new).is_empty());
    }
}
