//! In-memory staging selection over the latest scan.
//!
//! The ledger is independent of the git index: nothing here touches the
//! repository. It is rebuilt from scratch on every scan.

use crate::git::FileChange;

/// User selection of which changes go into the next commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingLedger {
    changes: Vec<FileChange>,
}

impl StagingLedger {
    /// Build a ledger from a fresh scan. Every entry starts unstaged.
    pub fn new(changes: Vec<FileChange>) -> Self {
        let changes = changes
            .into_iter()
            .map(|mut c| {
                c.staged = false;
                c
            })
            .collect();
        Self { changes }
    }

    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Flip the staged flag of `path`. Unknown paths are ignored.
    pub fn toggle(&mut self, path: &str) {
        if let Some(change) = self.changes.iter_mut().find(|c| c.path == path) {
            change.staged = !change.staged;
        }
    }

    /// Set the staged flag of `path`. Unknown paths are ignored.
    ///
    /// Returns whether the path was found.
    pub fn set_staged(&mut self, path: &str, staged: bool) -> bool {
        match self.changes.iter_mut().find(|c| c.path == path) {
            Some(change) => {
                change.staged = staged;
                true
            }
            None => false,
        }
    }

    /// Stage everything, or unstage everything if all entries are already staged.
    pub fn toggle_all(&mut self) {
        let target = !self.all_staged();
        for change in &mut self.changes {
            change.staged = target;
        }
    }

    /// True when the ledger is non-empty and every entry is staged.
    pub fn all_staged(&self) -> bool {
        !self.changes.is_empty() && self.changes.iter().all(|c| c.staged)
    }

    /// Paths currently staged, in scan order.
    pub fn staged_paths(&self) -> Vec<String> {
        self.changes
            .iter()
            .filter(|c| c.staged)
            .map(|c| c.path.clone())
            .collect()
    }
}
