//! Working tree status scanning using git2.

use std::fmt;
use std::path::Path;

use git2::{ErrorCode, Repository, Status, StatusOptions};
use serde::Serialize;
use tracing::debug;

use crate::error::ScanError;

/// Kind of pending change for a path.
///
/// Untracked and conflicted files share `Unmerged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Modified,
    Added,
    Deleted,
    Unmerged,
}

impl ChangeKind {
    /// Single-letter code, as shown next to each file.
    pub fn code(&self) -> char {
        match self {
            ChangeKind::Modified => 'M',
            ChangeKind::Added => 'A',
            ChangeKind::Deleted => 'D',
            ChangeKind::Unmerged => 'U',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Modified => write!(f, "Modified"),
            ChangeKind::Added => write!(f, "Added"),
            ChangeKind::Deleted => write!(f, "Deleted"),
            ChangeKind::Unmerged => write!(f, "Unmerged"),
        }
    }
}

/// A path with a pending change relative to HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    /// Path relative to the work tree root, `/` separated.
    pub path: String,
    pub kind: ChangeKind,
    /// Ledger-owned selection flag. Always `false` straight out of a scan.
    pub staged: bool,
}

/// Open the repository whose work tree contains `path`.
///
/// Walks up through ancestors like `git` itself does. Bare repositories and
/// empty paths count as "not a repository".
pub fn open_work_tree(path: &Path) -> Result<Repository, ScanError> {
    if path.as_os_str().is_empty() {
        return Err(ScanError::NotAGitRepository(path.to_path_buf()));
    }

    if !path.exists() {
        return Err(ScanError::ScanFailed(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let repo = match Repository::discover(path) {
        Ok(repo) => repo,
        Err(e) if e.code() == ErrorCode::NotFound => {
            return Err(ScanError::NotAGitRepository(path.to_path_buf()));
        }
        Err(e) => return Err(ScanError::ScanFailed(e.message().to_string())),
    };

    if repo.is_bare() {
        return Err(ScanError::NotAGitRepository(path.to_path_buf()));
    }

    Ok(repo)
}

/// List every path with pending changes in the work tree containing `repo_path`.
///
/// Index and work tree changes are combined. Renames are not detected, so a
/// moved file shows up as a deletion plus an addition.
pub fn scan(repo_path: &Path) -> Result<Vec<FileChange>, ScanError> {
    let repo = open_work_tree(repo_path)?;
    scan_repository(&repo)
}

/// Same as [`scan`] for an already opened repository.
pub fn scan_repository(repo: &Repository) -> Result<Vec<FileChange>, ScanError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(false)
        .renames_index_to_workdir(false);

    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(|e| ScanError::ScanFailed(e.message().to_string()))?;

    let changes: Vec<FileChange> = statuses
        .iter()
        .filter_map(|entry| {
            let kind = classify(entry.status())?;
            let path = String::from_utf8_lossy(entry.path_bytes()).to_string();
            Some(FileChange {
                path,
                kind,
                staged: false,
            })
        })
        .collect();

    debug!("Scanned {} changed paths", changes.len());
    Ok(changes)
}

/// Fold a libgit2 status bitset into a single change kind.
///
/// Returns `None` for paths without a pending change.
fn classify(status: Status) -> Option<ChangeKind> {
    if status.is_conflicted() {
        return Some(ChangeKind::Unmerged);
    }
    if status.is_index_new() {
        return Some(ChangeKind::Added);
    }
    if status.is_wt_new() {
        return Some(ChangeKind::Unmerged);
    }
    if status.is_index_deleted() || status.is_wt_deleted() {
        return Some(ChangeKind::Deleted);
    }
    if status.intersects(
        Status::INDEX_MODIFIED
            | Status::WT_MODIFIED
            | Status::INDEX_TYPECHANGE
            | Status::WT_TYPECHANGE
            | Status::INDEX_RENAMED
            | Status::WT_RENAMED,
    ) {
        return Some(ChangeKind::Modified);
    }
    None
}
