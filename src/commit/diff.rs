//! Diff assembly for an explicit set of staged paths using git2.

use std::path::Path;

use git2::{Diff, DiffOptions, ErrorCode, Patch, Repository, Tree};
use tracing::debug;

use crate::commit::truncate::{FileDiff, assemble};
use crate::error::{DiffError, ScanError};
use crate::git::open_work_tree;

/// Line emitted in place of the contents of a binary file.
pub const BINARY_PLACEHOLDER: &str = "<binary file changed>";

/// Build the unified diff for exactly `staged_paths`, bounded by `budget`.
///
/// The diff runs from HEAD to the work tree, so it shows what committing
/// those paths would record, including the content of untracked files.
/// Paths are matched literally. Other changes in the work tree never appear.
pub fn build_diff(
    repo_path: &Path,
    staged_paths: &[String],
    budget: usize,
) -> Result<String, DiffError> {
    if staged_paths.is_empty() {
        return Err(DiffError::NoStagedChanges);
    }

    let repo = open_work_tree(repo_path).map_err(|e| match e {
        ScanError::NotAGitRepository(path) => DiffError::NotAGitRepository(path),
        ScanError::ScanFailed(detail) => DiffError::DiffFailed(detail),
    })?;

    let files = collect_file_diffs(&repo, staged_paths)?;
    if files.is_empty() {
        return Err(DiffError::NoStagedChanges);
    }

    Ok(assemble(&files, budget))
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found).
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, DiffError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(DiffError::DiffFailed(e.message().to_string())),
    };

    let tree = head_ref
        .peel_to_tree()
        .map_err(|e| DiffError::DiffFailed(e.message().to_string()))?;
    Ok(Some(tree))
}

/// Collect one [`FileDiff`] per changed path in `paths`.
pub fn collect_file_diffs(
    repo: &Repository,
    paths: &[String],
) -> Result<Vec<FileDiff>, DiffError> {
    let head_tree = resolve_head_tree(repo)?;

    let mut opts = DiffOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .show_untracked_content(true)
        .disable_pathspec_match(true);
    for p in paths {
        opts.pathspec(p);
    }

    let diff = repo
        .diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))
        .map_err(|e| DiffError::DiffFailed(e.message().to_string()))?;

    if let Ok(stats) = diff.stats() {
        debug!(
            "Diff for {} staged path(s): {} files, {} insertions, {} deletions",
            paths.len(),
            stats.files_changed(),
            stats.insertions(),
            stats.deletions()
        );
    }

    file_diffs(&diff)
}

fn file_diffs(diff: &Diff<'_>) -> Result<Vec<FileDiff>, DiffError> {
    let mut files = Vec::with_capacity(diff.deltas().len());

    for (idx, delta) in diff.deltas().enumerate() {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();

        let patch = Patch::from_diff(diff, idx)
            .map_err(|e| DiffError::DiffFailed(e.message().to_string()))?;

        let text = match patch {
            Some(mut patch) if !patch.delta().flags().is_binary() => {
                let buf = patch
                    .to_buf()
                    .map_err(|e| DiffError::DiffFailed(e.message().to_string()))?;
                String::from_utf8_lossy(&buf).into_owned()
            }
            _ => format!("diff --git a/{path} b/{path}\n{BINARY_PLACEHOLDER}\n"),
        };

        files.push(FileDiff { path, text });
    }

    Ok(files)
}
