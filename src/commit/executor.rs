//! Commit exactly the selected paths, leaving every other change alone.

use std::path::Path;

use git2::{ErrorCode, Index, Oid, Repository, Tree};
use tracing::{debug, info};

use crate::error::CommitError;
use crate::git::open_work_tree;

fn git_failure(context: &str, e: git2::Error) -> CommitError {
    CommitError::CommitFailed(format!("{context}: {}", e.message()))
}

/// Stage `paths` and create one commit on HEAD containing only them.
///
/// The commit tree is HEAD's tree with just `paths` replaced by their work
/// tree state (removed if deleted). Anything else already in the git index
/// stays staged but is not committed. The on-disk index is written only
/// after the commit exists, so any failure commits nothing.
///
/// `paths` is trusted as given; it does not need to match any selection.
pub fn commit(repo_path: &Path, message: &str, paths: &[String]) -> Result<Oid, CommitError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(CommitError::EmptyMessage);
    }
    if paths.is_empty() {
        return Err(CommitError::EmptyFileList);
    }

    let repo = open_work_tree(repo_path).map_err(|e| CommitError::CommitFailed(e.to_string()))?;
    commit_paths(&repo, message, paths)
}

fn commit_paths(repo: &Repository, message: &str, paths: &[String]) -> Result<Oid, CommitError> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| CommitError::CommitFailed("repository has no work tree".to_string()))?
        .to_path_buf();

    let parent = match repo.head() {
        Ok(head) => Some(
            head.peel_to_commit()
                .map_err(|e| git_failure("Failed to read HEAD", e))?,
        ),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(git_failure("Failed to read HEAD", e)),
    };
    let head_tree = match &parent {
        Some(commit) => Some(
            commit
                .tree()
                .map_err(|e| git_failure("Failed to read HEAD tree", e))?,
        ),
        None => None,
    };

    // Stage into the repository index (in memory until the commit succeeds).
    let mut index = repo
        .index()
        .map_err(|e| git_failure("Failed to open index", e))?;
    for path in paths {
        stage_path(&mut index, &workdir, head_tree.as_ref(), path)?;
    }

    // Build the commit tree from HEAD plus only the selected paths.
    let mut commit_index =
        Index::new().map_err(|e| git_failure("Failed to create index", e))?;
    if let Some(tree) = &head_tree {
        commit_index
            .read_tree(tree)
            .map_err(|e| git_failure("Failed to read HEAD tree", e))?;
    }
    for path in paths {
        match index.get_path(Path::new(path), 0) {
            Some(entry) => commit_index
                .add(&entry)
                .map_err(|e| git_failure(&format!("Failed to stage {path}"), e))?,
            None => {
                if commit_index.get_path(Path::new(path), 0).is_some() {
                    commit_index
                        .remove_path(Path::new(path))
                        .map_err(|e| git_failure(&format!("Failed to remove {path}"), e))?;
                }
            }
        }
    }

    let tree_id = commit_index
        .write_tree_to(repo)
        .map_err(|e| git_failure("Failed to write tree", e))?;

    if head_tree.as_ref().map(|t| t.id()) == Some(tree_id) {
        return Err(CommitError::CommitFailed(
            "nothing to commit: the selected files have no changes".to_string(),
        ));
    }

    let tree = repo
        .find_tree(tree_id)
        .map_err(|e| git_failure("Failed to find tree", e))?;
    let sig = repo.signature().map_err(|e| {
        CommitError::CommitFailed(format!(
            "missing git identity (set user.name and user.email): {}",
            e.message()
        ))
    })?;
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(|e| git_failure("Failed to create commit", e))?;

    index.write().map_err(|e| {
        CommitError::CommitFailed(format!(
            "commit {oid} was created but the index could not be updated: {}",
            e.message()
        ))
    })?;

    info!("Committed {} file(s) as {}", paths.len(), oid);
    Ok(oid)
}

/// Bring one path of the index in line with the work tree.
fn stage_path(
    index: &mut Index,
    workdir: &Path,
    head_tree: Option<&Tree<'_>>,
    path: &str,
) -> Result<(), CommitError> {
    let rel = Path::new(path);

    if workdir.join(rel).symlink_metadata().is_ok() {
        debug!("Staging {}", path);
        return index
            .add_path(rel)
            .map_err(|e| git_failure(&format!("Failed to stage {path}"), e));
    }

    let tracked = index.get_path(rel, 0).is_some()
        || head_tree.is_some_and(|t| t.get_path(rel).is_ok());
    if !tracked {
        return Err(CommitError::CommitFailed(format!(
            "{path} no longer exists and is not tracked"
        )));
    }

    debug!("Staging removal of {}", path);
    index
        .remove_path(rel)
        .map_err(|e| git_failure(&format!("Failed to stage removal of {path}"), e))
}
