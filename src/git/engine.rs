//! The version-control seam the session drives.

use std::path::Path;

use git2::{Oid, Repository};
use tracing::info;

use crate::commit::{build_diff, commit};
use crate::error::{CommitError, DiffError, ScanError};

use super::status::{FileChange, scan};

/// Operations the session needs from a version-control backend.
///
/// Any engine that can list changes, diff an explicit path list and commit an
/// explicit path list can stand in for [`Git2Engine`].
#[cfg_attr(test, mockall::automock)]
pub trait VcsEngine: Send + Sync {
    fn status(&self, repo_path: &Path) -> Result<Vec<FileChange>, ScanError>;

    fn diff(&self, repo_path: &Path, paths: &[String], budget: usize) -> Result<String, DiffError>;

    fn stage_and_commit(
        &self,
        repo_path: &Path,
        paths: &[String],
        message: &str,
    ) -> Result<Oid, CommitError>;

    /// Create an empty repository at `repo_path`.
    fn init(&self, repo_path: &Path) -> Result<(), ScanError>;
}

/// libgit2-backed engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Engine;

impl VcsEngine for Git2Engine {
    fn status(&self, repo_path: &Path) -> Result<Vec<FileChange>, ScanError> {
        scan(repo_path)
    }

    fn diff(&self, repo_path: &Path, paths: &[String], budget: usize) -> Result<String, DiffError> {
        build_diff(repo_path, paths, budget)
    }

    fn stage_and_commit(
        &self,
        repo_path: &Path,
        paths: &[String],
        message: &str,
    ) -> Result<Oid, CommitError> {
        commit(repo_path, message, paths)
    }

    fn init(&self, repo_path: &Path) -> Result<(), ScanError> {
        Repository::init(repo_path).map_err(|e| ScanError::ScanFailed(e.message().to_string()))?;
        info!("Initialized empty repository in {}", repo_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_status_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Git2Engine;

        assert!(matches!(
            engine.status(dir.path()),
            Err(ScanError::NotAGitRepository(_))
        ));

        engine.init(dir.path()).unwrap();
        assert!(engine.status(dir.path()).unwrap().is_empty());
    }
}
