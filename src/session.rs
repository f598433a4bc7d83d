//! One open working directory: its changes, the user's selection, and the
//! generate/commit flow over them.

use std::path::{Path, PathBuf};

use git2::Oid;
use tracing::{debug, info};

use crate::error::{CommitError, DiffError, ScanError, SessionError};
use crate::git::{FileChange, VcsEngine};
use crate::llm::{GenerationRequest, ProviderConfig, ProviderRegistry};
use crate::staging::StagingLedger;

/// Whether the session's directory is inside a work tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    /// Not inside a work tree; [`Session::initialize`] can create one.
    NotARepository,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub oid: Oid,
    pub message: String,
    pub files: Vec<String>,
}

pub struct Session<E: VcsEngine> {
    repo_path: PathBuf,
    engine: E,
    registry: ProviderRegistry,
    ledger: StagingLedger,
    state: SessionState,
}

impl<E: VcsEngine> Session<E> {
    /// Open a session and run the first scan.
    ///
    /// A directory outside any repository is not an error: the session opens
    /// in [`SessionState::NotARepository`] with no changes.
    pub fn open(
        repo_path: impl Into<PathBuf>,
        engine: E,
        registry: ProviderRegistry,
    ) -> Result<Self, SessionError> {
        let mut session = Self {
            repo_path: repo_path.into(),
            engine,
            registry,
            ledger: StagingLedger::default(),
            state: SessionState::Ready,
        };
        session.rescan()?;
        Ok(session)
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn changes(&self) -> &[FileChange] {
        self.ledger.changes()
    }

    /// Replace the change list with a fresh scan. All staging is cleared.
    pub fn rescan(&mut self) -> Result<(), SessionError> {
        match self.engine.status(&self.repo_path) {
            Ok(changes) => {
                debug!(
                    "Scanned {}: {} change(s)",
                    self.repo_path.display(),
                    changes.len()
                );
                self.ledger = StagingLedger::new(changes);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(ScanError::NotAGitRepository(path)) => {
                debug!("{} is not inside a git repository", path.display());
                self.ledger = StagingLedger::default();
                self.state = SessionState::NotARepository;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn toggle(&mut self, path: &str) {
        self.ledger.toggle(path);
    }

    pub fn toggle_all(&mut self) {
        self.ledger.toggle_all();
    }

    /// Returns whether `path` is one of the current changes.
    pub fn set_staged(&mut self, path: &str, staged: bool) -> bool {
        self.ledger.set_staged(path, staged)
    }

    pub fn staged_paths(&self) -> Vec<String> {
        self.ledger.staged_paths()
    }

    /// The bounded diff of the staged paths.
    pub fn diff(&self, budget: usize) -> Result<String, SessionError> {
        self.ensure_repository()?;
        let staged = self.staged_paths();
        if staged.is_empty() {
            return Err(DiffError::NoStagedChanges.into());
        }
        Ok(self.engine.diff(&self.repo_path, &staged, budget)?)
    }

    /// Generate a commit message from the staged paths' diff.
    pub async fn generate_message(&self, config: &ProviderConfig) -> Result<String, SessionError> {
        let diff_text = self.diff(config.diff_budget)?;
        let message = self
            .registry
            .generate(GenerationRequest {
                diff_text: &diff_text,
                config,
            })
            .await?;
        Ok(message)
    }

    /// Commit the staged paths, then rescan.
    ///
    /// Without a message one is generated first when `config.auto_generate`
    /// is set.
    pub async fn commit(
        &mut self,
        message: Option<&str>,
        config: &ProviderConfig,
    ) -> Result<CommitOutcome, SessionError> {
        self.ensure_repository()?;
        let files = self.staged_paths();
        if files.is_empty() {
            return Err(CommitError::EmptyFileList.into());
        }

        let message = match message {
            Some(m) => m.trim().to_string(),
            None if config.auto_generate => self.generate_message(config).await?,
            None => return Err(CommitError::EmptyMessage.into()),
        };
        if message.is_empty() {
            return Err(CommitError::EmptyMessage.into());
        }

        let oid = self
            .engine
            .stage_and_commit(&self.repo_path, &files, &message)?;
        info!("Created commit {} with {} file(s)", oid, files.len());

        self.rescan()?;
        Ok(CommitOutcome {
            oid,
            message,
            files,
        })
    }

    /// Create a repository at the session directory and scan it.
    ///
    /// Does nothing when the session is already inside a repository.
    pub fn initialize(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Ready {
            debug!("{} is already a repository", self.repo_path.display());
            return Ok(());
        }

        self.engine
            .init(&self.repo_path)
            .map_err(|e| SessionError::InitFailed(e.to_string()))?;
        self.rescan()
    }

    fn ensure_repository(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::NotARepository => {
                Err(SessionError::NotARepository(self.repo_path.clone()))
            }
        }
    }
}
