//! gitpop - stage a subset of a working tree's changes, have an AI provider
//! write a Conventional Commit message from their diff, and commit exactly
//! those files.
//!
//! # Overview
//!
//! A [`Session`] scans the repository with libgit2, keeps the user's
//! selection in a [`StagingLedger`], builds a size-bounded diff of the
//! selected paths, sends it to the configured provider through the
//! [`ProviderRegistry`] and commits only the selected paths.

pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod session;
pub mod staging;

// Re-export commonly used types
pub use commit::{CommitType, DEFAULT_DIFF_BUDGET, build_diff};
pub use config::{FileSettingsStore, SettingsStore};
pub use error::{CommitError, DiffError, GenerationError, ScanError, SessionError, SettingsError};
pub use git::{ChangeKind, FileChange, Git2Engine, VcsEngine, scan};
pub use llm::{GenerationRequest, ProviderConfig, ProviderKind, ProviderRegistry};
pub use session::{CommitOutcome, Session, SessionState};
pub use staging::StagingLedger;
