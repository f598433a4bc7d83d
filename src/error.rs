//! Error types for gitpop modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading repository status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Not a git repository: {}", .0.display())]
    NotAGitRepository(PathBuf),

    #[error("Failed to read repository status: {0}")]
    ScanFailed(String),
}

/// Errors from assembling the diff sent to the AI provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffError {
    #[error("No staged changes. Stage at least one file first.")]
    NoStagedChanges,

    #[error("Not a git repository: {}", .0.display())]
    NotAGitRepository(PathBuf),

    #[error("Failed to collect diff: {0}")]
    DiffFailed(String),
}

/// Errors from AI commit message generation.
///
/// Details never contain the provider credential.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Could not reach {provider}: {detail}")]
    ProviderUnreachable { provider: String, detail: String },

    #[error("{provider} rejected the credentials: {detail}")]
    ProviderAuthError { provider: String, detail: String },

    #[error("{provider} did not answer within {seconds} seconds")]
    ProviderTimeout { provider: String, seconds: u64 },

    #[error("Rate limited by {provider}. Try again in a moment.")]
    ProviderRateLimited { provider: String },

    #[error("{provider} returned an unexpected response: {detail}")]
    MalformedResponse { provider: String, detail: String },

    #[error("{provider} request failed: {detail}")]
    ProviderFailed { provider: String, detail: String },

    #[error("A commit message is already being generated")]
    GenerationInProgress,
}

/// Errors from staging and committing the selected files.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("Commit message is empty")]
    EmptyMessage,

    #[error("No files selected for commit")]
    EmptyFileList,

    #[error("Failed to create commit: {0}")]
    CommitFailed(String),
}

/// Errors from the persisted settings file.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not determine a configuration directory for this user")]
    NoConfigDir,

    #[error("Failed to read settings from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write settings to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Errors surfaced by the session controller.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("{} is not a git repository. Run `gitpop init` to create one.", .0.display())]
    NotARepository(PathBuf),

    #[error("Failed to initialize repository: {0}")]
    InitFailed(String),
}
