use std::path::PathBuf;
use thiserror::Error;

use crate::scheduler::SchedulerState;

/// Failure reported by one of the collaborators (git, filesystem, search).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("git executable not found")]
    GitMissing,
    #[error("not a git repository: {0}")]
    NotRepository(PathBuf),
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("malformed output: {0}")]
    Malformed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("git executable not found on PATH")]
    GitMissing,
    #[error("{0} is not inside a git repository")]
    NotRepository(PathBuf),
    #[error("repository check failed: {0}")]
    RepositoryCheck(String),
    #[error("scheduler cannot start from state {0}")]
    InvalidTransition(SchedulerState),
}

/// Outcome of a user-initiated action, shown by the UI as a notification.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0} is untracked; nothing to restore from HEAD")]
    Untracked(String),
    #[error("{path}: {source}")]
    Failed {
        path: String,
        #[source]
        source: ProviderError,
    },
}
