//! Collaborator seams. Production code talks to the git CLI and `tokio::fs`;
//! tests swap in in-memory doubles.

mod fs;
mod git;

pub use fs::TokioFs;
pub use git::{parse_log_output, GitCli, LOG_FIELD_SEP, LOG_RECORD_SEP};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::error::ProviderError;
use crate::model::{FileRecord, RawCommit, RawStatusReport};

#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn status(&self, root: &Path) -> Result<RawStatusReport, ProviderError>;
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fails with [`ProviderError::NotFound`] when nothing exists at `path`.
    async fn modified_at(&self, path: &Path) -> Result<DateTime<Utc>, ProviderError>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the subset of `candidates` whose content contains `query`,
    /// matched case-insensitively as a literal string. No match is `Ok(vec![])`.
    async fn search(
        &self,
        root: &Path,
        query: &str,
        candidates: &[String],
    ) -> Result<Vec<String>, ProviderError>;
}

#[async_trait]
pub trait LogProvider: Send + Sync {
    async fn log(&self, root: &Path, limit: Option<usize>)
        -> Result<Vec<RawCommit>, ProviderError>;

    /// Raw `name-status` text for one commit.
    async fn name_status(&self, root: &Path, commit: &str) -> Result<String, ProviderError>;

    async fn file_patch(&self, root: &Path, commit: &str, path: &str)
        -> Result<String, ProviderError>;
}

#[async_trait]
pub trait RootResolver: Send + Sync {
    /// Top-level repository directory, or `cwd` itself when resolution fails.
    async fn resolve_root(&self, cwd: &Path) -> PathBuf;

    /// Distinguishes a usable repository from git missing / not a repository.
    async fn check_repository(&self, cwd: &Path) -> Result<PathBuf, ProviderError>;
}

#[async_trait]
pub trait WorktreeProvider: Send + Sync {
    async fn diff(&self, root: &Path, record: &FileRecord) -> Result<String, ProviderError>;

    async fn restore(&self, root: &Path, path: &str) -> Result<(), ProviderError>;
}
