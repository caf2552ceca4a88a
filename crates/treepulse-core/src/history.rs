use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::model::{ChangedFileRecord, CommitRecord};
use crate::providers::LogProvider;

/// Read-only access to commit history. Every failure degrades to an empty
/// answer and a warning; nothing here returns an error.
#[derive(Clone)]
pub struct HistoryReader {
    root: PathBuf,
    log: Arc<dyn LogProvider>,
    default_limit: usize,
}

impl HistoryReader {
    pub fn new(root: impl Into<PathBuf>, log: Arc<dyn LogProvider>, default_limit: usize) -> Self {
        Self {
            root: root.into(),
            log,
            default_limit,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Newest first, as the provider returns them. `None` uses the configured limit.
    pub async fn list_commits(&self, limit: Option<usize>) -> Vec<CommitRecord> {
        let limit = limit.unwrap_or(self.default_limit);
        match self.log.log(&self.root, Some(limit)).await {
            Ok(commits) => commits.into_iter().map(CommitRecord::from).collect(),
            Err(err) => {
                warn!(event = "commit_log_failed", root = %self.root.display(), error = %err);
                Vec::new()
            }
        }
    }

    pub async fn list_changed_files(&self, commit: &str) -> Vec<ChangedFileRecord> {
        match self.log.name_status(&self.root, commit).await {
            Ok(raw) => parse_name_status(&raw),
            Err(err) => {
                warn!(event = "commit_files_failed", commit, error = %err);
                Vec::new()
            }
        }
    }

    pub async fn file_patch(&self, commit: &str, path: &str) -> Option<String> {
        match self.log.file_patch(&self.root, commit, path).await {
            Ok(patch) => Some(patch),
            Err(err) => {
                warn!(event = "commit_patch_failed", commit, path, error = %err);
                None
            }
        }
    }
}

/// One record per `<status> <path>` line. Renames keep both paths joined
/// by a single space.
pub fn parse_name_status(raw: &str) -> Vec<ChangedFileRecord> {
    raw.lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let status = tokens.next()?;
            let path = tokens.collect::<Vec<_>>().join(" ");
            if path.is_empty() {
                return None;
            }
            Some(ChangedFileRecord {
                path,
                raw_status_code: status.to_string(),
            })
        })
        .collect()
}
