use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ActionError, EngineError, ProviderError};
use crate::model::FileRecord;
use crate::providers::{RootResolver, WorktreeProvider};

/// Per-file actions the dashboard offers on the selected record.
#[derive(Clone)]
pub struct Worktree {
    root: PathBuf,
    provider: Arc<dyn WorktreeProvider>,
}

impl Worktree {
    pub fn new(root: impl Into<PathBuf>, provider: Arc<dyn WorktreeProvider>) -> Self {
        Self {
            root: root.into(),
            provider,
        }
    }

    /// Diff text for display. Errors become a one-line placeholder.
    pub async fn diff_preview(&self, record: &FileRecord) -> String {
        match self.provider.diff(&self.root, record).await {
            Ok(diff) if diff.trim().is_empty() => format!("No changes to show for {}", record.path),
            Ok(diff) => diff,
            Err(err) => {
                warn!(event = "diff_preview_failed", path = %record.path, error = %err);
                format!("Unable to load diff for {}", record.path)
            }
        }
    }

    /// Restores a tracked file from HEAD.
    pub async fn revert(&self, record: &FileRecord) -> Result<(), ActionError> {
        if !record.status_kind.is_tracked() {
            return Err(ActionError::Untracked(record.path.clone()));
        }
        self.provider
            .restore(&self.root, &record.path)
            .await
            .map_err(|source| ActionError::Failed {
                path: record.path.clone(),
                source,
            })?;
        info!(event = "file_reverted", path = %record.path, kind = %record.status_kind);
        Ok(())
    }
}

/// Top-level directory of the repository containing `cwd`, or `cwd` itself.
pub async fn resolve_root(resolver: &dyn RootResolver, cwd: &Path) -> PathBuf {
    resolver.resolve_root(cwd).await
}

/// Like [`resolve_root`] but fails when `cwd` is not usable as a repository.
pub async fn ensure_repository(
    resolver: &dyn RootResolver,
    cwd: &Path,
) -> Result<PathBuf, EngineError> {
    resolver
        .check_repository(cwd)
        .await
        .map_err(|err| match err {
            ProviderError::GitMissing => EngineError::GitMissing,
            ProviderError::NotRepository(_) => EngineError::NotRepository(cwd.to_path_buf()),
            other => EngineError::RepositoryCheck(other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeWorktree {
        diff: Option<String>,
        restore_fails: bool,
        restored: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WorktreeProvider for FakeWorktree {
        async fn diff(&self, _root: &Path, record: &FileRecord) -> Result<String, ProviderError> {
            self.diff
                .clone()
                .ok_or_else(|| ProviderError::NotFound(PathBuf::from(&record.path)))
        }

        async fn restore(&self, _root: &Path, path: &str) -> Result<(), ProviderError> {
            if self.restore_fails {
                return Err(ProviderError::CommandFailed {
                    command: "git checkout".to_string(),
                    stderr: "error: pathspec did not match".to_string(),
                });
            }
            self.restored.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }

    enum FakeResolver {
        Repo(&'static str),
        Fails(fn() -> ProviderError),
    }

    #[async_trait]
    impl RootResolver for FakeResolver {
        async fn resolve_root(&self, cwd: &Path) -> PathBuf {
            self.check_repository(cwd)
                .await
                .unwrap_or_else(|_| cwd.to_path_buf())
        }

        async fn check_repository(&self, _cwd: &Path) -> Result<PathBuf, ProviderError> {
            match self {
                FakeResolver::Repo(root) => Ok(PathBuf::from(root)),
                FakeResolver::Fails(make) => Err(make()),
            }
        }
    }

    #[tokio::test]
    async fn diff_failures_become_placeholder_text() {
        let worktree = Worktree::new("/repo", Arc::new(FakeWorktree::default()));
        let record = FileRecord::new("src/lib.rs", StatusKind::Unstaged);
        assert_eq!(
            worktree.diff_preview(&record).await,
            "Unable to load diff for src/lib.rs"
        );

        let worktree = Worktree::new(
            "/repo",
            Arc::new(FakeWorktree {
                diff: Some("+added\n".to_string()),
                ..FakeWorktree::default()
            }),
        );
        assert_eq!(worktree.diff_preview(&record).await, "+added\n");
    }

    #[tokio::test]
    async fn untracked_files_are_not_reverted() {
        let provider = Arc::new(FakeWorktree::default());
        let worktree = Worktree::new("/repo", provider.clone());
        let err = worktree
            .revert(&FileRecord::new("scratch.txt", StatusKind::New))
            .await
            .expect_err("untracked");
        assert!(matches!(err, ActionError::Untracked(path) if path == "scratch.txt"));
        assert!(provider.restored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tracked_files_restore_from_head() {
        let provider = Arc::new(FakeWorktree::default());
        let worktree = Worktree::new("/repo", provider.clone());
        worktree
            .revert(&FileRecord::new("src/main.rs", StatusKind::Modified))
            .await
            .expect("revert");
        assert_eq!(
            provider.restored.lock().unwrap().as_slice(),
            &["src/main.rs".to_string()]
        );

        let failing = Worktree::new(
            "/repo",
            Arc::new(FakeWorktree {
                restore_fails: true,
                ..FakeWorktree::default()
            }),
        );
        let err = failing
            .revert(&FileRecord::new("gone.rs", StatusKind::Deleted))
            .await
            .expect_err("restore fails");
        assert!(matches!(err, ActionError::Failed { ref path, .. } if path == "gone.rs"));
    }

    #[tokio::test]
    async fn repository_check_classifies_failures() {
        let cwd = Path::new("/work");
        let ok = ensure_repository(&FakeResolver::Repo("/work/repo"), cwd).await;
        assert_eq!(ok.expect("repo"), PathBuf::from("/work/repo"));

        let missing = ensure_repository(&FakeResolver::Fails(|| ProviderError::GitMissing), cwd).await;
        assert!(matches!(missing, Err(EngineError::GitMissing)));

        let outside = ensure_repository(
            &FakeResolver::Fails(|| ProviderError::NotRepository(PathBuf::from("/work"))),
            cwd,
        )
        .await;
        assert!(matches!(outside, Err(EngineError::NotRepository(path)) if path == cwd));

        let other = ensure_repository(
            &FakeResolver::Fails(|| ProviderError::Malformed("empty git root".to_string())),
            cwd,
        )
        .await;
        assert!(matches!(other, Err(EngineError::RepositoryCheck(_))));
    }

    #[tokio::test]
    async fn resolve_root_falls_back_to_cwd() {
        let cwd = Path::new("/tmp/plain");
        let root = resolve_root(&FakeResolver::Fails(|| ProviderError::GitMissing), cwd).await;
        assert_eq!(root, cwd);
    }
}
