use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;

use super::MetadataProvider;
use crate::error::ProviderError;

/// Modification times straight from `tokio::fs::symlink_metadata`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl MetadataProvider for TokioFs {
    async fn modified_at(&self, path: &Path) -> Result<DateTime<Utc>, ProviderError> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ProviderError::NotFound(path.to_path_buf()));
            }
            Err(err) => return Err(ProviderError::Io(err)),
        };
        Ok(DateTime::<Utc>::from(metadata.modified()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_file_reports_recent_mtime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("touched.txt");
        tokio::fs::write(&path, b"hello").await.expect("write");
        let modified = TokioFs.modified_at(&path).await.expect("mtime");
        assert!(modified > crate::model::epoch());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = TokioFs
            .modified_at(&dir.path().join("missing"))
            .await
            .expect_err("missing file");
        assert!(matches!(err, ProviderError::NotFound(_)));
    }
}
