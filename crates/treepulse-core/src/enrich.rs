use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::model::{epoch, FileRecord};
use crate::providers::MetadataProvider;

/// Stamps every record with its modification time, all stats in flight at
/// once. A failed stat only affects its own record, which gets the epoch.
pub async fn enrich(
    records: Vec<FileRecord>,
    root: &Path,
    metadata: &dyn MetadataProvider,
) -> Vec<FileRecord> {
    let lookups = records.into_iter().map(|record| async move {
        let absolute = absolute_path(root, &record.path);
        match metadata.modified_at(&absolute).await {
            Ok(modified_at) => record.with_modified_at(modified_at),
            Err(err) => {
                debug!(event = "mtime_unavailable", path = %record.path, error = %err);
                record.with_modified_at(epoch())
            }
        }
    });
    join_all(lookups).await
}

pub fn absolute_path(root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::model::StatusKind;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeMetadata {
        times: HashMap<PathBuf, i64>,
        asked: Mutex<Vec<PathBuf>>,
    }

    impl FakeMetadata {
        fn new(times: &[(&str, i64)]) -> Self {
            Self {
                times: times
                    .iter()
                    .map(|(path, secs)| (PathBuf::from(path), *secs))
                    .collect(),
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MetadataProvider for FakeMetadata {
        async fn modified_at(&self, path: &Path) -> Result<DateTime<Utc>, ProviderError> {
            self.asked.lock().unwrap().push(path.to_path_buf());
            match self.times.get(path) {
                Some(secs) => Ok(Utc.timestamp_opt(*secs, 0).unwrap()),
                None => Err(ProviderError::NotFound(path.to_path_buf())),
            }
        }
    }

    #[tokio::test]
    async fn relative_paths_join_the_root() {
        let metadata = FakeMetadata::new(&[("/repo/src/lib.rs", 42)]);
        let records = enrich(
            vec![FileRecord::new("src/lib.rs", StatusKind::Unstaged)],
            Path::new("/repo"),
            &metadata,
        )
        .await;
        assert_eq!(records[0].modified_at, Utc.timestamp_opt(42, 0).unwrap());
        assert_eq!(
            metadata.asked.lock().unwrap().as_slice(),
            &[PathBuf::from("/repo/src/lib.rs")]
        );
    }

    #[tokio::test]
    async fn absolute_paths_are_used_as_is() {
        let metadata = FakeMetadata::new(&[("/elsewhere/a.txt", 7)]);
        let records = enrich(
            vec![FileRecord::new("/elsewhere/a.txt", StatusKind::New)],
            Path::new("/repo"),
            &metadata,
        )
        .await;
        assert_eq!(records[0].modified_at, Utc.timestamp_opt(7, 0).unwrap());
    }

    #[tokio::test]
    async fn one_failure_does_not_spoil_the_batch() {
        let metadata = FakeMetadata::new(&[("/repo/a.rs", 10), ("/repo/c.rs", 30)]);
        let records = enrich(
            vec![
                FileRecord::new("a.rs", StatusKind::Unstaged),
                FileRecord::new("gone.rs", StatusKind::Deleted),
                FileRecord::new("c.rs", StatusKind::Modified),
            ],
            Path::new("/repo"),
            &metadata,
        )
        .await;
        let stamps: Vec<i64> = records
            .iter()
            .map(|record| record.modified_at.timestamp())
            .collect();
        assert_eq!(stamps, vec![10, 0, 30]);
        assert_eq!(records[1].status_kind, StatusKind::Deleted);
    }
}
