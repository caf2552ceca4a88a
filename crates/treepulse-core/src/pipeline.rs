use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::enrich::enrich;
use crate::model::Snapshot;
use crate::normalize::normalize;
use crate::providers::{MetadataProvider, StatusProvider};

/// One status → normalize → enrich → sort pass.
#[derive(Clone)]
pub struct Pipeline {
    root: PathBuf,
    status: Arc<dyn StatusProvider>,
    metadata: Arc<dyn MetadataProvider>,
}

impl Pipeline {
    pub fn new(
        root: impl Into<PathBuf>,
        status: Arc<dyn StatusProvider>,
        metadata: Arc<dyn MetadataProvider>,
    ) -> Self {
        Self {
            root: root.into(),
            status,
            metadata,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Never fails: a status query error yields an empty snapshot.
    pub async fn run(&self) -> Snapshot {
        let started = Instant::now();
        let report = match self.status.status(&self.root).await {
            Ok(report) => report,
            Err(err) => {
                warn!(event = "status_query_failed", root = %self.root.display(), error = %err);
                return Snapshot::empty();
            }
        };
        let records = normalize(&report);
        let records = enrich(records, &self.root, self.metadata.as_ref()).await;
        let snapshot = Snapshot::from_records(records);
        debug!(
            event = "pipeline_pass",
            files = snapshot.len(),
            elapsed_ms = started.elapsed().as_millis() as u64
        );
        snapshot
    }
}
