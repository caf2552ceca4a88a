use std::sync::Arc;

use crate::model::{FileRecord, Snapshot};

/// Keeps a selection index valid for a list of `len` items.
///
/// An empty list has no selection, a missing selection on a non-empty list
/// becomes the first row, and anything past the end lands on the last row.
pub fn clamp_selection(selected: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(selected.map_or(0, |index| index.min(len - 1)))
}

/// A published snapshot plus the row the user has selected in it.
#[derive(Debug, Clone)]
pub struct SnapshotView {
    snapshot: Arc<Snapshot>,
    selected: Option<usize>,
}

impl Default for SnapshotView {
    fn default() -> Self {
        Self::new(Arc::new(Snapshot::empty()))
    }
}

impl SnapshotView {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        let selected = clamp_selection(None, snapshot.len());
        Self { snapshot, selected }
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&FileRecord> {
        self.selected.and_then(|index| self.snapshot.get(index))
    }

    /// Swaps in a newer snapshot, keeping the selected index where possible.
    pub fn replace(&mut self, snapshot: Arc<Snapshot>) {
        self.selected = clamp_selection(self.selected, snapshot.len());
        self.snapshot = snapshot;
    }

    pub fn select(&mut self, index: usize) {
        self.selected = clamp_selection(Some(index), self.snapshot.len());
    }

    pub fn move_by(&mut self, delta: isize) {
        let current = self.selected.unwrap_or(0);
        let next = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta as usize)
        };
        self.select(next);
    }
}
