//! Change-reconciliation engine for the treepulse dashboard.
//!
//! A poll pass samples `git status`, normalizes it into one [`FileRecord`]
//! per path, stamps each record with its modification time and publishes the
//! sorted result as an immutable [`Snapshot`]. Content search and commit
//! history sit beside the poll loop and never mutate what it publishes.

pub mod config;
pub mod enrich;
pub mod error;
pub mod history;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod providers;
pub mod scheduler;
pub mod search;
pub mod selection;
pub mod sort;
pub mod worktree;

pub use config::EngineConfig;
pub use error::{ActionError, EngineError, ProviderError};
pub use history::HistoryReader;
pub use model::{
    ChangedFileRecord, CommitRecord, FileRecord, FlatStatusLists, RawCommit, RawStatusEntry,
    RawStatusReport, RenamePair, Snapshot, StatusKind,
};
pub use pipeline::Pipeline;
pub use scheduler::{PollScheduler, SchedulerState, SuspendFlag};
pub use search::{ContentSearch, SearchResult};
pub use selection::{clamp_selection, SnapshotView};
pub use worktree::{ensure_repository, resolve_root, Worktree};
