//! Debounced content search over the paths of the latest snapshot.
//!
//! Every call to [`ContentSearch::set_query`] starts a new generation. Only
//! the newest generation may publish, so a slow search for an old query can
//! never overwrite the result of a newer one.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::{FileRecord, Snapshot};
use crate::providers::SearchProvider;
use crate::scheduler::SuspendFlag;

const SHELL_METACHARACTERS: &[char] = &[
    ';', '&', '|', '`', '$', '(', ')', '<', '>', '\\', '"', '\'', '!', '*', '{', '}', '[', ']',
];

/// Drops shell metacharacters and control characters, then trims.
pub fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .filter(|ch| !ch.is_control() && !SHELL_METACHARACTERS.contains(ch))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Latest settled search. `matches == None` means no search is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub generation: u64,
    pub query: String,
    pub matches: Option<HashSet<String>>,
}

impl SearchResult {
    pub fn is_active(&self) -> bool {
        self.matches.is_some()
    }

    /// Records of `snapshot` that match, in snapshot order. Inactive searches
    /// keep every record.
    pub fn filter(&self, snapshot: &Snapshot) -> Vec<FileRecord> {
        match &self.matches {
            None => snapshot.records().to_vec(),
            Some(matches) => snapshot
                .iter()
                .filter(|record| matches.contains(&record.path))
                .cloned()
                .collect(),
        }
    }
}

struct Inner {
    provider: Arc<dyn SearchProvider>,
    root: PathBuf,
    debounce: Duration,
    snapshots: watch::Receiver<Arc<Snapshot>>,
    // Held only across the generation bump / compare-and-publish, never across an await.
    generation: Mutex<u64>,
    result_tx: watch::Sender<SearchResult>,
    searching: SuspendFlag,
}

impl Inner {
    fn current_generation(&self) -> std::sync::MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish_if_current(&self, result: SearchResult) -> bool {
        let generation = self.current_generation();
        if *generation != result.generation {
            return false;
        }
        self.searching.clear();
        self.result_tx.send_replace(result);
        true
    }
}

struct PendingSearch {
    handle: JoinHandle<()>,
    dispatched: Arc<AtomicBool>,
}

pub struct ContentSearch {
    inner: Arc<Inner>,
    pending: Mutex<Option<PendingSearch>>,
}

impl ContentSearch {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        root: impl Into<PathBuf>,
        debounce: Duration,
        snapshots: watch::Receiver<Arc<Snapshot>>,
    ) -> Self {
        Self::with_searching_flag(provider, root, debounce, snapshots, SuspendFlag::new())
    }

    /// Uses `searching` as the in-progress flag, typically shared with a
    /// [`PollScheduler`](crate::scheduler::PollScheduler) as its suspend flag.
    pub fn with_searching_flag(
        provider: Arc<dyn SearchProvider>,
        root: impl Into<PathBuf>,
        debounce: Duration,
        snapshots: watch::Receiver<Arc<Snapshot>>,
        searching: SuspendFlag,
    ) -> Self {
        let (result_tx, _) = watch::channel(SearchResult::default());
        Self {
            inner: Arc::new(Inner {
                provider,
                root: root.into(),
                debounce,
                snapshots,
                generation: Mutex::new(0),
                result_tx,
                searching,
            }),
            pending: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchResult> {
        self.inner.result_tx.subscribe()
    }

    pub fn current(&self) -> SearchResult {
        self.inner.result_tx.borrow().clone()
    }

    /// Asserted while a non-blank query is debouncing or in flight.
    pub fn searching_flag(&self) -> SuspendFlag {
        self.inner.searching.clone()
    }

    pub fn is_searching(&self) -> bool {
        self.inner.searching.is_set()
    }

    pub fn clear(&self) -> u64 {
        self.set_query("")
    }

    /// Replaces the query and returns its generation. Must be called inside a
    /// tokio runtime.
    pub fn set_query(&self, query: &str) -> u64 {
        self.cancel_undispatched();

        let sanitized = sanitize_query(query);
        let generation = {
            let mut current = self.inner.current_generation();
            *current += 1;
            if !query.trim().is_empty() && !sanitized.is_empty() {
                self.inner.searching.set();
            }
            *current
        };

        if query.trim().is_empty() {
            self.inner.publish_if_current(SearchResult {
                generation,
                query: String::new(),
                matches: None,
            });
            return generation;
        }
        if sanitized.is_empty() {
            debug!(event = "search_query_sanitized_empty", generation);
            self.inner.publish_if_current(SearchResult {
                generation,
                query: sanitized,
                matches: Some(HashSet::new()),
            });
            return generation;
        }

        let dispatched = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_search(
            self.inner.clone(),
            generation,
            sanitized,
            dispatched.clone(),
        ));
        *self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(PendingSearch { handle, dispatched });
        generation
    }

    fn cancel_undispatched(&self) {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(pending) = pending {
            if !pending.dispatched.load(Ordering::SeqCst) {
                pending.handle.abort();
            }
        }
    }
}

impl Drop for ContentSearch {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(pending) = pending.take() {
                pending.handle.abort();
            }
        }
    }
}

async fn run_search(
    inner: Arc<Inner>,
    generation: u64,
    query: String,
    dispatched: Arc<AtomicBool>,
) {
    tokio::time::sleep(inner.debounce).await;
    if *inner.current_generation() != generation {
        return;
    }
    dispatched.store(true, Ordering::SeqCst);

    let candidates = inner.snapshots.borrow().paths();
    let matches: HashSet<String> = match inner
        .provider
        .search(&inner.root, &query, &candidates)
        .await
    {
        Ok(paths) => paths.into_iter().collect(),
        Err(err) => {
            warn!(event = "content_search_failed", query = %query, error = %err);
            HashSet::new()
        }
    };
    let count = matches.len();
    let published = inner.publish_if_current(SearchResult {
        generation,
        query,
        matches: Some(matches),
    });
    if published {
        debug!(event = "content_search_settled", generation, matches = count);
    } else {
        debug!(event = "content_search_stale", generation);
    }
}
