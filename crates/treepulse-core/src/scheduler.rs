//! Poll loop: `Idle → Running → Stopped`.
//!
//! One tokio task owns the ticker and runs each pass inline, so passes never
//! overlap; [`PollScheduler::refresh_now`] takes the same pass lock. Every
//! completed pass replaces the published `Arc<Snapshot>` wholesale through a
//! `watch` channel, so readers only ever see whole snapshots.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::Snapshot;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Stopped => "stopped",
        })
    }
}

/// Shared boolean read fresh on every tick; set by whoever wants polling paused.
#[derive(Debug, Clone, Default)]
pub struct SuspendFlag(Arc<AtomicBool>);

impl SuspendFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Shared {
    pipeline: Pipeline,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    pass_lock: AsyncMutex<()>,
    passes: AtomicU64,
    skipped: AtomicU64,
    stopped: AtomicBool,
}

impl Shared {
    /// Decides run-or-skip only once the pass lock is held, so a caller
    /// queued behind an in-flight pass never starts a new one after stop.
    async fn run_pass(&self) -> Option<Arc<Snapshot>> {
        let _guard = self.pass_lock.lock().await;
        if self.stopped.load(Ordering::SeqCst) {
            debug!(event = "poll_pass_skipped_after_stop");
            return None;
        }
        let snapshot = Arc::new(self.pipeline.run().await);
        self.snapshot_tx.send_replace(snapshot.clone());
        self.passes.fetch_add(1, Ordering::SeqCst);
        Some(snapshot)
    }
}

pub struct PollScheduler {
    shared: Arc<Shared>,
    interval: Duration,
    suspend: SuspendFlag,
    state: Mutex<SchedulerState>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new(pipeline: Pipeline, config: &EngineConfig, suspend: SuspendFlag) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(Snapshot::empty()));
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                pipeline,
                snapshot_tx,
                pass_lock: AsyncMutex::new(()),
                passes: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
                stopped: AtomicBool::new(false),
            }),
            interval: config.effective_poll_interval(),
            suspend,
            state: Mutex::new(SchedulerState::Idle),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn latest(&self) -> Arc<Snapshot> {
        self.shared.snapshot_tx.borrow().clone()
    }

    pub fn passes_completed(&self) -> u64 {
        self.shared.passes.load(Ordering::SeqCst)
    }

    pub fn ticks_skipped(&self) -> u64 {
        self.shared.skipped.load(Ordering::SeqCst)
    }

    /// Spawns the poll task onto the current tokio runtime. The first pass
    /// runs immediately, later ones every interval.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state != SchedulerState::Idle {
            return Err(EngineError::InvalidTransition(*state));
        }
        *state = SchedulerState::Running;
        let handle = tokio::spawn(poll_loop(
            self.shared.clone(),
            self.interval,
            self.suspend.clone(),
            self.shutdown_tx.subscribe(),
        ));
        *self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
        Ok(())
    }

    /// Idempotent. No pass starts after this returns; one already in flight
    /// may still finish and publish.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state == SchedulerState::Stopped {
            return;
        }
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shutdown_tx.send_replace(true);
        info!(event = "poll_scheduler_stop", from = %*state);
        *state = SchedulerState::Stopped;
    }

    /// Waits for the poll task to exit after [`stop`](Self::stop).
    pub async fn join(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Runs a pass outside the ticker, serialized with ticks. Returns `None`
    /// once the scheduler is stopped.
    pub async fn refresh_now(&self) -> Option<Arc<Snapshot>> {
        self.shared.run_pass().await
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shutdown_tx.send_replace(true);
    }
}

async fn poll_loop(
    shared: Arc<Shared>,
    interval: Duration,
    suspend: SuspendFlag,
    mut shutdown: watch::Receiver<bool>,
) {
    if *shutdown.borrow_and_update() {
        return;
    }
    info!(
        event = "poll_scheduler_start",
        root = %shared.pipeline.root().display(),
        interval_ms = interval.as_millis() as u64
    );
    shared.run_pass().await;

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if *shutdown.borrow() {
                    break;
                }
                if suspend.is_set() {
                    shared.skipped.fetch_add(1, Ordering::SeqCst);
                    debug!(event = "poll_tick_skipped");
                    continue;
                }
                shared.run_pass().await;
            }
        }
    }
    info!(
        event = "poll_loop_exit",
        passes = shared.passes.load(Ordering::SeqCst)
    );
}
