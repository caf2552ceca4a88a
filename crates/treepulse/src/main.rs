mod app;
mod config;
mod logging;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use treepulse_core::{
    ensure_repository,
    providers::{GitCli, TokioFs},
    ContentSearch, HistoryReader, Pipeline, PollScheduler, SuspendFlag, Worktree,
};

use crate::app::{Action, App, AppEvent};
use crate::config::{load_settings, Args, Settings};

const APP_EVENT_CAPACITY: usize = 64;

/// Engine handles the dashboard loop dispatches work to.
struct Services {
    scheduler: Arc<PollScheduler>,
    search: ContentSearch,
    history: HistoryReader,
    worktree: Worktree,
    events: mpsc::Sender<AppEvent>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = load_settings(&args)?;
    let log_path = logging::init_logging(settings.debug, settings.log_file.as_deref());

    let git = Arc::new(GitCli::new());
    let root = match ensure_repository(git.as_ref(), &settings.repo).await {
        Ok(root) => root,
        Err(err) => {
            error!(
                event = "repository_check_failed",
                repo = %settings.repo.display(),
                error = %err
            );
            return Err(err).context("treepulse must be started inside a git repository");
        }
    };
    info!(
        event = "treepulse_start",
        root = %root.display(),
        poll_interval_ms = settings.engine.poll_interval.as_millis() as u64,
        log_file = ?log_path
    );

    let pipeline = Pipeline::new(root.clone(), git.clone(), Arc::new(TokioFs));
    if settings.once {
        let snapshot = pipeline.run().await;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let suspend = SuspendFlag::new();
    let scheduler = Arc::new(PollScheduler::new(pipeline, &settings.engine, suspend.clone()));
    let searching = if settings.engine.skip_polling_while_searching {
        suspend
    } else {
        SuspendFlag::new()
    };
    let search = ContentSearch::with_searching_flag(
        git.clone(),
        root.clone(),
        settings.engine.search_debounce,
        scheduler.subscribe(),
        searching,
    );
    let (events_tx, events_rx) = mpsc::channel(APP_EVENT_CAPACITY);
    let services = Services {
        scheduler: scheduler.clone(),
        search,
        history: HistoryReader::new(root.clone(), git.clone(), settings.engine.history_limit),
        worktree: Worktree::new(root.clone(), git),
        events: events_tx,
    };

    scheduler.start()?;
    let outcome = run_dashboard(App::new(root), &services, events_rx, &settings).await;
    scheduler.stop();
    scheduler.join().await;
    info!(event = "treepulse_exit", passes = scheduler.passes_completed());
    outcome
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

async fn run_dashboard(
    app: App,
    services: &Services,
    events_rx: mpsc::Receiver<AppEvent>,
    settings: &Settings,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let outcome = event_loop(&mut terminal, app, services, events_rx, settings).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    outcome
}

async fn event_loop(
    terminal: &mut Tui,
    mut app: App,
    services: &Services,
    mut events_rx: mpsc::Receiver<AppEvent>,
    settings: &Settings,
) -> Result<()> {
    let mut snapshots = services.scheduler.subscribe();
    let mut results = services.search.subscribe();
    let mut input = EventStream::new();

    loop {
        app.searching = services.search.is_searching();
        terminal.draw(|frame| ui::render(frame, &app))?;
        let action = tokio::select! {
            Ok(()) = snapshots.changed() => {
                let snapshot = snapshots.borrow_and_update().clone();
                app.apply_snapshot(snapshot)
            }
            Ok(()) = results.changed() => {
                let result = results.borrow_and_update().clone();
                app.apply_search(result)
            }
            Some(event) = events_rx.recv() => app.apply_event(event),
            maybe_event = input.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Some(Ok(_)) => None,
                Some(Err(err)) => return Err(err.into()),
                None => Some(Action::Quit),
            },
        };
        match action {
            Some(Action::Quit) => return Ok(()),
            Some(action) => dispatch(action, services, settings),
            None => {}
        }
        if let Some(action) = app.take_search_refresh() {
            dispatch(action, services, settings);
        }
    }
}

/// Runs an action off the UI loop; results come back as [`AppEvent`]s.
fn dispatch(action: Action, services: &Services, settings: &Settings) {
    let events = services.events.clone();
    match action {
        Action::Quit => {}
        Action::SetQuery(query) => {
            services.search.set_query(&query);
        }
        Action::Refresh => {
            let scheduler = services.scheduler.clone();
            tokio::spawn(async move {
                scheduler.refresh_now().await;
            });
        }
        Action::LoadDiff(record) => {
            let worktree = services.worktree.clone();
            tokio::spawn(async move {
                let text = worktree.diff_preview(&record).await;
                let _ = events.send(AppEvent::Diff { path: record.path, text }).await;
            });
        }
        Action::Revert(record) => {
            let worktree = services.worktree.clone();
            tokio::spawn(async move {
                let outcome = worktree.revert(&record).await.map_err(|err| err.to_string());
                let _ = events
                    .send(AppEvent::Reverted {
                        path: record.path,
                        outcome,
                    })
                    .await;
            });
        }
        Action::LoadCommits => {
            let history = services.history.clone();
            let limit = settings.engine.history_limit;
            tokio::spawn(async move {
                let commits = history.list_commits(Some(limit)).await;
                let _ = events.send(AppEvent::Commits(commits)).await;
            });
        }
        Action::LoadCommitFiles(commit) => {
            let history = services.history.clone();
            tokio::spawn(async move {
                let files = history.list_changed_files(&commit).await;
                let _ = events.send(AppEvent::CommitFiles { commit, files }).await;
            });
        }
        Action::LoadPatch { commit, path } => {
            let history = services.history.clone();
            tokio::spawn(async move {
                let text = history.file_patch(&commit, &path).await;
                let _ = events.send(AppEvent::Patch { commit, path, text }).await;
            });
        }
    }
}
