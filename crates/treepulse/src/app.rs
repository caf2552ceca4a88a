use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::sync::Arc;
use treepulse_core::{
    clamp_selection, ChangedFileRecord, CommitRecord, FileRecord, SearchResult, Snapshot,
    SnapshotView, StatusKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Changes,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFocus {
    Commits,
    Files,
}

/// Work the dashboard asks the runtime to do on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    SetQuery(String),
    Refresh,
    LoadDiff(FileRecord),
    Revert(FileRecord),
    LoadCommits,
    LoadCommitFiles(String),
    LoadPatch { commit: String, path: String },
}

/// Results of background work, fed back into [`App::apply_event`].
#[derive(Debug)]
pub enum AppEvent {
    Diff { path: String, text: String },
    Reverted { path: String, outcome: Result<(), String> },
    Commits(Vec<CommitRecord>),
    CommitFiles { commit: String, files: Vec<ChangedFileRecord> },
    Patch { commit: String, path: String, text: Option<String> },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub new: usize,
    pub modified: usize,
    pub unstaged: usize,
    pub deleted: usize,
    pub renamed: usize,
}

pub struct App {
    pub root: PathBuf,
    pub mode: Mode,
    full: Arc<Snapshot>,
    search: SearchResult,
    view: SnapshotView,
    pub query: String,
    pub editing_query: bool,
    pub searching: bool,
    pub preview: Option<(String, String)>,
    pub commits: Vec<CommitRecord>,
    pub commit_selected: Option<usize>,
    pub history_focus: HistoryFocus,
    pub commit_files: Vec<ChangedFileRecord>,
    pub file_selected: Option<usize>,
    pub patch: Option<String>,
    pub status_note: Option<String>,
    pub scroll: u16,
    pub help_open: bool,
    search_stale: bool,
}

impl App {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            mode: Mode::Changes,
            full: Arc::new(Snapshot::empty()),
            search: SearchResult::default(),
            view: SnapshotView::default(),
            query: String::new(),
            editing_query: false,
            searching: false,
            preview: None,
            commits: Vec::new(),
            commit_selected: None,
            history_focus: HistoryFocus::Commits,
            commit_files: Vec::new(),
            file_selected: None,
            patch: None,
            status_note: None,
            scroll: 0,
            help_open: false,
            search_stale: false,
        }
    }

    pub fn visible(&self) -> &Snapshot {
        self.view.snapshot()
    }

    pub fn selected(&self) -> Option<usize> {
        self.view.selected()
    }

    pub fn selected_record(&self) -> Option<&FileRecord> {
        self.view.selected_record()
    }

    pub fn total_files(&self) -> usize {
        self.full.len()
    }

    pub fn search_active(&self) -> bool {
        self.search.is_active()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for record in self.full.iter() {
            match record.status_kind {
                StatusKind::New => counts.new += 1,
                StatusKind::Modified => counts.modified += 1,
                StatusKind::Unstaged => counts.unstaged += 1,
                StatusKind::Deleted => counts.deleted += 1,
                StatusKind::Renamed => counts.renamed += 1,
                StatusKind::Unknown | StatusKind::Unchanged | StatusKind::Ignored => {}
            }
        }
        counts
    }

    /// Returns a diff request when the selected file changed identity.
    pub fn apply_snapshot(&mut self, snapshot: Arc<Snapshot>) -> Option<Action> {
        if self.search.is_active() && *self.full != *snapshot {
            self.search_stale = true;
        }
        self.full = snapshot;
        self.rebuild_view()
    }

    /// The settled match set was computed against an older snapshot; asks
    /// for the same query again so new and edited files are considered.
    pub fn take_search_refresh(&mut self) -> Option<Action> {
        if !std::mem::take(&mut self.search_stale) {
            return None;
        }
        if !self.search.is_active() || self.query.trim().is_empty() {
            return None;
        }
        Some(Action::SetQuery(self.query.clone()))
    }

    pub fn apply_search(&mut self, result: SearchResult) -> Option<Action> {
        self.search = result;
        self.rebuild_view()
    }

    fn rebuild_view(&mut self) -> Option<Action> {
        let before = self.selected_record().map(|record| record.path.clone());
        let visible = if self.search.is_active() {
            Arc::new(Snapshot::from_records(self.search.filter(&self.full)))
        } else {
            self.full.clone()
        };
        self.view.replace(visible);
        let after = self.selected_record().cloned();
        match after {
            Some(record) if before.as_deref() != Some(record.path.as_str()) => {
                Some(self.request_diff(record))
            }
            Some(_) => None,
            None => {
                self.preview = None;
                None
            }
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) -> Option<Action> {
        match event {
            AppEvent::Diff { path, text } => {
                let selected = self.selected_record().map(|record| record.path.as_str());
                if selected == Some(path.as_str()) {
                    self.preview = Some((path, text));
                }
                None
            }
            AppEvent::Reverted { path, outcome } => {
                self.status_note = Some(match outcome {
                    Ok(()) => format!("restored {path} from HEAD"),
                    Err(err) => format!("revert failed: {err}"),
                });
                Some(Action::Refresh)
            }
            AppEvent::Commits(commits) => {
                self.commits = commits;
                self.commit_selected = clamp_selection(self.commit_selected, self.commits.len());
                self.commit_files.clear();
                self.file_selected = None;
                self.patch = None;
                self.selected_commit_hash().map(Action::LoadCommitFiles)
            }
            AppEvent::CommitFiles { commit, files } => {
                if self.selected_commit_hash().as_deref() != Some(commit.as_str()) {
                    return None;
                }
                self.commit_files = files;
                self.file_selected = clamp_selection(None, self.commit_files.len());
                self.patch = None;
                self.request_patch()
            }
            AppEvent::Patch { commit, path, text } => {
                let current = self
                    .selected_commit_hash()
                    .zip(self.selected_commit_file().map(|file| file.path.clone()));
                if current == Some((commit, path)) {
                    self.patch = Some(text.unwrap_or_else(|| "Patch unavailable.".to_string()));
                    self.scroll = 0;
                }
                None
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }
        if self.editing_query {
            return self.handle_query_key(key);
        }
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return None;
        }
        if self.help_open {
            if key.code == KeyCode::Esc {
                self.help_open = false;
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('r') => {
                self.status_note = Some("refreshing".to_string());
                Some(Action::Refresh)
            }
            KeyCode::Tab => self.toggle_mode(),
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(10);
                None
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                None
            }
            _ => match self.mode {
                Mode::Changes => self.handle_changes_key(key),
                Mode::History => self.handle_history_key(key),
            },
        }
    }

    fn toggle_mode(&mut self) -> Option<Action> {
        self.scroll = 0;
        match self.mode {
            Mode::Changes => {
                self.mode = Mode::History;
                self.history_focus = HistoryFocus::Commits;
                Some(Action::LoadCommits)
            }
            Mode::History => {
                self.mode = Mode::Changes;
                None
            }
        }
    }

    fn handle_changes_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Char('g') => self.jump_selection(0),
            KeyCode::Char('G') => self.jump_selection(usize::MAX),
            KeyCode::Enter => self
                .selected_record()
                .cloned()
                .map(|record| self.request_diff(record)),
            KeyCode::Char('/') => {
                self.editing_query = true;
                None
            }
            KeyCode::Esc if !self.query.is_empty() => {
                self.query.clear();
                Some(Action::SetQuery(String::new()))
            }
            KeyCode::Char('x') => match self.selected_record().cloned() {
                Some(record) if !record.status_kind.is_tracked() => {
                    self.status_note =
                        Some(format!("{} is untracked; nothing to restore", record.path));
                    None
                }
                Some(record) => Some(Action::Revert(record)),
                None => None,
            },
            _ => None,
        }
    }

    fn handle_query_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Enter => {
                self.editing_query = false;
                None
            }
            KeyCode::Esc => {
                self.editing_query = false;
                self.query.clear();
                Some(Action::SetQuery(String::new()))
            }
            KeyCode::Backspace => {
                self.query.pop()?;
                Some(Action::SetQuery(self.query.clone()))
            }
            KeyCode::Char(ch) => {
                self.query.push(ch);
                Some(Action::SetQuery(self.query.clone()))
            }
            _ => None,
        }
    }

    fn handle_history_key(&mut self, key: KeyEvent) -> Option<Action> {
        match (self.history_focus, key.code) {
            (HistoryFocus::Commits, KeyCode::Down | KeyCode::Char('j')) => self.move_commit(1),
            (HistoryFocus::Commits, KeyCode::Up | KeyCode::Char('k')) => self.move_commit(-1),
            (HistoryFocus::Commits, KeyCode::Enter | KeyCode::Right | KeyCode::Char('l')) => {
                if self.commit_files.is_empty() {
                    return None;
                }
                self.history_focus = HistoryFocus::Files;
                None
            }
            (HistoryFocus::Files, KeyCode::Down | KeyCode::Char('j')) => self.move_commit_file(1),
            (HistoryFocus::Files, KeyCode::Up | KeyCode::Char('k')) => self.move_commit_file(-1),
            (HistoryFocus::Files, KeyCode::Esc | KeyCode::Left | KeyCode::Char('h')) => {
                self.history_focus = HistoryFocus::Commits;
                None
            }
            _ => None,
        }
    }

    fn move_selection(&mut self, delta: isize) -> Option<Action> {
        let before = self.selected();
        self.view.move_by(delta);
        self.selection_changed(before)
    }

    fn jump_selection(&mut self, index: usize) -> Option<Action> {
        let before = self.selected();
        self.view.select(index);
        self.selection_changed(before)
    }

    fn selection_changed(&mut self, before: Option<usize>) -> Option<Action> {
        if self.selected() == before {
            return None;
        }
        self.scroll = 0;
        self.selected_record().cloned().map(|record| self.request_diff(record))
    }

    fn request_diff(&mut self, record: FileRecord) -> Action {
        self.preview = None;
        self.scroll = 0;
        Action::LoadDiff(record)
    }

    fn move_commit(&mut self, delta: isize) -> Option<Action> {
        let before = self.commit_selected;
        self.commit_selected = step(self.commit_selected, delta, self.commits.len());
        if self.commit_selected == before {
            return None;
        }
        self.commit_files.clear();
        self.file_selected = None;
        self.patch = None;
        self.selected_commit_hash().map(Action::LoadCommitFiles)
    }

    fn move_commit_file(&mut self, delta: isize) -> Option<Action> {
        let before = self.file_selected;
        self.file_selected = step(self.file_selected, delta, self.commit_files.len());
        if self.file_selected == before {
            return None;
        }
        self.request_patch()
    }

    fn request_patch(&mut self) -> Option<Action> {
        let commit = self.selected_commit_hash()?;
        let path = self.selected_commit_file()?.path.clone();
        self.patch = None;
        Some(Action::LoadPatch { commit, path })
    }

    pub fn selected_commit_hash(&self) -> Option<String> {
        self.commit_selected
            .and_then(|index| self.commits.get(index))
            .map(|commit| commit.short_hash.clone())
    }

    pub fn selected_commit_file(&self) -> Option<&ChangedFileRecord> {
        self.file_selected
            .and_then(|index| self.commit_files.get(index))
    }
}

fn step(selected: Option<usize>, delta: isize, len: usize) -> Option<usize> {
    let current = selected.unwrap_or(0);
    let next = if delta.is_negative() {
        current.saturating_sub(delta.unsigned_abs())
    } else {
        current.saturating_add(delta as usize)
    };
    clamp_selection(Some(next), len)
}
