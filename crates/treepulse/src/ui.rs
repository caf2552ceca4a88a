use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use treepulse_core::{model::epoch, StatusKind};

use crate::app::{App, HistoryFocus, Mode};

#[derive(Clone, Copy)]
struct Theme {
    border: Color,
    title: Color,
    text: Color,
    muted: Color,
    accent: Color,
    added: Color,
    removed: Color,
    warn: Color,
}

fn theme() -> Theme {
    Theme {
        border: Color::Rgb(71, 85, 105),
        title: Color::Rgb(191, 219, 254),
        text: Color::Rgb(226, 232, 240),
        muted: Color::Rgb(148, 163, 184),
        accent: Color::Rgb(56, 189, 248),
        added: Color::Rgb(34, 197, 94),
        removed: Color::Rgb(239, 68, 68),
        warn: Color::Rgb(245, 158, 11),
    }
}

pub fn render(frame: &mut Frame, app: &App) {
    let theme = theme();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.size());
    frame.render_widget(render_header(app, theme), layout[0]);
    match app.mode {
        Mode::Changes => render_changes(frame, app, theme, layout[1]),
        Mode::History => render_history(frame, app, theme, layout[1]),
    }
    frame.render_widget(render_footer(app, theme), layout[2]);
    if app.help_open {
        render_help(frame, theme);
    }
}

fn render_header(app: &App, theme: Theme) -> Paragraph<'static> {
    let counts = app.counts();
    let mode = match app.mode {
        Mode::Changes => "changes",
        Mode::History => "history",
    };
    let first = Line::from(vec![
        Span::styled(
            "treepulse ",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.root.display().to_string(), Style::default().fg(theme.text)),
        Span::raw("  "),
        Span::styled(format!("[{mode}]"), Style::default().fg(theme.accent)),
    ]);
    let mut second = vec![
        Span::styled(format!("{} files", app.total_files()), Style::default().fg(theme.text)),
        Span::styled(
            format!(
                "  new:{} mod:{} uns:{} del:{} ren:{}",
                counts.new, counts.modified, counts.unstaged, counts.deleted, counts.renamed
            ),
            Style::default().fg(theme.muted),
        ),
    ];
    if app.search_active() {
        second.push(Span::styled(
            format!("  search \"{}\": {} match(es)", app.query, app.visible().len()),
            Style::default().fg(theme.accent),
        ));
    }
    if app.searching {
        second.push(Span::styled(
            "  searching…",
            Style::default().fg(theme.warn),
        ));
    }
    Paragraph::new(vec![first, Line::from(second)])
}

fn render_changes(frame: &mut Frame, app: &App, theme: Theme, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let items: Vec<ListItem> = app
        .visible()
        .iter()
        .map(|record| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<2}", record.status_kind.short_code()),
                    Style::default()
                        .fg(kind_color(record.status_kind, theme))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(record.path.clone(), Style::default().fg(theme.text)),
                Span::raw(" "),
                Span::styled(format_mtime(record.modified_at), Style::default().fg(theme.muted)),
            ]))
        })
        .collect();
    let title = if app.search_active() {
        format!(" Files {}/{} ", app.visible().len(), app.total_files())
    } else {
        format!(" Files {} ", app.total_files())
    };
    let list = List::new(items)
        .block(panel(title, theme))
        .highlight_style(Style::default().bg(Color::Rgb(30, 41, 59)).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(app.selected());
    frame.render_stateful_widget(list, columns[0], &mut state);

    let (title, body) = match (&app.preview, app.selected_record()) {
        (Some((path, text)), _) => (format!(" {path} "), diff_text(text, theme)),
        (None, Some(record)) => (
            format!(" {} ", record.path),
            Text::from(Span::styled("Loading diff…", Style::default().fg(theme.muted))),
        ),
        (None, None) => (
            " Diff ".to_string(),
            Text::from(Span::styled(
                "Working tree clean.",
                Style::default().fg(theme.muted),
            )),
        ),
    };
    frame.render_widget(
        Paragraph::new(body)
            .block(panel(title, theme))
            .wrap(Wrap { trim: false })
            .scroll((app.scroll, 0)),
        columns[1],
    );
}

fn render_history(frame: &mut Frame, app: &App, theme: Theme, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[0]);

    let commits: Vec<ListItem> = app
        .commits
        .iter()
        .map(|commit| {
            ListItem::new(Line::from(vec![
                Span::styled(commit.short_hash.clone(), Style::default().fg(theme.warn)),
                Span::raw(" "),
                Span::styled(commit.message.clone(), Style::default().fg(theme.text)),
                Span::raw(" "),
                Span::styled(
                    format!("{} {}", commit.author, commit.date),
                    Style::default().fg(theme.muted),
                ),
            ]))
        })
        .collect();
    let focus_style = |focused: bool| {
        if focused {
            Style::default().bg(Color::Rgb(30, 41, 59)).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        }
    };
    let mut commit_state = ListState::default().with_selected(app.commit_selected);
    frame.render_stateful_widget(
        List::new(commits)
            .block(panel(format!(" Commits {} ", app.commits.len()), theme))
            .highlight_style(focus_style(app.history_focus == HistoryFocus::Commits)),
        left[0],
        &mut commit_state,
    );

    let files: Vec<ListItem> = app
        .commit_files
        .iter()
        .map(|file| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<5}", file.raw_status_code),
                    Style::default().fg(theme.accent),
                ),
                Span::styled(file.path.clone(), Style::default().fg(theme.text)),
            ]))
        })
        .collect();
    let mut file_state = ListState::default().with_selected(app.file_selected);
    frame.render_stateful_widget(
        List::new(files)
            .block(panel(" Files ".to_string(), theme))
            .highlight_style(focus_style(app.history_focus == HistoryFocus::Files)),
        left[1],
        &mut file_state,
    );

    let body = match &app.patch {
        Some(patch) => diff_text(patch, theme),
        None => Text::from(Span::styled(
            "Select a commit file to view its patch.",
            Style::default().fg(theme.muted),
        )),
    };
    frame.render_widget(
        Paragraph::new(body)
            .block(panel(" Patch ".to_string(), theme))
            .wrap(Wrap { trim: false })
            .scroll((app.scroll, 0)),
        columns[1],
    );
}

fn render_footer(app: &App, theme: Theme) -> Paragraph<'static> {
    if app.editing_query {
        return Paragraph::new(Line::from(vec![
            Span::styled("/", Style::default().fg(theme.accent)),
            Span::styled(app.query.clone(), Style::default().fg(theme.text)),
            Span::styled("▏", Style::default().fg(theme.accent)),
        ]));
    }
    if let Some(note) = &app.status_note {
        return Paragraph::new(Span::styled(note.clone(), Style::default().fg(theme.warn)));
    }
    let hints = match app.mode {
        Mode::Changes => "j/k move  enter diff  / search  esc clear  x revert  r refresh  tab history  ? help  q quit",
        Mode::History => "j/k move  enter files  esc back  pgup/pgdn scroll  tab changes  q quit",
    };
    Paragraph::new(Span::styled(hints, Style::default().fg(theme.muted)))
}

fn render_help(frame: &mut Frame, theme: Theme) {
    let area = centered(frame.size(), 56, 14);
    let lines = [
        ("j / k", "move selection"),
        ("g / G", "first / last file"),
        ("enter", "show diff, open commit files"),
        ("/", "search file contents"),
        ("esc", "clear search, go back"),
        ("x", "restore file from HEAD"),
        ("r", "refresh now"),
        ("tab", "switch changes / history"),
        ("pgup / pgdn", "scroll preview"),
        ("q", "quit"),
    ]
    .iter()
    .map(|(keys, what)| {
        Line::from(vec![
            Span::styled(format!("{keys:<12}"), Style::default().fg(theme.accent)),
            Span::styled(*what, Style::default().fg(theme.text)),
        ])
    })
    .collect::<Vec<_>>();
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(panel(" Keys ".to_string(), theme)),
        area,
    );
}

fn panel(title: String, theme: Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(Span::styled(title, Style::default().fg(theme.title)))
}

fn diff_text(raw: &str, theme: Theme) -> Text<'static> {
    let lines: Vec<Line> = raw
        .lines()
        .map(|line| {
            let color = if line.starts_with("+++") || line.starts_with("---") {
                theme.muted
            } else if line.starts_with('+') {
                theme.added
            } else if line.starts_with('-') {
                theme.removed
            } else if line.starts_with("@@") {
                theme.accent
            } else {
                theme.text
            };
            Line::from(Span::styled(line.to_string(), Style::default().fg(color)))
        })
        .collect();
    Text::from(lines)
}

fn kind_color(kind: StatusKind, theme: Theme) -> Color {
    match kind {
        StatusKind::New => theme.added,
        StatusKind::Deleted => theme.removed,
        StatusKind::Renamed => theme.accent,
        StatusKind::Modified => theme.warn,
        StatusKind::Unstaged => theme.title,
        StatusKind::Unknown | StatusKind::Unchanged | StatusKind::Ignored => theme.muted,
    }
}

fn format_mtime(at: DateTime<Utc>) -> String {
    if at == epoch() {
        return "-".to_string();
    }
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
