//! Raw status report → one canonical [`FileRecord`] per path.
//!
//! Resolution is first-match-wins, both inside a single entry (rule order)
//! and across entries (the first entry that resolves a path owns it). Input
//! order is preserved; final ordering is the sorter's job.

use std::collections::HashSet;

use crate::model::{
    FileRecord, FlatStatusLists, RawStatusEntry, RawStatusReport, RenamePair, StatusKind,
};

pub fn normalize(report: &RawStatusReport) -> Vec<FileRecord> {
    match report {
        RawStatusReport::Entries { entries, renames } => normalize_entries(entries, renames),
        RawStatusReport::Flat(lists) => normalize_flat(lists),
    }
}

pub fn normalize_entries(entries: &[RawStatusEntry], renames: &[RenamePair]) -> Vec<FileRecord> {
    let renamed = rename_paths(renames);
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for entry in entries {
        if seen.contains(entry.path.as_str()) {
            continue;
        }
        let Some(kind) = resolve_entry(entry, &renamed) else {
            continue;
        };
        seen.insert(entry.path.clone());
        records.push(FileRecord::new(entry.path.clone(), kind));
    }
    records
}

/// Applies the rule table to one entry; `None` means no canonical status.
pub fn resolve_entry(entry: &RawStatusEntry, renamed: &HashSet<&str>) -> Option<StatusKind> {
    let index = entry.index_flag.trim();
    let working = entry.working_flag.trim();

    if renamed.contains(entry.path.as_str()) {
        return Some(StatusKind::Renamed);
    }
    if index.contains('D') || working.contains('D') {
        return Some(StatusKind::Deleted);
    }
    if index == "?" && working == "?" {
        return Some(StatusKind::New);
    }
    if index.contains('A') && index != "?" {
        return Some(StatusKind::Modified);
    }
    if (index.is_empty() || index == "M") && working.contains('M') {
        return Some(StatusKind::Unstaged);
    }
    None
}

/// Flat lists go through the same priority table as flag tuples:
/// renamed > deleted > new > modified (staged) > unstaged.
pub fn normalize_flat(lists: &FlatStatusLists) -> Vec<FileRecord> {
    let renamed = rename_paths(&lists.renamed);
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    let mut push = |path: &str, kind: StatusKind| {
        if path.is_empty() || !seen.insert(path.to_string()) {
            return;
        }
        let kind = if renamed.contains(path) {
            StatusKind::Renamed
        } else {
            kind
        };
        records.push(FileRecord::new(path, kind));
    };

    for pair in &lists.renamed {
        push(&pair.to, StatusKind::Renamed);
    }
    for path in &lists.deleted {
        push(path, StatusKind::Deleted);
    }
    for path in &lists.not_added {
        push(path, StatusKind::New);
    }
    for path in &lists.staged {
        push(path, StatusKind::Modified);
    }
    for path in &lists.modified {
        push(path, StatusKind::Unstaged);
    }
    records
}

fn rename_paths(renames: &[RenamePair]) -> HashSet<&str> {
    let mut paths = HashSet::new();
    for pair in renames {
        if !pair.from.is_empty() {
            paths.insert(pair.from.as_str());
        }
        if !pair.to.is_empty() {
            paths.insert(pair.to.as_str());
        }
    }
    paths
}

/// Decodes `git status --porcelain=v1 -z` output.
///
/// Records are NUL separated, `XY path`; rename and copy records are followed
/// by one extra field holding the origin path.
pub fn parse_porcelain_z(output: &str) -> RawStatusReport {
    let mut entries = Vec::new();
    let mut renames = Vec::new();
    let mut fields = output.split('\0');
    while let Some(field) = fields.next() {
        let Some((index_flag, working_flag, path)) = split_status_field(field) else {
            continue;
        };
        let renamed = index_flag == "R" || working_flag == "R";
        if renamed || index_flag == "C" || working_flag == "C" {
            let origin = fields.next().unwrap_or("");
            if renamed && !origin.is_empty() {
                renames.push(RenamePair::new(origin, path.clone()));
            }
        }
        entries.push(RawStatusEntry {
            path,
            index_flag,
            working_flag,
        });
    }
    RawStatusReport::Entries { entries, renames }
}

fn split_status_field(field: &str) -> Option<(String, String, String)> {
    if field.len() < 4 || !field.is_char_boundary(2) || !field.is_char_boundary(3) {
        return None;
    }
    let mut chars = field.chars();
    let x = chars.next()?;
    let y = chars.next()?;
    if chars.next()? != ' ' {
        return None;
    }
    let path = &field[3..];
    if path.is_empty() {
        return None;
    }
    Some((flag(x), flag(y), path.to_string()))
}

fn flag(ch: char) -> String {
    if ch == ' ' {
        String::new()
    } else {
        ch.to_string()
    }
}
