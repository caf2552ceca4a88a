use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::UNIX_EPOCH;

use crate::sort::sort_records;

pub const SHORT_HASH_LEN: usize = 7;
pub const MAX_MESSAGE_CHARS: usize = 60;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Modified,
    New,
    Deleted,
    Renamed,
    Unknown,
    Unstaged,
    Unchanged,
    Ignored,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Modified => "modified",
            StatusKind::New => "new",
            StatusKind::Deleted => "deleted",
            StatusKind::Renamed => "renamed",
            StatusKind::Unknown => "unknown",
            StatusKind::Unstaged => "unstaged",
            StatusKind::Unchanged => "unchanged",
            StatusKind::Ignored => "ignored",
        }
    }

    /// Single-column code for list views.
    pub fn short_code(&self) -> &'static str {
        match self {
            StatusKind::Modified => "M",
            StatusKind::New => "?",
            StatusKind::Deleted => "D",
            StatusKind::Renamed => "R",
            StatusKind::Unknown => "U",
            StatusKind::Unstaged => "m",
            StatusKind::Unchanged => " ",
            StatusKind::Ignored => "!",
        }
    }

    /// Whether the path exists in `HEAD` and can be restored from it.
    pub fn is_tracked(&self) -> bool {
        !matches!(
            self,
            StatusKind::New | StatusKind::Ignored | StatusKind::Unknown
        )
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "modified" => Ok(StatusKind::Modified),
            "new" | "untracked" => Ok(StatusKind::New),
            "deleted" => Ok(StatusKind::Deleted),
            "renamed" => Ok(StatusKind::Renamed),
            "unknown" => Ok(StatusKind::Unknown),
            "unstaged" => Ok(StatusKind::Unstaged),
            "unchanged" => Ok(StatusKind::Unchanged),
            "ignored" => Ok(StatusKind::Ignored),
            other => Err(format!("Unknown status kind: {other}")),
        }
    }
}

/// The Unix epoch, used wherever a modification time is unavailable.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from(UNIX_EPOCH)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub status_kind: StatusKind,
    pub modified_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, status_kind: StatusKind) -> Self {
        Self {
            path: path.into(),
            status_kind,
            modified_at: epoch(),
        }
    }

    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = modified_at;
        self
    }
}

/// Point-in-time view of the working tree.
///
/// The only way to build one is [`Snapshot::from_records`], which sorts, and
/// there are no mutable accessors: a newer poll produces a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    records: Vec<FileRecord>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<FileRecord>) -> Self {
        Self {
            records: sort_records(records),
        }
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FileRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    pub fn paths(&self) -> Vec<String> {
        self.records.iter().map(|record| record.path.clone()).collect()
    }

    pub fn position(&self, path: &str) -> Option<usize> {
        self.records.iter().position(|record| record.path == path)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatusEntry {
    pub path: String,
    pub index_flag: String,
    pub working_flag: String,
}

impl RawStatusEntry {
    pub fn new(
        path: impl Into<String>,
        index_flag: impl Into<String>,
        working_flag: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            index_flag: index_flag.into(),
            working_flag: working_flag.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePair {
    pub from: String,
    pub to: String,
}

impl RenamePair {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Categorized path lists, the alternative shape some status sources emit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatStatusLists {
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub staged: Vec<String>,
    #[serde(default)]
    pub not_added: Vec<String>,
    #[serde(default)]
    pub deleted: Vec<String>,
    #[serde(default)]
    pub renamed: Vec<RenamePair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawStatusReport {
    Entries {
        entries: Vec<RawStatusEntry>,
        renames: Vec<RenamePair>,
    },
    Flat(FlatStatusLists),
}

impl RawStatusReport {
    pub fn entries(entries: Vec<RawStatusEntry>, renames: Vec<RenamePair>) -> Self {
        RawStatusReport::Entries { entries, renames }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommit {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub short_hash: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

impl From<RawCommit> for CommitRecord {
    fn from(raw: RawCommit) -> Self {
        Self {
            short_hash: short_hash(&raw.hash),
            message: truncate_message(raw.message.trim(), MAX_MESSAGE_CHARS),
            author: raw.author,
            date: raw.date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFileRecord {
    pub path: String,
    pub raw_status_code: String,
}

pub fn short_hash(hash: &str) -> String {
    hash.trim().chars().take(SHORT_HASH_LEN).collect()
}

/// Cuts `message` to `max` characters, ending in `...` when anything was cut.
pub fn truncate_message(message: &str, max: usize) -> String {
    if message.chars().count() <= max {
        return message.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = message.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn short_hash_keeps_first_seven_chars() {
        assert_eq!(short_hash("abcdef1234567890"), "abcdef1");
        assert_eq!(short_hash("abc"), "abc");
    }

    #[test]
    fn long_message_truncates_to_exactly_sixty_chars() {
        let message = "x".repeat(75);
        let truncated = truncate_message(&message, MAX_MESSAGE_CHARS);
        assert_eq!(truncated.chars().count(), 60);
        assert!(truncated.ends_with("..."));
        assert_eq!(&truncated[..57], &message[..57]);
    }

    #[test]
    fn message_at_limit_is_untouched() {
        let message = "y".repeat(60);
        assert_eq!(truncate_message(&message, MAX_MESSAGE_CHARS), message);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let message = "é".repeat(70);
        let truncated = truncate_message(&message, MAX_MESSAGE_CHARS);
        assert_eq!(truncated.chars().count(), 60);
    }

    #[test]
    fn raw_commit_maps_to_display_record() {
        let record = CommitRecord::from(RawCommit {
            hash: "abcdef1234567890".to_string(),
            message: "fix the thing".to_string(),
            author: "dev".to_string(),
            date: "2024-02-01 10:00".to_string(),
        });
        assert_eq!(record.short_hash, "abcdef1");
        assert_eq!(record.message, "fix the thing");
    }

    #[test]
    fn status_kind_round_trips_through_str() {
        for kind in [
            StatusKind::Modified,
            StatusKind::New,
            StatusKind::Deleted,
            StatusKind::Renamed,
            StatusKind::Unknown,
            StatusKind::Unstaged,
            StatusKind::Unchanged,
            StatusKind::Ignored,
        ] {
            assert_eq!(kind.as_str().parse::<StatusKind>(), Ok(kind));
        }
        assert!("bogus".parse::<StatusKind>().is_err());
    }

    #[test]
    fn new_record_defaults_to_epoch() {
        let record = FileRecord::new("a.rs", StatusKind::New);
        assert_eq!(record.modified_at, Utc.timestamp_opt(0, 0).unwrap());
    }

    #[test]
    fn snapshot_serializes_kinds_lowercase() {
        let snapshot = Snapshot::from_records(vec![FileRecord::new("a.rs", StatusKind::Unstaged)]);
        let json = serde_json::to_string(&snapshot).expect("serialize");
        assert!(json.contains("\"unstaged\""));
    }
}
