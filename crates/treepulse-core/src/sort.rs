use std::cmp::Ordering;

use crate::model::FileRecord;

/// Newest first; equal timestamps fall back to [`locale_cmp`] on the path.
pub fn sort_records(mut records: Vec<FileRecord>) -> Vec<FileRecord> {
    records.sort_by(|a, b| {
        b.modified_at
            .cmp(&a.modified_at)
            .then_with(|| locale_cmp(&a.path, &b.path))
    });
    records
}

/// Dictionary-style ordering: case-insensitive first, then byte order so the
/// result is total and never depends on input order.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusKind;
    use chrono::{TimeZone, Utc};

    fn record(path: &str, secs: i64) -> FileRecord {
        FileRecord::new(path, StatusKind::Unstaged)
            .with_modified_at(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn paths(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|record| record.path.as_str()).collect()
    }

    #[test]
    fn newest_first_then_path() {
        let sorted = sort_records(vec![
            record("b.rs", 100),
            record("c.rs", 300),
            record("a.rs", 100),
            record("d.rs", 0),
        ]);
        assert_eq!(paths(&sorted), vec!["c.rs", "a.rs", "b.rs", "d.rs"]);
    }

    #[test]
    fn ordering_ignores_input_order() {
        let forward = vec![record("x", 5), record("y", 5), record("z", 9), record("w", 1)];
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(sort_records(forward), sort_records(reversed));
    }

    #[test]
    fn sorted_output_is_monotonic() {
        let sorted = sort_records(vec![
            record("src/b.rs", 3),
            record("README.md", 3),
            record("src/a.rs", 7),
            record("Cargo.toml", 3),
            record("docs/x.md", 1),
        ]);
        for pair in sorted.windows(2) {
            assert!(pair[0].modified_at >= pair[1].modified_at);
            if pair[0].modified_at == pair[1].modified_at {
                assert_ne!(locale_cmp(&pair[0].path, &pair[1].path), Ordering::Greater);
            }
        }
    }

    #[test]
    fn locale_cmp_folds_case_before_bytes() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("Readme", "readme"), Ordering::Less);
        assert_eq!(locale_cmp("same", "same"), Ordering::Equal);
    }
}
