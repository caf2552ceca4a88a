use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use treepulse_core::providers::{GitCli, SearchProvider, TokioFs};
use treepulse_core::{
    ensure_repository, EngineError, FileRecord, HistoryReader, Pipeline, StatusKind, Worktree,
};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Treepulse Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Builds a repository with one commit and one working-tree change of each kind.
fn seeded_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    git(root, &["init", "-q"]);
    for name in ["edited.txt", "gone.txt", "moved.txt", "staged.txt", "café.txt"] {
        fs::write(root.join(name), format!("{name} original\n")).expect("write");
    }
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "initial import"]);

    fs::write(root.join("edited.txt"), "edited with a Needle\n").expect("edit");
    fs::remove_file(root.join("gone.txt")).expect("remove");
    git(root, &["mv", "moved.txt", "renamed.txt"]);
    fs::write(root.join("added.txt"), "brand new\n").expect("add");
    git(root, &["add", "added.txt"]);
    fs::write(root.join("scratch.txt"), "needle in untracked file\n").expect("untracked");
    dir
}

#[tokio::test]
async fn real_repository_round_trip() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let dir = seeded_repo();
    let git_cli = GitCli::new();
    let root = ensure_repository(&git_cli, dir.path())
        .await
        .expect("inside a repository");

    let pipeline = Pipeline::new(root.clone(), Arc::new(git_cli.clone()), Arc::new(TokioFs));
    let snapshot = pipeline.run().await;
    let kinds: HashMap<&str, StatusKind> = snapshot
        .iter()
        .map(|record| (record.path.as_str(), record.status_kind))
        .collect();
    assert_eq!(kinds.get("edited.txt"), Some(&StatusKind::Unstaged));
    assert_eq!(kinds.get("gone.txt"), Some(&StatusKind::Deleted));
    assert_eq!(kinds.get("renamed.txt"), Some(&StatusKind::Renamed));
    assert_eq!(kinds.get("added.txt"), Some(&StatusKind::Modified));
    assert_eq!(kinds.get("scratch.txt"), Some(&StatusKind::New));
    assert!(!kinds.contains_key("moved.txt"));
    assert!(!kinds.contains_key("staged.txt"));

    let gone = snapshot
        .iter()
        .find(|record| record.path == "gone.txt")
        .expect("deleted file listed");
    assert_eq!(gone.modified_at.timestamp(), 0);
    assert_eq!(snapshot.records().last().map(|r| r.path.as_str()), Some("gone.txt"));

    let mut hits = git_cli
        .search(&root, "needle", &snapshot.paths())
        .await
        .expect("grep");
    hits.sort();
    assert_eq!(hits, vec!["edited.txt".to_string(), "scratch.txt".to_string()]);

    let history = HistoryReader::new(root.clone(), Arc::new(git_cli.clone()), 10);
    let commits = history.list_commits(None).await;
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].short_hash.len(), 7);
    assert_eq!(commits[0].message, "initial import");
    assert_eq!(commits[0].author, "Treepulse Test");
    let files = history.list_changed_files(&commits[0].short_hash).await;
    assert_eq!(files.len(), 5);
    assert!(files.iter().all(|file| file.raw_status_code == "A"));
    assert!(files.iter().any(|file| file.path == "café.txt"));
    let accented = history
        .file_patch(&commits[0].short_hash, "café.txt")
        .await
        .expect("patch for non-ascii path");
    assert!(accented.contains("+café.txt original"));
    let patch = history
        .file_patch(&commits[0].short_hash, "gone.txt")
        .await
        .expect("patch");
    assert!(patch.contains("+gone.txt original"));

    let worktree = Worktree::new(root.clone(), Arc::new(git_cli.clone()));
    let edited = FileRecord::new("edited.txt", StatusKind::Unstaged);
    assert!(worktree.diff_preview(&edited).await.contains("+edited with a Needle"));
    let scratch = FileRecord::new("scratch.txt", StatusKind::New);
    assert!(worktree
        .diff_preview(&scratch)
        .await
        .contains("+needle in untracked file"));
    assert!(worktree.revert(&scratch).await.is_err());

    worktree.revert(&edited).await.expect("revert");
    let after = pipeline.run().await;
    assert!(after.position("edited.txt").is_none());
    assert_eq!(
        fs::read_to_string(root.join("edited.txt")).expect("read"),
        "edited.txt original\n"
    );
}

#[tokio::test]
async fn plain_directory_is_not_a_repository() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let dir = tempfile::tempdir().expect("tempdir");
    let err = ensure_repository(&GitCli::new(), dir.path())
        .await
        .expect_err("not a repository");
    assert!(matches!(err, EngineError::NotRepository(_)));
}
