use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use super::{LogProvider, RootResolver, SearchProvider, StatusProvider, WorktreeProvider};
use crate::error::ProviderError;
use crate::model::{FileRecord, RawCommit, RawStatusReport, StatusKind};
use crate::normalize::parse_porcelain_z;

pub const LOG_FIELD_SEP: char = '\u{1f}';
pub const LOG_RECORD_SEP: char = '\u{1e}';
const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ad%x1f%s%x1e";
const LOG_DATE_FORMAT: &str = "--date=format:%Y-%m-%d %H:%M";

/// Every collaborator backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run_git(&self, cwd: &Path, args: &[&str]) -> Result<String, ProviderError> {
        self.run_git_accepting(cwd, args, &[0])
            .await
            .map(|(_, stdout)| stdout)
    }

    /// Runs git and treats every exit code in `ok_codes` as success.
    async fn run_git_accepting(
        &self,
        cwd: &Path,
        args: &[&str],
        ok_codes: &[i32],
    ) -> Result<(i32, String), ProviderError> {
        // Unquoted paths, so names read back match what later commands take.
        let output = Command::new(&self.program)
            .args(["-c", "core.quotePath=false"])
            .args(args)
            .current_dir(cwd)
            .env("GIT_OPTIONAL_LOCKS", "0")
            .kill_on_drop(true)
            .output()
            .await;
        let output = match output {
            Ok(output) => output,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ProviderError::GitMissing)
            }
            Err(err) => return Err(ProviderError::Io(err)),
        };
        let code = output.status.code().unwrap_or(-1);
        if !ok_codes.contains(&code) {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(event = "git_command_failed", args = ?args, code, stderr = %stderr);
            if stderr.contains("not a git repository") {
                return Err(ProviderError::NotRepository(cwd.to_path_buf()));
            }
            return Err(ProviderError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                stderr,
            });
        }
        Ok((code, String::from_utf8_lossy(&output.stdout).to_string()))
    }
}

#[async_trait]
impl StatusProvider for GitCli {
    async fn status(&self, root: &Path) -> Result<RawStatusReport, ProviderError> {
        let raw = self
            .run_git(
                root,
                &["status", "--porcelain=v1", "-z", "--untracked-files=all"],
            )
            .await?;
        Ok(parse_porcelain_z(&raw))
    }
}

#[async_trait]
impl SearchProvider for GitCli {
    async fn search(
        &self,
        root: &Path,
        query: &str,
        candidates: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        // An empty pathspec would search the whole tree.
        if candidates.is_empty() || query.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec![
            "grep",
            "--no-color",
            "-l",
            "-z",
            "-I",
            "-i",
            "-F",
            "--untracked",
            "-e",
            query,
            "--",
        ];
        args.extend(candidates.iter().map(String::as_str));
        let (code, stdout) = self.run_git_accepting(root, &args, &[0, 1]).await?;
        if code == 1 {
            return Ok(Vec::new());
        }
        Ok(parse_grep_output(&stdout, candidates))
    }
}

#[async_trait]
impl LogProvider for GitCli {
    async fn log(
        &self,
        root: &Path,
        limit: Option<usize>,
    ) -> Result<Vec<RawCommit>, ProviderError> {
        let limit_arg = limit.map(|limit| format!("-n{limit}"));
        let mut args = vec!["log", "--no-color", LOG_DATE_FORMAT, LOG_FORMAT];
        if let Some(limit_arg) = limit_arg.as_deref() {
            args.push(limit_arg);
        }
        let raw = self.run_git(root, &args).await?;
        Ok(parse_log_output(&raw))
    }

    async fn name_status(&self, root: &Path, commit: &str) -> Result<String, ProviderError> {
        self.run_git(
            root,
            &["show", "--no-color", "--name-status", "--format=", commit],
        )
        .await
    }

    async fn file_patch(
        &self,
        root: &Path,
        commit: &str,
        path: &str,
    ) -> Result<String, ProviderError> {
        self.run_git(root, &["show", "--no-color", "--format=", commit, "--", path])
            .await
    }
}

#[async_trait]
impl RootResolver for GitCli {
    async fn resolve_root(&self, cwd: &Path) -> PathBuf {
        match self.check_repository(cwd).await {
            Ok(root) => root,
            Err(err) => {
                debug!(event = "repo_root_fallback", cwd = %cwd.display(), error = %err);
                cwd.to_path_buf()
            }
        }
    }

    async fn check_repository(&self, cwd: &Path) -> Result<PathBuf, ProviderError> {
        let raw = self.run_git(cwd, &["rev-parse", "--show-toplevel"]).await?;
        let root = raw.trim();
        if root.is_empty() {
            return Err(ProviderError::Malformed("empty git root".to_string()));
        }
        Ok(PathBuf::from(root))
    }
}

#[async_trait]
impl WorktreeProvider for GitCli {
    async fn diff(&self, root: &Path, record: &FileRecord) -> Result<String, ProviderError> {
        let path = record.path.as_str();
        match record.status_kind {
            StatusKind::New => self
                .run_git_accepting(
                    root,
                    &["diff", "--no-color", "--no-index", "--", "/dev/null", path],
                    &[0, 1],
                )
                .await
                .map(|(_, stdout)| stdout),
            StatusKind::Unstaged => {
                self.run_git(root, &["diff", "--no-color", "--", path])
                    .await
            }
            _ => match self
                .run_git(root, &["diff", "--no-color", "HEAD", "--", path])
                .await
            {
                Ok(diff) => Ok(diff),
                // Repositories without a first commit have no HEAD to diff against.
                Err(ProviderError::CommandFailed { .. }) => {
                    self.run_git(root, &["diff", "--no-color", "--cached", "--", path])
                        .await
                }
                Err(err) => Err(err),
            },
        }
    }

    async fn restore(&self, root: &Path, path: &str) -> Result<(), ProviderError> {
        self.run_git(root, &["checkout", "HEAD", "--", path])
            .await
            .map(|_| ())
    }
}

/// Parses `git log` output written with [`LOG_FORMAT`].
pub fn parse_log_output(raw: &str) -> Vec<RawCommit> {
    let mut commits = Vec::new();
    for record in raw.split(LOG_RECORD_SEP) {
        let record = record.trim_matches(|ch: char| ch == '\n' || ch == '\r');
        if record.is_empty() {
            continue;
        }
        let mut fields = record.splitn(4, LOG_FIELD_SEP);
        let hash = fields.next().unwrap_or("").trim();
        if hash.is_empty() {
            continue;
        }
        let author = fields.next().unwrap_or("").to_string();
        let date = fields.next().unwrap_or("").to_string();
        let message = fields.next().unwrap_or("").to_string();
        commits.push(RawCommit {
            hash: hash.to_string(),
            message,
            author,
            date,
        });
    }
    commits
}

fn parse_grep_output(raw: &str, candidates: &[String]) -> Vec<String> {
    let allowed: HashSet<&str> = candidates.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    raw.split('\0')
        .map(|path| path.trim_start_matches('\n'))
        .filter(|path| !path.is_empty() && allowed.contains(path))
        .filter(|path| seen.insert(path.to_string()))
        .map(str::to_string)
        .collect()
}
