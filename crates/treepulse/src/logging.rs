use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::state_dir;

/// Installs the global subscriber. The terminal belongs to the dashboard, so
/// events go to an append-only file, or nowhere if the file cannot be opened.
/// Returns the path actually written to.
pub fn init_logging(debug: bool, log_file: Option<&Path>) -> Option<PathBuf> {
    let level = if debug {
        "debug".to_string()
    } else if let Ok(level) = std::env::var("TREEPULSE_LOG_LEVEL") {
        level
    } else {
        "info".to_string()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let path = log_file
        .map(Path::to_path_buf)
        .unwrap_or_else(default_log_path);
    let (writer, opened) = match open_log_file(&path) {
        Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), Some(path)),
        Err(_) => (BoxMakeWriter::new(io::sink), None),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .try_init();
    opened
}

fn default_log_path() -> PathBuf {
    let env = |key: &str| std::env::var(key).ok();
    state_dir(&env).join("treepulse/treepulse.log")
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_created_with_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/dir/treepulse.log");
        open_log_file(&path).expect("open");
        assert!(path.exists());
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").expect("write");
        assert!(open_log_file(&blocker.join("treepulse.log")).is_err());
    }
}
