use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use treepulse_core::EngineConfig;

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "treepulse", version, about = "Live view of a git working tree")]
pub struct Args {
    /// Directory inside the repository to watch.
    #[arg(long)]
    pub repo: Option<PathBuf>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
    #[arg(long)]
    pub search_debounce_ms: Option<u64>,
    /// Keep polling while a content search is running.
    #[arg(long, default_value_t = false)]
    pub poll_while_searching: bool,
    #[arg(long)]
    pub history_limit: Option<usize>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
    /// Print one snapshot as JSON and exit.
    #[arg(long, default_value_t = false)]
    pub once: bool,
}

/// `config.toml` contents; every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub poll_interval_ms: Option<u64>,
    pub search_debounce_ms: Option<u64>,
    pub skip_polling_while_searching: Option<bool>,
    pub history_limit: Option<usize>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub engine: EngineConfig,
    pub repo: PathBuf,
    pub log_file: Option<PathBuf>,
    pub debug: bool,
    pub once: bool,
}

pub fn load_settings(args: &Args) -> Result<Settings> {
    let env = |key: &str| std::env::var(key).ok();
    let path = config_path(args, env);
    let file = load_file_config(&path)?;
    let cwd = std::env::current_dir().context("cannot read current directory")?;
    resolve_settings(args, file, env, cwd)
}

pub fn config_path(args: &Args, env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = &args.config {
        return path.clone();
    }
    if let Some(path) = env("TREEPULSE_CONFIG_PATH").filter(|value| !value.trim().is_empty()) {
        return PathBuf::from(path);
    }
    config_dir(&env).join("treepulse/config.toml")
}

/// Missing file means defaults; a file that exists but does not parse is fatal.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("invalid config {}", path.display()))
}

/// Defaults, then file, then environment, then flags.
pub fn resolve_settings(
    args: &Args,
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
    cwd: PathBuf,
) -> Result<Settings> {
    let defaults = EngineConfig::default();
    let mut poll_ms = file
        .poll_interval_ms
        .unwrap_or(defaults.poll_interval.as_millis() as u64);
    let mut debounce_ms = file
        .search_debounce_ms
        .unwrap_or(defaults.search_debounce.as_millis() as u64);
    let mut skip = file
        .skip_polling_while_searching
        .unwrap_or(defaults.skip_polling_while_searching);
    let mut history_limit = file.history_limit.unwrap_or(defaults.history_limit);

    if let Some(value) = env_number::<u64>(&env, "TREEPULSE_POLL_INTERVAL_MS")? {
        poll_ms = value;
    }
    if let Some(value) = env_number::<u64>(&env, "TREEPULSE_SEARCH_DEBOUNCE_MS")? {
        debounce_ms = value;
    }
    if let Some(value) = env("TREEPULSE_SKIP_WHILE_SEARCHING").and_then(|v| parse_bool_flag(&v)) {
        skip = value;
    }
    if let Some(value) = env_number::<usize>(&env, "TREEPULSE_HISTORY_LIMIT")? {
        history_limit = value;
    }

    if let Some(value) = args.poll_interval_ms {
        poll_ms = value;
    }
    if let Some(value) = args.search_debounce_ms {
        debounce_ms = value;
    }
    if args.poll_while_searching {
        skip = false;
    }
    if let Some(value) = args.history_limit {
        history_limit = value;
    }

    let log_file = args
        .log_file
        .clone()
        .or_else(|| env("TREEPULSE_LOG_FILE").filter(|v| !v.trim().is_empty()).map(PathBuf::from))
        .or(file.log_file);

    let mut engine = EngineConfig::default()
        .with_poll_interval_ms(poll_ms)
        .with_search_debounce_ms(debounce_ms);
    engine.skip_polling_while_searching = skip;
    engine.history_limit = history_limit;

    Ok(Settings {
        engine,
        repo: args.repo.clone().unwrap_or(cwd),
        log_file,
        debug: args.debug,
        once: args.once,
    })
}

fn env_number<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env(key) {
        Some(value) if !value.trim().is_empty() => {
            let parsed = value
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a number, got {value:?}"))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn state_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = env("XDG_STATE_HOME").filter(|v| !v.trim().is_empty()) {
        return PathBuf::from(path);
    }
    home_dir(env).join(".local/state")
}

fn config_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = env("XDG_CONFIG_HOME").filter(|v| !v.trim().is_empty()) {
        return PathBuf::from(path);
    }
    home_dir(env).join(".config")
}

fn home_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let settings = resolve_settings(
            &Args::default(),
            FileConfig::default(),
            env_of(&[]),
            PathBuf::from("/work"),
        )
        .expect("settings");
        assert_eq!(settings.engine, EngineConfig::default());
        assert_eq!(settings.repo, PathBuf::from("/work"));
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn flags_beat_env_beat_file() {
        let file = FileConfig {
            poll_interval_ms: Some(5000),
            search_debounce_ms: Some(100),
            history_limit: Some(20),
            ..FileConfig::default()
        };
        let env = env_of(&[
            ("TREEPULSE_POLL_INTERVAL_MS", "750"),
            ("TREEPULSE_SKIP_WHILE_SEARCHING", "off"),
        ]);
        let args = Args {
            history_limit: Some(5),
            ..Args::default()
        };
        let settings = resolve_settings(&args, file, env, PathBuf::from("/w")).expect("settings");
        assert_eq!(settings.engine.poll_interval, Duration::from_millis(750));
        assert_eq!(settings.engine.search_debounce, Duration::from_millis(100));
        assert!(!settings.engine.skip_polling_while_searching);
        assert_eq!(settings.engine.history_limit, 5);
    }

    #[test]
    fn interval_floor_applies_after_layering() {
        let args = Args {
            poll_interval_ms: Some(0),
            ..Args::default()
        };
        let settings =
            resolve_settings(&args, FileConfig::default(), env_of(&[]), PathBuf::from("/w"))
                .expect("settings");
        assert_eq!(settings.engine.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn bad_env_number_is_an_error() {
        let env = env_of(&[("TREEPULSE_HISTORY_LIMIT", "lots")]);
        let err = resolve_settings(&Args::default(), FileConfig::default(), env, PathBuf::from("/w"))
            .expect_err("not a number");
        assert!(err.to_string().contains("TREEPULSE_HISTORY_LIMIT"));
    }

    #[test]
    fn config_path_prefers_flag_then_env_then_xdg() {
        let args = Args {
            config: Some(PathBuf::from("/explicit.toml")),
            ..Args::default()
        };
        assert_eq!(config_path(&args, env_of(&[])), PathBuf::from("/explicit.toml"));
        assert_eq!(
            config_path(&Args::default(), env_of(&[("TREEPULSE_CONFIG_PATH", "/env.toml")])),
            PathBuf::from("/env.toml")
        );
        assert_eq!(
            config_path(&Args::default(), env_of(&[("XDG_CONFIG_HOME", "/xdg")])),
            PathBuf::from("/xdg/treepulse/config.toml")
        );
        assert_eq!(
            config_path(&Args::default(), env_of(&[("HOME", "/home/me")])),
            PathBuf::from("/home/me/.config/treepulse/config.toml")
        );
    }

    #[test]
    fn file_config_missing_is_default_and_malformed_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        assert_eq!(load_file_config(&missing).expect("missing ok"), FileConfig::default());

        let good = dir.path().join("good.toml");
        fs::write(&good, "poll_interval_ms = 500\nskip_polling_while_searching = false\n")
            .expect("write");
        let parsed = load_file_config(&good).expect("parse");
        assert_eq!(parsed.poll_interval_ms, Some(500));
        assert_eq!(parsed.skip_polling_while_searching, Some(false));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "poll_interval_ms = \"soon\"\n").expect("write");
        assert!(load_file_config(&bad).is_err());
    }

    #[test]
    fn parse_bool_flag_accepts_common_spellings() {
        assert_eq!(parse_bool_flag("1"), Some(true));
        assert_eq!(parse_bool_flag(" YES "), Some(true));
        assert_eq!(parse_bool_flag("off"), Some(false));
        assert_eq!(parse_bool_flag("maybe"), None);
    }
}
