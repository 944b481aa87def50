use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

const RC_FILE: &str = ".bensonrc";
const HOME_DIR: &str = ".benson";
const HOME_ENV: &str = "BENSON_HOME";

pub const DEFAULT_PROMPT: &str = "benson> ";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,
    #[error("Config file not found: {}", .0.display())]
    ConfigFileNotFound(PathBuf),
    #[error("{}:{line}: unknown key '{key}'", path.display())]
    UnknownKey {
        path: PathBuf,
        line: usize,
        key: String,
    },
    #[error("{}:{line}: {message}", path.display())]
    InvalidValue {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("Path '{}' must be a directory, or it must not exist", .0.display())]
    NotADirectory(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runtime settings for a shell and its console.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellConfig {
    pub home: PathBuf,
    pub prompt: String,
    pub readiness_poll_interval: Duration,
    pub history_file: PathBuf,
    pub history_size: usize,
    pub command_log: Option<PathBuf>,
    pub script_search_path: Vec<PathBuf>,
}

impl ShellConfig {
    /// Defaults rooted at `home`.
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            history_file: home.join("history"),
            command_log: Some(home.join("log.benson")),
            home,
            prompt: DEFAULT_PROMPT.to_string(),
            readiness_poll_interval: Duration::from_millis(500),
            history_size: 1000,
            script_search_path: Vec::new(),
        }
    }

    /// Defaults for the current user: `$BENSON_HOME`, or `~/.benson`.
    pub fn new() -> Result<Self, ConfigError> {
        let home = match env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => PathBuf::from(home),
            _ => user_home()?.join(HOME_DIR),
        };
        Ok(Self::with_home(home))
    }

    /// Defaults overlaid with an rc file. An explicit `path` must exist; the default
    /// `~/.bensonrc` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let rc_path = match path {
            Some(path) => path.to_path_buf(),
            None => user_home()?.join(RC_FILE),
        };
        Self::new()?.overlay(&rc_path, path.is_some())
    }

    /// Applies the rc file at `rc_path`. A missing file is an error only when `required`.
    fn overlay(mut self, rc_path: &Path, required: bool) -> Result<Self, ConfigError> {
        if !rc_path.exists() {
            if required {
                return Err(ConfigError::ConfigFileNotFound(rc_path.to_path_buf()));
            }
            return Ok(self);
        }
        let content = fs::read_to_string(rc_path)?;
        self.apply(&content, rc_path)?;
        Ok(self)
    }

    /// Applies `key = value` lines. `home` is applied first so the paths derived from it
    /// follow it unless they are set explicitly.
    pub fn apply(&mut self, content: &str, source: &Path) -> Result<(), ConfigError> {
        let mut entries = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                path: source.to_path_buf(),
                line: index + 1,
                message: format!("expected 'key = value', found '{}'", line),
            })?;
            entries.push((index + 1, key.trim(), unquote(value.trim())));
        }

        if let Some((_, _, home)) = entries.iter().rev().find(|(_, key, _)| *key == "home") {
            let explicit = self.clone();
            *self = Self::with_home(expand_tilde(home)?);
            self.prompt = explicit.prompt;
            self.readiness_poll_interval = explicit.readiness_poll_interval;
            self.history_size = explicit.history_size;
            self.script_search_path = explicit.script_search_path;
        }

        for (line, key, value) in entries {
            self.set(key, value).map_err(|e| match e {
                SetError::UnknownKey => ConfigError::UnknownKey {
                    path: source.to_path_buf(),
                    line,
                    key: key.to_string(),
                },
                SetError::Invalid(message) => ConfigError::InvalidValue {
                    path: source.to_path_buf(),
                    line,
                    message,
                },
            })?;
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SetError> {
        match key {
            "home" => {}
            "prompt" => self.prompt = value.to_string(),
            "poll_interval_ms" => {
                let millis: u64 = value
                    .parse()
                    .map_err(|e| SetError::Invalid(format!("poll_interval_ms: {}", e)))?;
                self.readiness_poll_interval = Duration::from_millis(millis);
            }
            "history_file" => self.history_file = expand_tilde(value).map_err(SetError::from)?,
            "history_size" => {
                self.history_size = value
                    .parse()
                    .map_err(|e| SetError::Invalid(format!("history_size: {}", e)))?;
            }
            "command_log" if value.is_empty() => self.command_log = None,
            "command_log" => self.command_log = Some(expand_tilde(value).map_err(SetError::from)?),
            "script_path" => {
                self.script_search_path = env::split_paths(value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(|p| expand_tilde(&p.to_string_lossy()))
                    .collect::<Result<_, _>>()
                    .map_err(SetError::from)?;
            }
            _ => return Err(SetError::UnknownKey),
        }
        Ok(())
    }

    /// The configured home, created if absent.
    pub fn ensure_home(&self) -> Result<PathBuf, ConfigError> {
        if self.home.exists() && !self.home.is_dir() {
            return Err(ConfigError::NotADirectory(self.home.clone()));
        }
        fs::create_dir_all(&self.home)?;
        Ok(self.home.clone())
    }
}

enum SetError {
    UnknownKey,
    Invalid(String),
}

impl From<ConfigError> for SetError {
    fn from(e: ConfigError) -> Self {
        SetError::Invalid(e.to_string())
    }
}

fn user_home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)
}

fn expand_tilde(value: &str) -> Result<PathBuf, ConfigError> {
    match value.strip_prefix('~') {
        Some("") => user_home(),
        Some(rest) if rest.starts_with('/') => Ok(user_home()?.join(&rest[1..])),
        _ => Ok(PathBuf::from(value)),
    }
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
