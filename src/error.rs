use thiserror::Error;

use crate::config::ConfigError;
use crate::shell::ScriptError;

/// Errors that end the process: everything `execute_command` deliberately does not swallow.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
    #[error("Shell thread failed: {0}")]
    Thread(String),
}
