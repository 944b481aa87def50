use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::convert::ConversionError;
use crate::parser::{CommandTable, ParseResult};
use crate::shell::ScriptError;

/// Asks the hosting loop to stop reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitShellRequest {
    exit_code: i32,
}

impl ExitShellRequest {
    pub const NORMAL_EXIT: ExitShellRequest = ExitShellRequest { exit_code: 0 };
    pub const FATAL_EXIT: ExitShellRequest = ExitShellRequest { exit_code: 1 };

    pub fn new(exit_code: i32) -> Self {
        Self { exit_code }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

/// What a command hands back to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Nothing to show.
    None,
    Text(String),
    /// Shown one item at a time, in order.
    Lines(Vec<String>),
    Exit(ExitShellRequest),
}

impl From<String> for CommandOutput {
    fn from(text: String) -> Self {
        CommandOutput::Text(text)
    }
}

impl From<Vec<String>> for CommandOutput {
    fn from(lines: Vec<String>) -> Self {
        CommandOutput::Lines(lines)
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("command '{0}' is not registered")]
    UnknownCommand(String),
    #[error("execution strategy has been terminated")]
    Terminated,
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs resolved commands on behalf of the shell.
pub trait ExecutionStrategy: Send + Sync {
    fn is_ready_for_commands(&self) -> bool;

    fn execute(&self, parse_result: &ParseResult) -> Result<CommandOutput, ExecutionError>;

    /// Releases anything the strategy holds. Called once the shell has been asked to exit.
    fn terminate(&self);
}

/// Invokes the handler registered in a [`CommandTable`] for each parse result.
pub struct SimpleExecutionStrategy {
    table: Arc<CommandTable>,
    ready: AtomicBool,
    terminated: AtomicBool,
}

impl SimpleExecutionStrategy {
    pub fn new(table: Arc<CommandTable>) -> Self {
        Self {
            table,
            ready: AtomicBool::new(true),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl ExecutionStrategy for SimpleExecutionStrategy {
    // Stays ready after termination so late commands fail instead of waiting forever.
    fn is_ready_for_commands(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn execute(&self, parse_result: &ParseResult) -> Result<CommandOutput, ExecutionError> {
        if self.is_terminated() {
            return Err(ExecutionError::Terminated);
        }
        let command = self
            .table
            .get(parse_result.command())
            .ok_or_else(|| ExecutionError::UnknownCommand(parse_result.command().to_string()))?;
        (command.handler())(parse_result)
    }

    fn terminate(&self) {
        if !self.terminated.swap(true, Ordering::SeqCst) {
            debug!("execution strategy terminated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CommandSpec;

    fn strategy() -> SimpleExecutionStrategy {
        let mut table = CommandTable::new();
        table.add(CommandSpec::new(&["greet"], "Says hello", |_| {
            Ok(CommandOutput::Text("hello".into()))
        }));
        table.add(CommandSpec::new(&["fail"], "Always fails", |_| {
            Err(ExecutionError::Failed("boom".into()))
        }));
        SimpleExecutionStrategy::new(Arc::new(table))
    }

    #[test]
    fn test_execute_dispatches_to_handler() {
        let s = strategy();
        let output = s.execute(&ParseResult::new("greet", vec![])).expect("execute");
        assert_eq!(output, CommandOutput::Text("hello".into()));

        let err = s.execute(&ParseResult::new("fail", vec![])).expect_err("fail");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_unknown_command() {
        let err = strategy()
            .execute(&ParseResult::new("nope", vec![]))
            .expect_err("unknown");
        assert!(matches!(err, ExecutionError::UnknownCommand(name) if name == "nope"));
    }

    #[test]
    fn test_terminate() {
        let s = strategy();
        assert!(s.is_ready_for_commands());
        s.terminate();
        s.terminate();
        assert!(s.is_terminated());
        assert!(s.is_ready_for_commands());
        assert!(matches!(
            s.execute(&ParseResult::new("greet", vec![])),
            Err(ExecutionError::Terminated)
        ));
    }

    #[test]
    fn test_readiness_toggle() {
        let s = strategy();
        s.set_ready(false);
        assert!(!s.is_ready_for_commands());
        s.set_ready(true);
        assert!(s.is_ready_for_commands());
    }

    #[test]
    fn test_exit_request_codes() {
        assert_eq!(ExitShellRequest::NORMAL_EXIT.exit_code(), 0);
        assert_eq!(ExitShellRequest::FATAL_EXIT.exit_code(), 1);
        assert_eq!(ExitShellRequest::new(3).exit_code(), 3);
    }
}
