//! The command dispatch engine.
//!
//! [`Shell::execute_command`] takes one raw line through comment stripping, parsing, the
//! readiness gate, execution and result handling, publishing a [`ShellStatus`] at each step.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::thread;

use log::{debug, error, Level};
use thiserror::Error;

use crate::config::{ConfigError, ShellConfig};
use crate::convert::{Completion, ConverterRegistry, CurrentDirectory};
use crate::event::{ShellStatus, ShellStatusListener, ShellStatusPublisher, Status};
use crate::execution::{
    CommandOutput, ExecutionError, ExecutionStrategy, ExitShellRequest, SimpleExecutionStrategy,
};
use crate::parser::{CommandSpec, ParseResult, Parser, SimpleParser};

mod builtin;
mod comment;
mod hooks;
mod script;
#[cfg(test)]
mod testing;

pub use comment::CommentError;
pub use hooks::{DefaultHooks, FileHooks, ShellHooks};
pub use script::ScriptError;

use comment::{BlockComment, Normalized};

const FLASH_SLOT: &str = "benson::shell";

#[derive(Debug, Error)]
enum DispatchError {
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("could not log command: {0}")]
    Log(#[from] std::io::Error),
    #[error("command panicked: {0}")]
    Panicked(String),
}

/// The line and parse result known so far, reported if the attempt fails.
struct Attempt {
    line: String,
    parse_result: Option<ParseResult>,
}

pub struct Shell {
    config: ShellConfig,
    parser: Box<dyn Parser>,
    execution: RwLock<Option<Arc<dyn ExecutionStrategy>>>,
    hooks: Box<dyn ShellHooks>,
    status: ShellStatusPublisher,
    comments: BlockComment,
    exit_request: Mutex<Option<ExitShellRequest>>,
    prompt: Mutex<String>,
}

impl Shell {
    /// A shell with no execution strategy bound yet; commands wait at the readiness gate
    /// until [`bind_execution_strategy`](Self::bind_execution_strategy) is called.
    pub fn new(config: ShellConfig, parser: Box<dyn Parser>, hooks: Box<dyn ShellHooks>) -> Self {
        let prompt = config.prompt.clone();
        Self {
            config,
            parser,
            execution: RwLock::new(None),
            hooks,
            status: ShellStatusPublisher::new(),
            comments: BlockComment::default(),
            exit_request: Mutex::new(None),
            prompt: Mutex::new(prompt),
        }
    }

    pub fn with_execution_strategy(self, execution: Arc<dyn ExecutionStrategy>) -> Self {
        self.bind_execution_strategy(execution);
        self
    }

    /// The stock shell: built-in commands plus `extra`, parsed by a [`SimpleParser`] over the
    /// default converters and run by a [`SimpleExecutionStrategy`].
    pub fn standard(
        config: ShellConfig,
        hooks: Box<dyn ShellHooks>,
        extra: Vec<CommandSpec>,
    ) -> Arc<Shell> {
        Arc::new_cyclic(|shell: &Weak<Shell>| {
            let mut table = builtin::commands(shell.clone());
            for command in extra {
                table.add(command);
            }
            builtin::add_help(&mut table);

            let table = Arc::new(table);
            let converters = Arc::new(ConverterRegistry::with_defaults(Box::new(CurrentDirectory)));
            let parser = SimpleParser::new(Arc::clone(&table), converters);
            let execution = Arc::new(SimpleExecutionStrategy::new(table));
            Shell::new(config, Box::new(parser), hooks).with_execution_strategy(execution)
        })
    }

    pub fn bind_execution_strategy(&self, execution: Arc<dyn ExecutionStrategy>) {
        *self.execution.write().unwrap_or_else(PoisonError::into_inner) = Some(execution);
    }

    fn execution_strategy(&self) -> Option<Arc<dyn ExecutionStrategy>> {
        self.execution
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn add_status_listener(&self, listener: Arc<dyn ShellStatusListener>) {
        self.status.add_listener(listener);
    }

    pub fn remove_status_listener(&self, listener: &Arc<dyn ShellStatusListener>) -> bool {
        self.status.remove_listener(listener)
    }

    pub fn shell_status(&self) -> ShellStatus {
        self.status.shell_status()
    }

    pub(crate) fn set_shell_status(&self, status: Status) {
        self.status.set_shell_status(status);
    }

    pub fn exit_shell_request(&self) -> Option<ExitShellRequest> {
        *self.exit_request.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn in_block_comment(&self) -> bool {
        self.comments.is_open()
    }

    pub fn prompt(&self) -> String {
        self.prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Prefixes the configured prompt with `path`; an empty path restores the bare prompt.
    pub fn set_prompt_path(&self, path: &str) {
        let prompt = if path.is_empty() {
            self.config.prompt.clone()
        } else {
            format!("{} {}", path, self.config.prompt)
        };
        *self.prompt.lock().unwrap_or_else(PoisonError::into_inner) = prompt;
    }

    /// The shell's home directory, created on first use.
    pub fn home(&self) -> Result<PathBuf, ConfigError> {
        self.config.ensure_home()
    }

    pub fn flash(&self, level: Level, message: &str, slot: &str) {
        self.hooks.flash(level, message, slot);
    }

    pub fn complete(&self, buffer: &str, cursor: usize) -> (usize, Vec<Completion>) {
        self.parser.complete(buffer, cursor)
    }

    /// Runs one line.
    ///
    /// Returns `true` if the line executed, or was blank or commented out; `false` if it was
    /// rejected by the parser or failed. Failures never escape this call.
    pub fn execute_command(&self, line: &str) -> bool {
        self.status.set_shell_status(Status::Parsing);
        let execution = self.await_execution_strategy();

        let mut attempt = Attempt {
            line: line.to_string(),
            parse_result: None,
        };
        // Parser, backend and hooks are all foreign code; nothing they do may unwind past here.
        let dispatched = guarded(|| self.dispatch(&mut attempt, execution.as_ref()))
            .unwrap_or_else(|message| Err(DispatchError::Panicked(message)));
        let accepted = match dispatched {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("{}", e);
                self.status.set_outcome(
                    Status::ExecutionFailed,
                    &attempt.line,
                    attempt.parse_result.take(),
                );
                match guarded(|| self.hooks.log_command_if_required(&attempt.line, false)) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => debug!("could not log failed command: {}", e),
                    Err(message) => debug!("command log hook panicked: {}", message),
                }
                false
            }
        };

        self.status.set_shell_status(Status::UserInput);
        accepted
    }

    /// Blocks until an execution strategy is bound and ready, flashing a notice while it waits.
    /// A wake from [`Thread::unpark`](std::thread::Thread::unpark) just triggers an early recheck.
    fn await_execution_strategy(&self) -> Arc<dyn ExecutionStrategy> {
        let mut flashed = false;
        loop {
            if let Some(execution) = self.execution_strategy() {
                if execution.is_ready_for_commands() {
                    if flashed {
                        self.hooks.flash(Level::Info, "", FLASH_SLOT);
                    }
                    return execution;
                }
            }
            thread::park_timeout(self.config.readiness_poll_interval);
            if !flashed {
                self.hooks
                    .flash(Level::Info, "Please wait - still loading", FLASH_SLOT);
                flashed = true;
            }
        }
    }

    fn dispatch(
        &self,
        attempt: &mut Attempt,
        execution: &dyn ExecutionStrategy,
    ) -> Result<bool, DispatchError> {
        let line = match self.comments.normalize(&attempt.line)? {
            Normalized::Absorbed => return Ok(true),
            Normalized::Line(line) => line,
        };
        attempt.line.clone_from(&line);

        if line.trim().is_empty() {
            self.status.set_shell_status(Status::ExecutionSuccess);
            return Ok(true);
        }

        let Some(parse_result) = self.parser.parse(&line) else {
            return Ok(false);
        };
        attempt.parse_result = Some(parse_result.clone());

        self.status.set_shell_status(Status::Executing);
        let output = execution.execute(&parse_result)?;
        self.status.set_shell_status(Status::ExecutionResultProcessing);
        self.process_output(output, execution);

        self.hooks.log_command_if_required(&line, true)?;
        self.status
            .set_outcome(Status::ExecutionSuccess, &line, Some(parse_result));
        Ok(true)
    }

    fn process_output(&self, output: CommandOutput, execution: &dyn ExecutionStrategy) {
        match output {
            CommandOutput::Exit(request) => {
                *self.exit_request.lock().unwrap_or_else(PoisonError::into_inner) = Some(request);
                // The strategy gets to release its workers before the host shuts down.
                execution.terminate();
            }
            CommandOutput::Lines(lines) => {
                for line in &lines {
                    self.hooks.emit_output(line);
                }
            }
            CommandOutput::Text(text) => self.hooks.emit_output(&text),
            CommandOutput::None => {}
        }
    }
}

/// Runs `run`, turning a panic into its message.
fn guarded<T>(run: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(run)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
