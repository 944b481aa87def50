//! Recording doubles for exercising [`Shell`] without a real command table.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::Level;

use super::{Shell, ShellHooks};
use crate::config::ShellConfig;
use crate::convert::Value;
use crate::event::ShellStatus;
use crate::execution::{CommandOutput, ExecutionError, ExecutionStrategy, ExitShellRequest};
use crate::parser::{ParseResult, Parser};

pub(crate) type Recorded<T> = Arc<Mutex<Vec<T>>>;

/// Accepts `echo <text>`, `fail`, `quit`, `panic`, `list` and `silent`.
pub(crate) struct TestParser;

impl Parser for TestParser {
    fn parse(&self, line: &str) -> Option<ParseResult> {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "echo" => Some(ParseResult::new(
                "echo",
                vec![Some(Value::String(rest.trim().to_string()))],
            )),
            "fail" | "quit" | "panic" | "list" | "silent" => {
                Some(ParseResult::new(command, Vec::new()))
            }
            _ => None,
        }
    }
}

pub(crate) struct TestBackend {
    executed: Recorded<String>,
    pub(crate) not_ready_for: AtomicUsize,
    pub(crate) ready_checks: AtomicUsize,
    pub(crate) terminated: AtomicBool,
}

impl TestBackend {
    pub(crate) fn new(executed: Recorded<String>) -> Self {
        Self {
            executed,
            not_ready_for: AtomicUsize::new(0),
            ready_checks: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
        }
    }
}

impl ExecutionStrategy for TestBackend {
    fn is_ready_for_commands(&self) -> bool {
        self.ready_checks.fetch_add(1, Ordering::SeqCst);
        self.not_ready_for
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }

    fn execute(&self, parse_result: &ParseResult) -> Result<CommandOutput, ExecutionError> {
        self.executed
            .lock()
            .expect("lock")
            .push(parse_result.to_string());
        match parse_result.command() {
            "echo" => Ok(CommandOutput::Text(
                parse_result
                    .argument(0)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            )),
            "fail" => Err(ExecutionError::Failed("failed on purpose".into())),
            "quit" => Ok(CommandOutput::Exit(ExitShellRequest::NORMAL_EXIT)),
            "panic" => panic!("kaboom"),
            "list" => Ok(CommandOutput::Lines(vec!["a".into(), "b".into(), "c".into()])),
            _ => Ok(CommandOutput::None),
        }
    }

    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingHooks {
    search: Option<Vec<PathBuf>>,
    outputs: Recorded<String>,
    logged: Recorded<String>,
    flashes: Recorded<String>,
}

impl ShellHooks for RecordingHooks {
    fn find_resources(&self, name: &str) -> Option<Vec<PathBuf>> {
        self.search.as_ref().map(|dirs| {
            dirs.iter()
                .map(|dir| dir.join(name))
                .filter(|candidate| candidate.is_file())
                .collect()
        })
    }

    fn log_command_to_output(&self, processed_line: &str) -> io::Result<()> {
        self.logged
            .lock()
            .expect("lock")
            .push(processed_line.to_string());
        Ok(())
    }

    fn flash(&self, _level: Level, message: &str, _slot: &str) {
        self.flashes.lock().expect("lock").push(message.to_string());
    }

    fn emit_output(&self, text: &str) {
        self.outputs.lock().expect("lock").push(text.to_string());
    }
}

pub(crate) struct Harness {
    pub(crate) shell: Arc<Shell>,
    pub(crate) backend: Arc<TestBackend>,
    pub(crate) executed: Recorded<String>,
    pub(crate) statuses: Recorded<ShellStatus>,
    pub(crate) outputs: Recorded<String>,
    pub(crate) logged: Recorded<String>,
    pub(crate) flashes: Recorded<String>,
}

pub(crate) fn harness() -> Harness {
    build(None)
}

pub(crate) fn harness_with_search(dirs: Vec<PathBuf>) -> Harness {
    build(Some(dirs))
}

fn build(search: Option<Vec<PathBuf>>) -> Harness {
    let hooks = RecordingHooks {
        search,
        ..RecordingHooks::default()
    };
    let outputs = Arc::clone(&hooks.outputs);
    let logged = Arc::clone(&hooks.logged);
    let flashes = Arc::clone(&hooks.flashes);

    let executed: Recorded<String> = Arc::default();
    let backend = Arc::new(TestBackend::new(Arc::clone(&executed)));

    let config = ShellConfig {
        readiness_poll_interval: Duration::from_millis(5),
        command_log: None,
        ..ShellConfig::with_home(PathBuf::from("/nonexistent/benson"))
    };
    let shell = Shell::new(config, Box::new(TestParser), Box::new(hooks))
        .with_execution_strategy(Arc::clone(&backend) as Arc<dyn ExecutionStrategy>);

    let statuses: Recorded<ShellStatus> = Arc::default();
    let sink = Arc::clone(&statuses);
    shell.add_status_listener(Arc::new(move |_: &ShellStatus, new: &ShellStatus| {
        sink.lock().expect("lock").push(new.clone());
    }));

    Harness {
        shell: Arc::new(shell),
        backend,
        executed,
        statuses,
        outputs,
        logged,
        flashes,
    }
}
