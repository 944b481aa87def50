use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::parser::ParseResult;

/// The states a shell moves through while it runs.
///
/// `ShuttingDown` is the last status a host publishes; nothing follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Starting,
    Started,
    UserInput,
    Parsing,
    Executing,
    ExecutionResultProcessing,
    ExecutionSuccess,
    ExecutionFailed,
    ShuttingDown,
}

impl Status {
    /// Whether this status closes out an attempted command.
    pub fn is_outcome(self) -> bool {
        matches!(self, Status::ExecutionSuccess | Status::ExecutionFailed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Starting => "STARTING",
            Status::Started => "STARTED",
            Status::UserInput => "USER_INPUT",
            Status::Parsing => "PARSING",
            Status::Executing => "EXECUTING",
            Status::ExecutionResultProcessing => "EXECUTION_RESULT_PROCESSING",
            Status::ExecutionSuccess => "EXECUTION_SUCCESS",
            Status::ExecutionFailed => "EXECUTION_FAILED",
            Status::ShuttingDown => "SHUTTING_DOWN",
        };
        f.write_str(name)
    }
}

/// One immutable status transition.
///
/// `message` and `parse_result` are only ever populated for outcome transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellStatus {
    status: Status,
    message: String,
    parse_result: Option<ParseResult>,
}

impl ShellStatus {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            message: String::new(),
            parse_result: None,
        }
    }

    pub(crate) fn outcome(status: Status, message: &str, parse_result: Option<ParseResult>) -> Self {
        debug_assert!(status.is_outcome());
        Self {
            status,
            message: message.to_string(),
            parse_result,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn parse_result(&self) -> Option<&ParseResult> {
        self.parse_result.as_ref()
    }
}

pub trait ShellStatusListener: Send + Sync {
    fn on_shell_status_change(&self, old: &ShellStatus, new: &ShellStatus);
}

impl<F> ShellStatusListener for F
where
    F: Fn(&ShellStatus, &ShellStatus) + Send + Sync,
{
    fn on_shell_status_change(&self, old: &ShellStatus, new: &ShellStatus) {
        self(old, new)
    }
}

/// Holds the current status and fans every transition out to listeners,
/// synchronously and in registration order.
pub struct ShellStatusPublisher {
    current: Mutex<ShellStatus>,
    listeners: Mutex<Vec<Arc<dyn ShellStatusListener>>>,
}

impl Default for ShellStatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellStatusPublisher {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(ShellStatus::new(Status::Starting)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn ShellStatusListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Removes a listener previously added with [`add_listener`](Self::add_listener).
    /// Returns whether it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn ShellStatusListener>) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub fn shell_status(&self) -> ShellStatus {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_shell_status(&self, status: Status) {
        self.publish(ShellStatus::new(status));
    }

    pub fn set_outcome(&self, status: Status, line: &str, parse_result: Option<ParseResult>) {
        self.publish(ShellStatus::outcome(status, line, parse_result));
    }

    fn publish(&self, new: ShellStatus) {
        let old = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, new.clone())
        };

        // Listeners run outside the locks so they may query or re-enter the publisher.
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.on_shell_status_change(&old, &new);
        }
    }
}
