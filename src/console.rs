use std::sync::Arc;

use log::{debug, warn};
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{CompletionType, Config, Editor};

use crate::error::ShellError;
use crate::event::Status;
use crate::execution::ExitShellRequest;
use crate::input::ConsoleHelper;
use crate::shell::Shell;

/// Where the console gets its lines from.
pub(crate) trait LineSource {
    fn read_line(&mut self, prompt: &str) -> rustyline::Result<String>;

    fn remember(&mut self, line: &str);
}

impl LineSource for Editor<ConsoleHelper, FileHistory> {
    fn read_line(&mut self, prompt: &str) -> rustyline::Result<String> {
        self.readline(prompt)
    }

    fn remember(&mut self, line: &str) {
        if let Err(e) = self.add_history_entry(line) {
            warn!("Couldn't add to history: {}", e);
        }
    }
}

/// Interactive front end: reads lines with `rustyline` and hands them to a [`Shell`].
pub struct Console {
    shell: Arc<Shell>,
    editor: Editor<ConsoleHelper, FileHistory>,
}

impl Console {
    pub fn new(shell: Arc<Shell>) -> Result<Self, ShellError> {
        let config = Config::builder()
            .max_history_size(shell.config().history_size)?
            .auto_add_history(false)
            .completion_type(CompletionType::List)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ConsoleHelper::new(Arc::clone(&shell))));
        Ok(Self { shell, editor })
    }

    /// Reads and executes lines until a command asks to exit or input ends.
    pub fn run(&mut self) -> Result<ExitShellRequest, ShellError> {
        self.load_history();
        let outcome = drive(&self.shell, &mut self.editor);
        self.save_history();
        outcome
    }

    fn load_history(&mut self) {
        let path = &self.shell.config().history_file;
        if !path.exists() {
            return;
        }
        if let Err(e) = self.editor.load_history(path) {
            warn!("Couldn't load history from {}: {}", path.display(), e);
        }
    }

    fn save_history(&mut self) {
        let path = &self.shell.config().history_file;
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Couldn't create {}: {}", parent.display(), e);
                return;
            }
        }
        match self.editor.save_history(path) {
            Ok(()) => debug!("history saved to {}", path.display()),
            Err(e) => warn!("Couldn't save history to {}: {}", path.display(), e),
        }
    }
}

/// Publishes the console lifecycle around the prompt loop.
fn drive(shell: &Shell, input: &mut dyn LineSource) -> Result<ExitShellRequest, ShellError> {
    shell.set_shell_status(Status::Starting);
    shell.set_shell_status(Status::Started);
    shell.set_shell_status(Status::UserInput);

    let outcome = prompt_loop(shell, input);

    shell.set_shell_status(Status::ShuttingDown);
    outcome
}

fn prompt_loop(shell: &Shell, input: &mut dyn LineSource) -> Result<ExitShellRequest, ShellError> {
    loop {
        if let Some(request) = shell.exit_shell_request() {
            return Ok(request);
        }
        match input.read_line(&shell.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    input.remember(&line);
                }
                shell.execute_command(&line);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(ExitShellRequest::NORMAL_EXIT),
            Err(e) => return Err(e.into()),
        }
    }
}
