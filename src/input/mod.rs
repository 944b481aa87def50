//! Line-editor glue: completion and highlighting for the interactive console.

use std::borrow::Cow;
use std::sync::Arc;

use rustyline::{
    completion::{Completer, Pair},
    highlight::{CmdKind, Highlighter},
    hint::Hinter,
    validate::Validator,
    Context, Helper,
};

use crate::highlight::SyntaxHighlighter;
use crate::shell::Shell;

pub struct ConsoleHelper {
    shell: Arc<Shell>,
    highlighter: SyntaxHighlighter,
}

impl ConsoleHelper {
    pub fn new(shell: Arc<Shell>) -> Self {
        Self {
            shell,
            highlighter: SyntaxHighlighter::new(),
        }
    }

    fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let (start, completions) = self.shell.complete(line, pos);
        let pairs = completions
            .into_iter()
            .map(|c| Pair {
                display: c.formatted_value().to_string(),
                replacement: c.value().to_string(),
            })
            .collect();
        (start, pairs)
    }
}

impl Helper for ConsoleHelper {}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(line, pos))
    }
}

impl Highlighter for ConsoleHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned(self.highlighter.highlight_command(line))
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        Cow::Owned(self.highlighter.highlight_prompt(prompt))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;
}

impl Validator for ConsoleHelper {}
