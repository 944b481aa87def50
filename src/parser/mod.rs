//! Resolution of input lines to commands.
//!
//! The shell only depends on the [`Parser`] trait. [`CommandTable`] and [`SimpleParser`] are the
//! stock implementation: an explicit table of commands built at startup.

use std::fmt;
use std::sync::Arc;

use crate::convert::{Completion, Value, ValueType};
use crate::execution::{CommandOutput, ExecutionError};

mod simple;

pub use simple::SimpleParser;

/// A resolved command plus its bound arguments, one slot per declared option.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    command: String,
    arguments: Vec<Option<Value>>,
}

impl ParseResult {
    pub fn new(command: impl Into<String>, arguments: Vec<Option<Value>>) -> Self {
        Self {
            command: command.into(),
            arguments,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &[Option<Value>] {
        &self.arguments
    }

    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index).and_then(Option::as_ref)
    }
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for argument in self.arguments.iter().flatten() {
            write!(f, " {}", argument)?;
        }
        Ok(())
    }
}

/// The command a completion request is being made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTarget {
    pub command: String,
    pub remaining_buffer: String,
}

pub trait Parser: Send + Sync {
    /// `None` means the line could not be resolved to a command. Diagnostics are the
    /// parser's own business.
    fn parse(&self, line: &str) -> Option<ParseResult>;

    /// Completion candidates for `buffer` up to `cursor`, with the byte offset they replace from.
    fn complete(&self, buffer: &str, cursor: usize) -> (usize, Vec<Completion>) {
        let _ = buffer;
        (cursor, Vec::new())
    }
}

pub type Handler =
    Arc<dyn Fn(&ParseResult) -> Result<CommandOutput, ExecutionError> + Send + Sync>;

/// One option of a command. The empty key names the positional option.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub(crate) keys: Vec<String>,
    pub(crate) help: String,
    pub(crate) value_type: ValueType,
    pub(crate) mandatory: bool,
    pub(crate) specified_default: Option<String>,
    pub(crate) unspecified_default: Option<String>,
    pub(crate) context: String,
}

impl OptionSpec {
    pub fn new(keys: &[&str], value_type: ValueType) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            help: String::new(),
            value_type,
            mandatory: false,
            specified_default: None,
            unspecified_default: None,
            context: String::new(),
        }
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Value used when the key is given without a value.
    pub fn specified_default(mut self, value: &str) -> Self {
        self.specified_default = Some(value.to_string());
        self
    }

    /// Value used when the option is left out entirely.
    pub fn unspecified_default(mut self, value: &str) -> Self {
        self.unspecified_default = Some(value.to_string());
        self
    }

    pub fn context(mut self, context: &str) -> Self {
        self.context = context.to_string();
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub(crate) fn is_positional(&self) -> bool {
        self.keys.iter().any(String::is_empty)
    }

    pub(crate) fn answers_to(&self, key: &str) -> bool {
        !key.is_empty() && self.keys.iter().any(|k| k == key)
    }
}

#[derive(Clone)]
pub struct CommandSpec {
    pub(crate) names: Vec<String>,
    pub(crate) help: String,
    pub(crate) options: Vec<OptionSpec>,
    pub(crate) handler: Handler,
}

impl CommandSpec {
    pub fn new<F>(names: &[&str], help: &str, handler: F) -> Self
    where
        F: Fn(&ParseResult) -> Result<CommandOutput, ExecutionError> + Send + Sync + 'static,
    {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            help: help.to_string(),
            options: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub(crate) fn primary_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn option_index(&self, key: &str) -> Option<usize> {
        self.options.iter().position(|o| o.answers_to(key))
    }

    pub(crate) fn positional_index(&self) -> Option<usize> {
        self.options.iter().position(OptionSpec::is_positional)
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("names", &self.names)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Every command the shell knows, in registration order.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: Vec<CommandSpec>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, command: CommandSpec) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Finds a command by any of its names. `ParseResult::command` is always a primary name.
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands
            .iter()
            .find(|c| c.names.iter().any(|n| n == name))
    }

    /// The command whose name matches the most leading words, and how many words it used.
    /// Ties go to the earlier registration.
    pub fn resolve(&self, words: &[&str]) -> Option<(&CommandSpec, usize)> {
        let mut best: Option<(&CommandSpec, usize)> = None;
        for command in &self.commands {
            for name in &command.names {
                let name_words: Vec<&str> = name.split_whitespace().collect();
                let matched = !name_words.is_empty()
                    && name_words.len() <= words.len()
                    && name_words.iter().zip(words).all(|(a, b)| a == b);
                if matched && best.map_or(true, |(_, len)| name_words.len() > len) {
                    best = Some((command, name_words.len()));
                }
            }
        }
        best
    }

    /// One line per command: its names and help text.
    pub fn help_text(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .commands
            .iter()
            .map(|c| format!("* {} - {}", c.names.join(", "), c.help))
            .collect();
        lines.sort();
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &ParseResult) -> Result<CommandOutput, ExecutionError> {
        Ok(CommandOutput::None)
    }

    #[test]
    fn test_resolve_prefers_longest_name() {
        let mut table = CommandTable::new();
        table.add(CommandSpec::new(&["system"], "short", noop));
        table.add(CommandSpec::new(&["system properties"], "long", noop));

        let (command, used) = table.resolve(&["system", "properties"]).expect("resolve");
        assert_eq!(command.primary_name(), "system properties");
        assert_eq!(used, 2);

        let (command, used) = table.resolve(&["system", "other"]).expect("resolve");
        assert_eq!(command.primary_name(), "system");
        assert_eq!(used, 1);
    }

    #[test]
    fn test_resolve_ties_go_to_first_registration() {
        let mut table = CommandTable::new();
        table.add(CommandSpec::new(&["quit"], "first", noop));
        table.add(CommandSpec::new(&["quit"], "second", noop));

        let (command, _) = table.resolve(&["quit"]).expect("resolve");
        assert_eq!(command.help(), "first");
        assert!(table.resolve(&["qui"]).is_none());
    }

    #[test]
    fn test_get_by_alias() {
        let mut table = CommandTable::new();
        table.add(CommandSpec::new(&["quit", "exit"], "Exits the shell", noop));
        assert_eq!(table.get("exit").map(CommandSpec::primary_name), Some("quit"));
        assert!(table.get("bye").is_none());
    }

    #[test]
    fn test_option_lookup() {
        let command = CommandSpec::new(&["script"], "Runs a script", noop)
            .option(OptionSpec::new(&["", "file"], ValueType::Path).mandatory())
            .option(OptionSpec::new(&["lineNumbers"], ValueType::Boolean));

        assert_eq!(command.option_index("file"), Some(0));
        assert_eq!(command.option_index("lineNumbers"), Some(1));
        assert_eq!(command.option_index(""), None);
        assert_eq!(command.positional_index(), Some(0));
    }

    #[test]
    fn test_parse_result_display() {
        let result = ParseResult::new(
            "script",
            vec![Some(Value::String("setup.benson".into())), None],
        );
        assert_eq!(result.to_string(), "script setup.benson");
        assert_eq!(result.argument(1), None);
    }
}
