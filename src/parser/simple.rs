use std::sync::Arc;

use log::warn;

use super::{CommandSpec, CommandTable, MethodTarget, ParseResult, Parser};
use crate::convert::{Completion, ConverterRegistry, Value};

const KEY_PREFIX: &str = "--";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    start: usize,
}

/// Splits on whitespace; double quotes group words and are dropped.
fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;
    let mut quoted = false;

    for (i, ch) in line.char_indices() {
        if ch == '"' {
            quoted = !quoted;
            current.get_or_insert_with(|| Token {
                text: String::new(),
                start: i,
            });
        } else if ch.is_whitespace() && !quoted {
            if let Some(token) = current.take() {
                tokens.push(token);
            }
        } else {
            current
                .get_or_insert_with(|| Token {
                    text: String::new(),
                    start: i,
                })
                .text
                .push(ch);
        }
    }
    if let Some(token) = current {
        tokens.push(token);
    }
    tokens
}

/// What the user wrote for one option.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Given {
    Absent,
    KeyOnly,
    Text(String),
}

/// Parses lines against a [`CommandTable`], converting arguments through a [`ConverterRegistry`].
///
/// Options are written `--key value`; the option with the empty key takes the words that are not
/// attached to any key.
pub struct SimpleParser {
    table: Arc<CommandTable>,
    converters: Arc<ConverterRegistry>,
}

impl SimpleParser {
    pub fn new(table: Arc<CommandTable>, converters: Arc<ConverterRegistry>) -> Self {
        Self { table, converters }
    }

    fn bind(command: &CommandSpec, tokens: &[Token]) -> Result<Vec<Given>, String> {
        let mut given = vec![Given::Absent; command.options.len()];
        let mut positional: Vec<&str> = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let text = tokens[i].text.as_str();
            if let Some(key) = text.strip_prefix(KEY_PREFIX) {
                let index = command
                    .option_index(key)
                    .ok_or_else(|| format!("Option '{}' is not available for this command", key))?;
                if given[index] != Given::Absent {
                    return Err(format!("You cannot specify option '{}' more than once", key));
                }
                let value = tokens
                    .get(i + 1)
                    .filter(|next| !next.text.starts_with(KEY_PREFIX));
                given[index] = match value {
                    Some(next) => {
                        i += 1;
                        Given::Text(next.text.clone())
                    }
                    None => Given::KeyOnly,
                };
            } else {
                positional.push(text);
            }
            i += 1;
        }

        if !positional.is_empty() {
            let index = command
                .positional_index()
                .ok_or_else(|| format!("Unexpected argument '{}'", positional.join(" ")))?;
            if given[index] != Given::Absent {
                return Err(format!(
                    "Option '{}' was given both by key and by position",
                    command.options[index].keys.join("/")
                ));
            }
            given[index] = Given::Text(positional.join(" "));
        }
        Ok(given)
    }

    fn convert(&self, command: &CommandSpec, given: Vec<Given>) -> Result<Vec<Option<Value>>, String> {
        command
            .options
            .iter()
            .zip(given)
            .map(|(option, given)| {
                let text = match given {
                    Given::Text(text) => Some(text),
                    Given::KeyOnly => Some(option.specified_default.clone().ok_or_else(|| {
                        format!("Option '{}' requires a value", option.keys.join("/"))
                    })?),
                    Given::Absent if option.mandatory => {
                        return Err(format!(
                            "You should specify option ({}) for this command",
                            option
                                .keys
                                .iter()
                                .map(|k| format!("{}{}", KEY_PREFIX, k))
                                .collect::<Vec<_>>()
                                .join(", ")
                        ));
                    }
                    Given::Absent => option.unspecified_default.clone(),
                };
                text.map(|text| {
                    self.converters
                        .convert(&text, option.value_type, &option.context)
                        .map_err(|e| e.to_string())
                })
                .transpose()
            })
            .collect()
    }

    fn complete_command_name(&self, typed: &str, start: usize) -> (usize, Vec<Completion>) {
        let mut names: Vec<Completion> = self
            .table
            .commands()
            .iter()
            .flat_map(|c| c.names.iter())
            .filter(|name| name.starts_with(typed))
            .map(Completion::new)
            .collect();
        names.sort();
        names.dedup();
        (start, names)
    }

    fn unused_keys(command: &CommandSpec, used: &[Token], partial: &str) -> Vec<Completion> {
        command
            .options
            .iter()
            .flat_map(|o| o.keys.iter())
            .filter(|key| !key.is_empty() && key.starts_with(partial))
            .filter(|key| {
                !used
                    .iter()
                    .any(|t| t.text.strip_prefix(KEY_PREFIX) == Some(key.as_str()))
            })
            .map(|key| Completion::new(format!("{}{}", KEY_PREFIX, key)))
            .collect()
    }

    fn complete_option(
        &self,
        command: &CommandSpec,
        arguments: &[Token],
        partial: &str,
    ) -> Vec<Completion> {
        if let Some(key) = partial.strip_prefix(KEY_PREFIX) {
            return Self::unused_keys(command, arguments, key);
        }

        let bound = match arguments.last() {
            Some(last) if last.text.starts_with(KEY_PREFIX) => {
                command.option_index(&last.text[KEY_PREFIX.len()..])
            }
            _ => command.positional_index(),
        };

        let mut completions = Vec::new();
        if let Some(option) = bound.map(|i| &command.options[i]) {
            let target = MethodTarget {
                command: command.primary_name().to_string(),
                remaining_buffer: partial.to_string(),
            };
            self.converters.complete(
                &mut completions,
                option.value_type,
                partial,
                &option.context,
                Some(&target),
            );
        }
        if partial.is_empty() {
            completions.extend(Self::unused_keys(command, arguments, ""));
        }
        completions
    }
}

impl Parser for SimpleParser {
    fn parse(&self, line: &str) -> Option<ParseResult> {
        let tokens = tokenize(line);
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        if words.is_empty() {
            return None;
        }

        let Some((command, used)) = self.table.resolve(&words) else {
            warn!(
                "Command '{}' not found (for assistance press TAB or type \"help\" then hit ENTER.)",
                line.trim()
            );
            return None;
        };

        let arguments = Self::bind(command, &tokens[used..])
            .and_then(|given| self.convert(command, given));
        match arguments {
            Ok(arguments) => Some(ParseResult::new(command.primary_name(), arguments)),
            Err(message) => {
                warn!("{}", message);
                None
            }
        }
    }

    fn complete(&self, buffer: &str, cursor: usize) -> (usize, Vec<Completion>) {
        let buffer = buffer.get(..cursor).unwrap_or(buffer);
        let mut tokens = tokenize(buffer);

        let (partial, start) = if buffer.is_empty() || buffer.ends_with(char::is_whitespace) {
            (String::new(), buffer.len())
        } else {
            match tokens.pop() {
                Some(token) => (token.text, token.start),
                None => (String::new(), buffer.len()),
            }
        };

        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        match self.table.resolve(&words) {
            Some((command, used)) => {
                let completions = self.complete_option(command, &tokens[used..], &partial);
                (start, completions)
            }
            None => {
                let first = tokens.first().map_or(start, |t| t.start);
                let typed = buffer.get(first..).unwrap_or_default().trim_start();
                self.complete_command_name(typed, first)
            }
        }
    }
}
