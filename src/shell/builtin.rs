use std::env;
use std::sync::Weak;

use crate::convert::{Value, ValueType};
use crate::execution::{CommandOutput, ExecutionError, ExitShellRequest};
use crate::parser::{CommandSpec, CommandTable, OptionSpec, ParseResult};

use super::Shell;

/// The commands every standard shell carries, except `help`, which is added last by
/// [`add_help`] so it can list everything else.
pub(crate) fn commands(shell: Weak<Shell>) -> CommandTable {
    let mut table = CommandTable::new();

    table.add(
        CommandSpec::new(&["script"], "Parses the specified resource file and executes its commands", move |args| {
            run_script(&shell, args)
        })
        .option(
            OptionSpec::new(&["", "file"], ValueType::Path)
                .help("The file to locate and execute")
                .mandatory(),
        )
        .option(
            OptionSpec::new(&["lineNumbers"], ValueType::Boolean)
                .help("Display line numbers when executing the script")
                .specified_default("true")
                .unspecified_default("false"),
        ),
    );

    table.add(CommandSpec::new(&["quit", "exit"], "Exits the shell", |_| {
        Ok(CommandOutput::Exit(ExitShellRequest::NORMAL_EXIT))
    }));

    table.add(
        CommandSpec::new(&[";"], "Inline comment markers (start of line only)", |_| {
            Ok(CommandOutput::None)
        })
        .option(OptionSpec::new(&[""], ValueType::String)),
    );

    table.add(CommandSpec::new(&["version"], "Displays shell version", |_| {
        Ok(format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")).into())
    }));

    table.add(CommandSpec::new(
        &["system properties"],
        "Shows the shell's properties",
        |_| {
            let mut vars: Vec<(String, String)> = env::vars().collect();
            vars.sort();
            let lines: Vec<String> = vars
                .into_iter()
                .map(|(key, value)| format!("{} = {}", key, value))
                .collect();
            Ok(lines.into())
        },
    ));

    table
}

pub(crate) fn add_help(table: &mut CommandTable) {
    let help = CommandSpec::new(&["help"], "List all commands usage", |_| Ok(CommandOutput::None));
    let mut lines = table.help_text();
    lines.push(format!("* {} - {}", help.names().join(", "), help.help()));
    lines.sort();

    table.add(CommandSpec::new(&["help"], help.help(), move |_| {
        Ok(lines.clone().into())
    }));
}

fn run_script(shell: &Weak<Shell>, args: &ParseResult) -> Result<CommandOutput, ExecutionError> {
    let shell = shell
        .upgrade()
        .ok_or_else(|| ExecutionError::Failed("shell is no longer running".into()))?;
    let path = args
        .argument(0)
        .and_then(Value::as_path)
        .ok_or(ExecutionError::MissingArgument("file"))?;
    let line_numbers = args.argument(1).and_then(Value::as_bool).unwrap_or(false);

    shell.run_script(path, line_numbers)?;
    Ok(CommandOutput::None)
}
