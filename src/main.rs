use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use benson::config::ShellConfig;
use benson::console::Console;
use benson::error::ShellError;
use benson::execution::ExitShellRequest;
use benson::shell::{FileHooks, Shell};
use clap::Parser;
use log::{debug, error};

#[derive(Debug, Parser)]
#[command(name = "benson", version, about = "An embeddable command shell")]
struct Cli {
    /// Read settings from this file instead of ~/.bensonrc
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run a script and exit instead of starting the console
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Echo each script line with its line number
    #[arg(long)]
    line_numbers: bool,

    /// Only show warnings and errors
    #[arg(long, conflicts_with = "debug")]
    quiet: bool,

    #[arg(long)]
    debug: bool,
}

fn init_logging(cli: &Cli) {
    let filter = if cli.debug {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn run(cli: Cli) -> Result<i32, ShellError> {
    let config = ShellConfig::load(cli.config.as_deref())?;
    let hooks = FileHooks::new(&config)?;
    let shell = Shell::standard(config, Box::new(hooks), Vec::new());
    let home = shell.home()?;
    debug!("home directory is {}", home.display());

    if let Some(script) = &cli.script {
        shell.run_script(script, cli.line_numbers)?;
        return Ok(shell
            .exit_shell_request()
            .map_or(0, |request| request.exit_code()));
    }

    let console_shell = Arc::clone(&shell);
    let handle = thread::Builder::new()
        .name("benson shell".to_string())
        .spawn(move || -> Result<ExitShellRequest, ShellError> {
            Console::new(console_shell)?.run()
        })?;
    let request = handle
        .join()
        .map_err(|_| ShellError::Thread("console thread panicked".to_string()))??;
    Ok(request.exit_code())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
