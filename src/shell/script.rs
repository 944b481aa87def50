use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};
use thiserror::Error;

use super::Shell;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Unexpected error looking for '{0}'")]
    SearchUnavailable(String),
    #[error("Script '{}' not found on disk or in the script search path", .0.display())]
    NotFound(PathBuf),
    #[error("More than one '{}' was found in the script search path; unable to continue", .0.display())]
    Ambiguous(PathBuf),
    #[error("IO error reading script: {0}")]
    Io(#[from] io::Error),
    #[error("Script execution aborted at line {line_number}: {line}")]
    Aborted { line_number: usize, line: String },
}

/// A line that ends a script early when it succeeds.
fn is_exit_line(trimmed: &str) -> bool {
    matches!(trimmed.split_whitespace().next(), Some("quit" | "exit"))
}

impl Shell {
    /// Executes every non-blank line of `script`, stopping at the first failure.
    ///
    /// A script that is not on disk is looked up by file name through
    /// [`ShellHooks::find_resources`](super::ShellHooks::find_resources); exactly one match is
    /// required.
    pub fn run_script(&self, script: &Path, line_numbers: bool) -> Result<(), ScriptError> {
        let started = Instant::now();
        let result = self
            .open_script(script)
            .and_then(|reader| self.run_lines(reader, line_numbers));
        debug!(
            "Script required {:.3} seconds to execute",
            started.elapsed().as_secs_f64()
        );
        result
    }

    fn open_script(&self, script: &Path) -> Result<BufReader<File>, ScriptError> {
        match File::open(script) {
            Ok(file) => Ok(BufReader::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let name = script
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| script.to_string_lossy().into_owned());
                let found = self
                    .hooks
                    .find_resources(&name)
                    .ok_or(ScriptError::SearchUnavailable(name))?;
                match found.as_slice() {
                    [] => Err(ScriptError::NotFound(script.to_path_buf())),
                    [only] => Ok(BufReader::new(File::open(only)?)),
                    _ => Err(ScriptError::Ambiguous(script.to_path_buf())),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn run_lines(&self, reader: impl BufRead, line_numbers: bool) -> Result<(), ScriptError> {
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            if line_numbers {
                info!("Line {}: {}", line_number, line);
            } else {
                debug!("{}", line);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !self.execute_script_line(&line) {
                return Err(ScriptError::Aborted {
                    line_number,
                    line: line.clone(),
                });
            }
            if is_exit_line(trimmed) {
                break;
            }
        }
        Ok(())
    }

    fn execute_script_line(&self, line: &str) -> bool {
        self.execute_command(line)
    }
}
