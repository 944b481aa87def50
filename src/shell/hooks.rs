use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use log::{info, log, Level};

use crate::config::ShellConfig;

/// Extension points a host supplies to a [`Shell`](super::Shell).
///
/// Every method has a working default, so a host only overrides what it cares about.
pub trait ShellHooks: Send + Sync {
    /// Files named `name` outside the working directory, used when a script is not on disk.
    /// `None` means this host cannot search at all.
    fn find_resources(&self, name: &str) -> Option<Vec<PathBuf>> {
        let _ = name;
        None
    }

    /// Called after every attempted command with the comment-stripped line.
    fn log_command_if_required(&self, line: &str, successful: bool) -> io::Result<()> {
        let marker = match (line.starts_with("script"), successful) {
            (true, true) => "// ",
            (_, false) => "// [failed] ",
            (false, true) => "",
        };
        self.log_command_to_output(&format!("{}{}", marker, line))
    }

    fn log_command_to_output(&self, processed_line: &str) -> io::Result<()> {
        let _ = processed_line;
        Ok(())
    }

    /// Transient notice keyed by `slot`; an empty message clears the slot.
    fn flash(&self, level: Level, message: &str, slot: &str) {
        let _ = slot;
        if !message.is_empty() {
            log!(level, "{}", message);
        }
    }

    /// Renders one item of command output.
    fn emit_output(&self, text: &str) {
        info!("{}", text);
    }
}

/// Hooks with every default left in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ShellHooks for DefaultHooks {}

/// Hooks for the command-line host: records commands to a log file and looks up scripts in
/// the configured search path.
pub struct FileHooks {
    command_log: Option<Mutex<File>>,
    search_path: Vec<PathBuf>,
}

impl FileHooks {
    pub fn new(config: &ShellConfig) -> io::Result<Self> {
        let command_log = match &config.command_log {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Mutex::new(file))
            }
            None => None,
        };
        Ok(Self {
            command_log,
            search_path: config.script_search_path.clone(),
        })
    }
}

impl ShellHooks for FileHooks {
    fn find_resources(&self, name: &str) -> Option<Vec<PathBuf>> {
        Some(
            self.search_path
                .iter()
                .map(|dir| dir.join(name))
                .filter(|candidate| candidate.is_file())
                .collect(),
        )
    }

    fn log_command_to_output(&self, processed_line: &str) -> io::Result<()> {
        let Some(command_log) = &self.command_log else {
            return Ok(());
        };
        let mut file = command_log.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(file, "{}", processed_line)?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording {
        lines: Mutex<Vec<String>>,
    }

    impl ShellHooks for Recording {
        fn log_command_to_output(&self, processed_line: &str) -> io::Result<()> {
            self.lines.lock().expect("lock").push(processed_line.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_default_log_markers() {
        let hooks = Recording::default();
        hooks.log_command_if_required("version", true).expect("log");
        hooks.log_command_if_required("version", false).expect("log");
        hooks.log_command_if_required("script a.benson", true).expect("log");
        hooks.log_command_if_required("script a.benson", false).expect("log");

        assert_eq!(
            *hooks.lines.lock().expect("lock"),
            vec![
                "version",
                "// [failed] version",
                "// script a.benson",
                "// [failed] script a.benson",
            ]
        );
    }

    #[test]
    fn test_default_hooks_cannot_search() {
        assert!(DefaultHooks.find_resources("setup.benson").is_none());
    }

    #[test]
    fn test_file_hooks_log_and_search() {
        let dir = tempfile::tempdir().expect("tempdir");
        let scripts = dir.path().join("scripts");
        fs::create_dir(&scripts).expect("mkdir");
        fs::write(scripts.join("setup.benson"), "version\n").expect("write");

        let mut config = ShellConfig::with_home(dir.path().to_path_buf());
        config.script_search_path = vec![scripts.clone(), dir.path().join("missing")];
        let hooks = FileHooks::new(&config).expect("hooks");

        assert_eq!(
            hooks.find_resources("setup.benson"),
            Some(vec![scripts.join("setup.benson")])
        );
        assert_eq!(hooks.find_resources("other.benson"), Some(vec![]));

        hooks.log_command_if_required("version", true).expect("log");
        hooks.log_command_if_required("bogus", false).expect("log");
        let log_path = config.command_log.expect("command log");
        let logged = fs::read_to_string(log_path).expect("read");
        assert_eq!(logged, "version\n// [failed] bogus\n");
    }
}
