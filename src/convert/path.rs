use std::fs;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use log::debug;

use super::{Completion, ConversionError, Converter, Value, ValueType};
use crate::parser::MethodTarget;

const HOME_SYMBOL: &str = "~";

/// Supplies the directory that relative path input is resolved against.
pub trait WorkingDirectory: Send + Sync {
    fn working_directory(&self) -> io::Result<PathBuf>;
}

/// The process working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentDirectory;

impl WorkingDirectory for CurrentDirectory {
    fn working_directory(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }
}

impl WorkingDirectory for PathBuf {
    fn working_directory(&self) -> io::Result<PathBuf> {
        Ok(self.clone())
    }
}

/// Converts text to filesystem paths and completes partial paths from directory listings.
///
/// Input is taken verbatim when absolute, has a leading `~` replaced by the home directory,
/// and is otherwise resolved against the working directory. Completions are handed back in the
/// same style the user typed them.
pub struct PathConverter {
    working_directory: Box<dyn WorkingDirectory>,
    home: Option<PathBuf>,
}

impl PathConverter {
    pub fn new(working_directory: Box<dyn WorkingDirectory>) -> Self {
        Self {
            working_directory,
            home: dirs::home_dir(),
        }
    }

    /// Overrides the home directory used for `~`; `None` behaves like an environment
    /// without a resolvable home.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    fn home_string(&self) -> Result<String, ConversionError> {
        let home = self.home.as_ref().ok_or(ConversionError::HomeDirNotFound)?;
        let home = home.to_string_lossy();
        let trimmed = home.trim_end_matches(MAIN_SEPARATOR);
        if trimmed.is_empty() {
            Ok(home.into_owned())
        } else {
            Ok(trimmed.to_string())
        }
    }

    /// The canonical working directory, always ending in a separator.
    fn working_directory_string(&self) -> Result<String, ConversionError> {
        let dir = self.working_directory.working_directory()?;
        let dir = fs::canonicalize(&dir).unwrap_or(dir);
        let mut dir = dir.to_string_lossy().into_owned();
        if !dir.ends_with(MAIN_SEPARATOR) {
            dir.push(MAIN_SEPARATOR);
        }
        Ok(dir)
    }

    fn fully_qualify(&self, input: &str) -> Result<String, ConversionError> {
        if Path::new(input).is_absolute() {
            return Ok(input.to_string());
        }
        if let Some(rest) = input.strip_prefix(HOME_SYMBOL) {
            return Ok(format!("{}{}", self.home_string()?, rest));
        }
        Ok(format!("{}{}", self.working_directory_string()?, input))
    }

    /// Rewrites a fully qualified candidate back into the form of `original`.
    fn to_user_style(&self, original: &str, candidate: &str) -> Option<String> {
        if Path::new(original).is_absolute() {
            return Some(candidate.to_string());
        }
        if original.starts_with(HOME_SYMBOL) {
            let home = self.home_string().ok()?;
            return candidate
                .strip_prefix(home.as_str())
                .map(|rest| format!("{}{}", HOME_SYMBOL, rest));
        }
        let working_directory = self.working_directory_string().ok()?;
        candidate
            .strip_prefix(working_directory.as_str())
            .map(str::to_string)
    }
}

impl Converter for PathConverter {
    fn supports(&self, value_type: ValueType, _option_context: &str) -> bool {
        value_type == ValueType::Path
    }

    fn convert_from_text(
        &self,
        text: &str,
        _value_type: ValueType,
        _option_context: &str,
    ) -> Result<Value, ConversionError> {
        self.fully_qualify(text).map(|p| Value::Path(PathBuf::from(p)))
    }

    fn populate_completions(
        &self,
        completions: &mut Vec<Completion>,
        _value_type: ValueType,
        existing: &str,
        _option_context: &str,
        _target: Option<&MethodTarget>,
    ) -> bool {
        let adjusted = match self.fully_qualify(existing) {
            Ok(adjusted) => adjusted,
            Err(e) => {
                debug!("no path completions for '{}': {}", existing, e);
                return false;
            }
        };

        let split = adjusted.rfind(MAIN_SEPARATOR).map_or(0, |i| i + 1);
        let (directory, prefix) = adjusted.split_at(split);
        let prefix = prefix.to_lowercase();

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(_) => return false,
        };

        let mut found = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !prefix.is_empty() && !name.to_lowercase().starts_with(&prefix) {
                continue;
            }

            let candidate = format!("{}{}", directory, name);
            let Some(mut completion) = self.to_user_style(existing, &candidate) else {
                continue;
            };
            if entry.path().is_dir() {
                completion.push(MAIN_SEPARATOR);
            }
            found.push(Completion::new(completion));
        }

        found.sort();
        completions.extend(found);

        // Paths are explored one directory at a time, so nothing here is final.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn converter(working_directory: &str, home: Option<&str>) -> PathConverter {
        PathConverter::new(Box::new(PathBuf::from(working_directory)))
            .with_home(home.map(PathBuf::from))
    }

    fn project() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = fs::canonicalize(dir.path()).expect("canonicalize");
        fs::create_dir(root.join("build")).expect("mkdir");
        fs::write(root.join("build.sh"), "#!/bin/sh\n").expect("write");
        fs::write(root.join("README"), "readme\n").expect("write");
        (dir, root)
    }

    fn complete(converter: &PathConverter, input: &str) -> (bool, Vec<String>) {
        let mut completions = Vec::new();
        let complete =
            converter.populate_completions(&mut completions, ValueType::Path, input, "", None);
        let values = completions.iter().map(|c| c.value().to_string()).collect();
        (complete, values)
    }

    #[test]
    fn test_relative_input_uses_working_directory() {
        let c = converter("/home/u/proj", Some("/home/u"));
        assert_eq!(
            c.convert_from_text("notes.txt", ValueType::Path, "").expect("convert"),
            Value::Path(PathBuf::from("/home/u/proj/notes.txt"))
        );
    }

    #[test]
    fn test_home_shorthand() {
        let c = converter("/home/u/proj", Some("/home/u"));
        assert_eq!(
            c.convert_from_text("~/notes.txt", ValueType::Path, "").expect("convert"),
            Value::Path(PathBuf::from("/home/u/notes.txt"))
        );
        assert_eq!(
            c.convert_from_text("~", ValueType::Path, "").expect("convert"),
            Value::Path(PathBuf::from("/home/u"))
        );
    }

    #[test]
    fn test_absolute_input_unchanged() {
        let c = converter("/home/u/proj", Some("/home/u"));
        assert_eq!(
            c.convert_from_text("/etc/x", ValueType::Path, "").expect("convert"),
            Value::Path(PathBuf::from("/etc/x"))
        );
    }

    #[test]
    fn test_home_shorthand_without_home() {
        let c = converter("/home/u/proj", None);
        assert!(matches!(
            c.convert_from_text("~/notes.txt", ValueType::Path, ""),
            Err(ConversionError::HomeDirNotFound)
        ));
        // Only the shorthand needs a home directory.
        assert!(c.convert_from_text("notes.txt", ValueType::Path, "").is_ok());
    }

    #[test]
    fn test_relative_completion() {
        let (_dir, root) = project();
        let c = converter(&root.to_string_lossy(), None);

        let (complete, values) = complete(&c, "bui");
        assert!(!complete);
        assert_eq!(values, vec!["build.sh".to_string(), "build/".to_string()]);
    }

    #[test]
    fn test_completion_prefix_is_case_insensitive() {
        let (_dir, root) = project();
        let c = converter(&root.to_string_lossy(), None);

        let (_, values) = complete(&c, "re");
        assert_eq!(values, vec!["README".to_string()]);
    }

    #[test]
    fn test_empty_prefix_lists_everything() {
        let (_dir, root) = project();
        let c = converter(&root.to_string_lossy(), None);

        let (_, values) = complete(&c, "");
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_absolute_completion_stays_absolute() {
        let (_dir, root) = project();
        let c = converter("/nonexistent", None);
        let input = format!("{}/bu", root.display());

        let (_, values) = complete(&c, &input);
        assert_eq!(
            values,
            vec![
                format!("{}/build.sh", root.display()),
                format!("{}/build/", root.display()),
            ]
        );
    }

    #[test]
    fn test_home_completion_is_abbreviated() {
        let (_dir, root) = project();
        let c = converter("/nonexistent", Some(&root.to_string_lossy()));

        let (complete, values) = complete(&c, "~/bu");
        assert!(!complete);
        assert_eq!(values, vec!["~/build.sh".to_string(), "~/build/".to_string()]);
    }

    #[test]
    fn test_completion_into_subdirectory() {
        let (_dir, root) = project();
        fs::write(root.join("build").join("out.log"), "").expect("write");
        let c = converter(&root.to_string_lossy(), None);

        let (_, values) = complete(&c, "build/");
        assert_eq!(values, vec!["build/out.log".to_string()]);
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let (_dir, root) = project();
        let c = converter(&root.to_string_lossy(), None);

        let (complete, values) = complete(&c, "nowhere/x");
        assert!(!complete);
        assert!(values.is_empty());
    }
}
