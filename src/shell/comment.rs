use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

const BLOCK_OPEN: &str = "/*";
const BLOCK_CLOSE: &str = "*/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommentError {
    #[error("Cannot open a new block comment when one already active")]
    AlreadyOpen,
    #[error("Cannot close a block comment when it has not been opened")]
    NotOpen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Normalized {
    /// The whole line sat inside a block comment.
    Absorbed,
    /// The live remainder of the line, possibly blank.
    Line(String),
}

/// Block comment tracking for one shell.
///
/// Handles a single `/* ... */` pair per line. Several pairs on one line, or comments in the
/// middle of a token, are not understood: the text before the last `/*` and after the last `*/`
/// is what survives.
#[derive(Debug, Default)]
pub(crate) struct BlockComment {
    open: AtomicBool,
}

impl BlockComment {
    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), CommentError> {
        if self.open.swap(true, Ordering::SeqCst) {
            return Err(CommentError::AlreadyOpen);
        }
        Ok(())
    }

    fn finish(&self) -> Result<(), CommentError> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Err(CommentError::NotOpen);
        }
        Ok(())
    }

    /// Strips comments from `line` and normalises tabs to spaces.
    pub(crate) fn normalize(&self, line: &str) -> Result<Normalized, CommentError> {
        let mut live = if self.is_open() {
            match line.rfind(BLOCK_CLOSE) {
                Some(close) => {
                    self.finish()?;
                    line[close + BLOCK_CLOSE.len()..].to_string()
                }
                None => {
                    if line.contains(BLOCK_OPEN) {
                        self.begin()?;
                    }
                    return Ok(Normalized::Absorbed);
                }
            }
        } else if is_line_comment(line) {
            // Markers inside a whole-line comment are just text.
            String::new()
        } else if let Some(open) = line.rfind(BLOCK_OPEN) {
            self.begin()?;
            let prefix = &line[..open];
            match line.rfind(BLOCK_CLOSE) {
                Some(close) => {
                    let suffix = &line[close + BLOCK_CLOSE.len()..];
                    self.finish()?;
                    format!("{}{}", prefix, suffix)
                }
                None => prefix.to_string(),
            }
        } else {
            if line.trim_start().starts_with(BLOCK_CLOSE) {
                self.finish()?;
            }
            line.to_string()
        };

        // Only whole-line comments; `//` inside an argument such as a URL is left alone.
        if is_line_comment(&live) {
            live.clear();
        }

        Ok(Normalized::Line(live.replace('\t', " ")))
    }
}

fn is_line_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Normalized {
        Normalized::Line(text.to_string())
    }

    #[test]
    fn test_plain_line_passes_through() {
        let comments = BlockComment::default();
        assert_eq!(comments.normalize("date").expect("normalize"), line("date"));
        assert!(!comments.is_open());
    }

    #[test]
    fn test_tabs_become_spaces() {
        let comments = BlockComment::default();
        assert_eq!(
            comments.normalize("script\t--file\tx").expect("normalize"),
            line("script --file x")
        );
    }

    #[test]
    fn test_whole_line_comments() {
        let comments = BlockComment::default();
        assert_eq!(comments.normalize("# this is ignored").expect("normalize"), line(""));
        assert_eq!(comments.normalize("   // also ignored").expect("normalize"), line(""));
        assert_eq!(
            comments.normalize("open http://example.com").expect("normalize"),
            line("open http://example.com")
        );
    }

    #[test]
    fn test_markers_inside_line_comments_are_ignored() {
        let comments = BlockComment::default();
        assert_eq!(comments.normalize("# note /* later").expect("normalize"), line(""));
        assert!(!comments.is_open());
        assert_eq!(comments.normalize("  // see /* here */").expect("normalize"), line(""));
        assert!(!comments.is_open());
        assert_eq!(comments.normalize("# done */").expect("normalize"), line(""));
        assert!(!comments.is_open());

        assert_eq!(comments.normalize("date").expect("normalize"), line("date"));
    }

    #[test]
    fn test_single_line_block_comment() {
        let comments = BlockComment::default();
        assert_eq!(comments.normalize("/* x */").expect("normalize"), line(""));
        assert!(!comments.is_open());

        assert_eq!(
            comments.normalize("date /* note */ --now").expect("normalize"),
            line("date  --now")
        );
        assert!(!comments.is_open());
    }

    #[test]
    fn test_block_comment_across_lines() {
        let comments = BlockComment::default();
        assert_eq!(comments.normalize("/* start").expect("normalize"), line(""));
        assert!(comments.is_open());

        assert_eq!(comments.normalize("still commented").expect("normalize"), Normalized::Absorbed);
        assert!(comments.is_open());

        assert_eq!(comments.normalize("end */ date").expect("normalize"), line(" date"));
        assert!(!comments.is_open());
    }

    #[test]
    fn test_text_before_open_marker_is_live() {
        let comments = BlockComment::default();
        assert_eq!(comments.normalize("date /* trailing").expect("normalize"), line("date "));
        assert!(comments.is_open());
    }

    #[test]
    fn test_double_open_is_an_error() {
        let comments = BlockComment::default();
        comments.normalize("/*").expect("normalize");
        assert_eq!(comments.normalize("/*"), Err(CommentError::AlreadyOpen));
        assert!(comments.is_open());
    }

    #[test]
    fn test_close_without_open_is_an_error() {
        let comments = BlockComment::default();
        assert_eq!(comments.normalize("*/ date"), Err(CommentError::NotOpen));
        assert!(!comments.is_open());
    }
}
