use inksac::prelude::*;

const OPTION_PREFIX: &str = "--";

/// Colours an input line: the command word in bold cyan, `--options` in yellow.
///
/// Whitespace is left exactly as typed so the cursor position stays valid.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxHighlighter {
    color_support: ColorSupport,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    pub fn new() -> Self {
        let support = check_color_support().unwrap_or(ColorSupport::NoColor);
        Self {
            color_support: support,
        }
    }

    pub fn plain() -> Self {
        Self {
            color_support: ColorSupport::NoColor,
        }
    }

    fn enabled(&self) -> bool {
        !matches!(self.color_support, ColorSupport::NoColor)
    }

    pub fn highlight_command(&self, input: &str) -> String {
        if !self.enabled() {
            return input.to_string();
        }

        let mut highlighted = String::with_capacity(input.len() * 2);
        let mut rest = input;
        let mut first = true;
        while !rest.is_empty() {
            let word_start = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
            highlighted.push_str(&rest[..word_start]);
            rest = &rest[word_start..];

            let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let word = &rest[..word_end];
            if word.is_empty() {
                break;
            }
            if first {
                let command_style = Style::builder().foreground(Color::Cyan).bold().build();
                highlighted.push_str(&word.style(command_style).to_string());
                first = false;
            } else if word.starts_with(OPTION_PREFIX) {
                let option_style = Style::builder().foreground(Color::Yellow).build();
                highlighted.push_str(&word.style(option_style).to_string());
            } else {
                highlighted.push_str(word);
            }
            rest = &rest[word_end..];
        }
        highlighted
    }

    pub fn highlight_prompt(&self, prompt: &str) -> String {
        if !self.enabled() {
            return prompt.to_string();
        }

        let prompt_style = Style::builder().foreground(Color::Green).build();
        prompt.style(prompt_style).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_passes_through() {
        let highlighter = SyntaxHighlighter::plain();
        assert_eq!(
            highlighter.highlight_command("script  --file x"),
            "script  --file x"
        );
        assert_eq!(highlighter.highlight_prompt("benson> "), "benson> ");
    }

    #[test]
    fn test_colour_keeps_words_and_spacing() {
        let highlighter = SyntaxHighlighter {
            color_support: ColorSupport::Basic,
        };
        let line = "  script  --file x ";
        let highlighted = highlighter.highlight_command(line);
        assert_ne!(highlighted, line);
        assert!(highlighted.starts_with("  "));
        assert!(highlighted.ends_with(" x "));
        assert!(highlighted.contains("script"));
        assert!(highlighted.contains("--file"));
    }
}
