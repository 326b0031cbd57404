//! Syntax highlighting for fenced code blocks.
//!
//! The declared language tag is resolved against syntect's default syntax
//! set; without a usable tag the first line of the block is used for
//! auto-detection, and as a last resort the code is emitted as escaped
//! plain text. Output is a `<pre><code class="hljs ...">` fragment with
//! class-based spans, produced during rendering (before sanitization).

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

pub struct Highlighter {
    syntaxes: SyntaxSet,
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Render one code block as a highlighted HTML fragment.
    pub fn highlight_block(&self, language: Option<&str>, code: &str) -> String {
        let declared = language.map(str::trim).filter(|tag| !tag.is_empty());
        let syntax = declared
            .and_then(|tag| self.syntaxes.find_syntax_by_token(tag))
            .or_else(|| {
                code.lines()
                    .next()
                    .and_then(|line| self.syntaxes.find_syntax_by_first_line(line))
            });

        let class_attr = match declared {
            Some(tag) => format!(
                "hljs language-{}",
                html_escape::encode_double_quoted_attribute(tag)
            ),
            None => "hljs".to_string(),
        };

        let body = match syntax {
            Some(syntax) => self
                .class_spans(syntax, code)
                .unwrap_or_else(|| escape_code(code)),
            None => escape_code(code),
        };

        format!("<pre><code class=\"{class_attr}\">{body}</code></pre>")
    }

    fn class_spans(&self, syntax: &SyntaxReference, code: &str) -> Option<String> {
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            if generator
                .parse_html_for_line_which_includes_newline(line)
                .is_err()
            {
                log::warn!("syntax highlighting failed, falling back to plain text");
                return None;
            }
        }
        Some(generator.finalize())
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_code(code: &str) -> String {
    html_escape::encode_text(code).into_owned()
}
