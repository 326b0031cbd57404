//! Block-level token model.
//!
//! The tokenizer itself is pulldown-cmark; this module folds its event
//! stream into a closed set of block tokens carrying only the fields each
//! kind needs. Document order is preserved: tokens come out in the order
//! their blocks appear in the source.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use serde::{Deserialize, Serialize};

/// Markdown extensions enabled for both tokenizing and rendering (the GFM
/// profile: tables, strikethrough, task lists).
pub fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// One item of a [`Token::List`], with its inline text flattened to a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub text: String,
}

/// A block-level unit of parsed markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    Heading {
        /// Heading depth, 1 through 6.
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        ordered: bool,
        items: Vec<ListItem>,
    },
    Table {
        text: String,
    },
    Code {
        language: Option<String>,
        text: String,
    },
    BlockQuote {
        text: String,
    },
    /// A raw HTML block. Carried through for completeness; the outline
    /// builder skips it.
    Html {
        text: String,
    },
    /// A thematic break. Also skipped by the outline builder.
    Rule,
}

/// Tokenize a markdown string into ordered block-level tokens.
pub fn tokenize(markdown: &str) -> Vec<Token> {
    let events: Vec<Event> = Parser::new_ext(markdown, markdown_options()).collect();
    tokens_from_events(&events)
}

/// Fold an already-collected event stream into block tokens. Used by the
/// render path so the input is only parsed once per pipeline invocation.
pub(crate) fn tokens_from_events(events: &[Event<'_>]) -> Vec<Token> {
    let mut lexer = BlockLexer::default();
    for event in events {
        lexer.push(event);
    }
    lexer.finish()
}

/// The block currently being accumulated, if any.
#[derive(Debug)]
enum OpenBlock {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        ordered: bool,
        items: Vec<ListItem>,
        /// Text of the item currently open, `None` between items.
        current: Option<String>,
    },
    Table {
        text: String,
    },
    Code {
        language: Option<String>,
        text: String,
    },
    BlockQuote {
        text: String,
    },
    Html {
        text: String,
    },
}

/// Event-driven state machine that groups pulldown-cmark events into
/// top-level blocks.
///
/// `depth` counts open `Start`/`End` tag pairs. A `Start` at depth 0 opens a
/// block; the matching `End` (depth returning to 0) flushes it. Everything
/// in between contributes text to the open block. Within a top-level list,
/// the direct children (depth 1 -> 2 transitions) are exactly the list
/// items, which is what delimits [`ListItem`] boundaries.
#[derive(Debug, Default)]
struct BlockLexer {
    depth: usize,
    open: Option<OpenBlock>,
    out: Vec<Token>,
}

impl BlockLexer {
    fn push(&mut self, event: &Event<'_>) {
        match event {
            Event::Start(tag) => {
                if self.depth == 0 {
                    self.open_block(tag);
                } else {
                    self.nested_start(tag);
                }
                self.depth += 1;
            }
            Event::End(_) => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 1 {
                    self.close_list_item();
                } else if self.depth == 0 {
                    self.flush();
                }
            }
            Event::Text(text) => self.push_text(text),
            Event::Code(code) => self.push_text(code),
            Event::InlineHtml(html) => self.push_text(html),
            Event::Html(html) => {
                if let Some(OpenBlock::Html { text }) = &mut self.open {
                    text.push_str(html);
                }
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_text("\n"),
            Event::Rule => {
                if self.depth == 0 {
                    self.out.push(Token::Rule);
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.close_list_item();
        self.flush();
        self.out
    }

    fn open_block(&mut self, tag: &Tag<'_>) {
        self.open = match tag {
            Tag::Heading { level, .. } => Some(OpenBlock::Heading {
                level: heading_depth(*level),
                text: String::new(),
            }),
            Tag::Paragraph => Some(OpenBlock::Paragraph {
                text: String::new(),
            }),
            Tag::List(first_number) => Some(OpenBlock::List {
                ordered: first_number.is_some(),
                items: Vec::new(),
                current: None,
            }),
            Tag::Table(_) => Some(OpenBlock::Table {
                text: String::new(),
            }),
            Tag::CodeBlock(kind) => Some(OpenBlock::Code {
                language: code_language(kind),
                text: String::new(),
            }),
            Tag::BlockQuote(_) => Some(OpenBlock::BlockQuote {
                text: String::new(),
            }),
            Tag::HtmlBlock => Some(OpenBlock::Html {
                text: String::new(),
            }),
            // Anything else at the top level is not a block we track;
            // its contents are dropped until the matching End.
            _ => None,
        };
    }

    fn nested_start(&mut self, tag: &Tag<'_>) {
        if self.depth == 1
            && matches!(tag, Tag::Item)
            && let Some(OpenBlock::List { current, .. }) = &mut self.open
        {
            *current = Some(String::new());
            return;
        }
        self.pad_text();
    }

    fn close_list_item(&mut self) {
        if let Some(OpenBlock::List { items, current, .. }) = &mut self.open
            && let Some(text) = current.take()
        {
            items.push(ListItem {
                text: text.trim().to_string(),
            });
        }
    }

    fn flush(&mut self) {
        let Some(open) = self.open.take() else { return };
        let token = match open {
            OpenBlock::Heading { level, text } => Token::Heading {
                level,
                text: text.trim().to_string(),
            },
            OpenBlock::Paragraph { text } => Token::Paragraph {
                text: text.trim().to_string(),
            },
            OpenBlock::List { ordered, items, .. } => Token::List { ordered, items },
            OpenBlock::Table { text } => Token::Table {
                text: text.trim().to_string(),
            },
            OpenBlock::Code { language, text } => Token::Code { language, text },
            OpenBlock::BlockQuote { text } => Token::BlockQuote {
                text: text.trim().to_string(),
            },
            OpenBlock::Html { text } => Token::Html {
                text: text.trim().to_string(),
            },
        };
        self.out.push(token);
    }

    fn push_text(&mut self, piece: &str) {
        match &mut self.open {
            Some(
                OpenBlock::Heading { text, .. }
                | OpenBlock::Paragraph { text }
                | OpenBlock::Table { text }
                | OpenBlock::Code { text, .. }
                | OpenBlock::BlockQuote { text }
                | OpenBlock::Html { text },
            ) => text.push_str(piece),
            Some(OpenBlock::List {
                current: Some(text),
                ..
            }) => text.push_str(piece),
            _ => {}
        }
    }

    /// Separate pieces accumulated across nested block boundaries (e.g. the
    /// paragraphs of a blockquote, or a nested list inside an item) so they
    /// do not run together.
    fn pad_text(&mut self) {
        let sink = match &mut self.open {
            Some(
                OpenBlock::Heading { text, .. }
                | OpenBlock::Paragraph { text }
                | OpenBlock::Table { text }
                | OpenBlock::BlockQuote { text },
            ) => Some(text),
            Some(OpenBlock::List {
                current: Some(text),
                ..
            }) => Some(text),
            _ => None,
        };
        if let Some(text) = sink
            && !text.is_empty()
            && !text.ends_with(char::is_whitespace)
        {
            text.push(' ');
        }
    }
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn code_language(kind: &CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(info) => {
            let language = info
                .split(|c: char| c == ',' || c.is_whitespace())
                .next()
                .unwrap_or("");
            if language.is_empty() {
                None
            } else {
                Some(language.to_string())
            }
        }
        CodeBlockKind::Indented => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tokenizes_headings_in_document_order() {
        let tokens = tokenize("# First\n\n## Second\n\n# Third");
        assert_eq!(
            tokens,
            vec![
                Token::Heading {
                    level: 1,
                    text: "First".to_string()
                },
                Token::Heading {
                    level: 2,
                    text: "Second".to_string()
                },
                Token::Heading {
                    level: 1,
                    text: "Third".to_string()
                },
            ]
        );
    }

    #[test]
    fn heading_with_inline_formatting_keeps_plain_text() {
        let tokens = tokenize("## Some **bold** and `code` text");
        assert_eq!(
            tokens,
            vec![Token::Heading {
                level: 2,
                text: "Some bold and code text".to_string()
            }]
        );
    }

    #[test]
    fn unordered_list_becomes_one_token_with_items() {
        let tokens = tokenize("- first\n- second\n- third");
        assert_eq!(
            tokens,
            vec![Token::List {
                ordered: false,
                items: vec![
                    ListItem {
                        text: "first".to_string()
                    },
                    ListItem {
                        text: "second".to_string()
                    },
                    ListItem {
                        text: "third".to_string()
                    },
                ]
            }]
        );
    }

    #[test]
    fn ordered_list_is_flagged_ordered() {
        let tokens = tokenize("1. one\n2. two");
        match &tokens[0] {
            Token::List { ordered, items } => {
                assert!(*ordered);
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected list token, got {other:?}"),
        }
    }

    #[test]
    fn nested_list_text_folds_into_parent_item() {
        let tokens = tokenize("- parent\n  - child one\n  - child two\n- sibling");
        assert_eq!(
            tokens,
            vec![Token::List {
                ordered: false,
                items: vec![
                    ListItem {
                        text: "parent child one child two".to_string()
                    },
                    ListItem {
                        text: "sibling".to_string()
                    },
                ]
            }]
        );
    }

    #[test]
    fn fenced_code_keeps_language_and_body() {
        let tokens = tokenize("```rust\nfn main() {}\n```");
        assert_eq!(
            tokens,
            vec![Token::Code {
                language: Some("rust".to_string()),
                text: "fn main() {}\n".to_string()
            }]
        );
    }

    #[test]
    fn fence_without_language_has_none() {
        let tokens = tokenize("```\nplain\n```");
        assert_eq!(
            tokens,
            vec![Token::Code {
                language: None,
                text: "plain\n".to_string()
            }]
        );
    }

    #[test]
    fn blockquote_paragraphs_fold_into_one_token() {
        let tokens = tokenize("> quoted line\n>\n> more");
        assert_eq!(
            tokens,
            vec![Token::BlockQuote {
                text: "quoted line more".to_string()
            }]
        );
    }

    #[test]
    fn table_is_a_single_token() {
        let tokens = tokenize("| A | B |\n| --- | --- |\n| 1 | 2 |");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0], Token::Table { .. }));
    }

    #[test]
    fn html_block_and_rule_are_tokenized() {
        let tokens = tokenize("<div>raw</div>\n\n---\n\ntext");
        assert_eq!(
            tokens,
            vec![
                Token::Html {
                    text: "<div>raw</div>".to_string()
                },
                Token::Rule,
                Token::Paragraph {
                    text: "text".to_string()
                },
            ]
        );
    }

    #[test]
    fn soft_breaks_join_paragraph_lines_with_spaces() {
        let tokens = tokenize("line one\nline two");
        assert_eq!(
            tokens,
            vec![Token::Paragraph {
                text: "line one line two".to_string()
            }]
        );
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("").is_empty());
    }
}
