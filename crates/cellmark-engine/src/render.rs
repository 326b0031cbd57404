//! Tokenize + render orchestration.
//!
//! The input is parsed once into an event stream; the same events feed the
//! block lexer and the HTML renderer so the two outputs can never drift.
//! Code blocks are swapped for highlighted fragments before rendering, so
//! the raw HTML already carries `hljs` markup when it reaches the
//! sanitizer.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Parser, Tag, html};

use crate::highlight::Highlighter;
use crate::token::{self, Token};

/// Parse prepared markdown into `(raw_html, tokens)`.
///
/// The HTML is unsanitized renderer output; callers must sanitize it before
/// it reaches any presentation surface.
pub(crate) fn parse_markdown(markdown: &str, highlighter: &Highlighter) -> (String, Vec<Token>) {
    let events: Vec<Event<'_>> = Parser::new_ext(markdown, token::markdown_options()).collect();
    let tokens = token::tokens_from_events(&events);
    let html = render_events(events, highlighter);
    (html, tokens)
}

fn render_events(events: Vec<Event<'_>>, highlighter: &Highlighter) -> String {
    let mut rendered = Vec::with_capacity(events.len());
    let mut open_code: Option<(Option<String>, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                open_code = Some((fence_language(&kind), String::new()));
            }
            Event::Text(text) if open_code.is_some() => {
                if let Some((_, body)) = &mut open_code {
                    body.push_str(&text);
                }
            }
            // The only End inside a code block is the block's own.
            end @ Event::End(_) => match open_code.take() {
                Some((language, body)) => {
                    let fragment = highlighter.highlight_block(language.as_deref(), &body);
                    rendered.push(Event::Html(CowStr::from(fragment)));
                }
                None => rendered.push(end),
            },
            other => rendered.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, rendered.into_iter());
    out
}

fn fence_language(kind: &CodeBlockKind<'_>) -> Option<String> {
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
