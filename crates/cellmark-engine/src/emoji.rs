//! Emoji shortcode expansion.
//!
//! `:name:` patterns are replaced against a fixed symbol table before the
//! markdown is tokenized. Unknown names pass through verbatim.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Shortcode names and the characters they expand to.
pub const EMOJI_TABLE: &[(&str, &str)] = &[
    ("smile", "\u{1F60A}"),
    ("grin", "\u{1F601}"),
    ("joy", "\u{1F602}"),
    ("wink", "\u{1F609}"),
    ("blush", "\u{263A}\u{FE0F}"),
    ("heart", "\u{2764}\u{FE0F}"),
    ("thumbs_up", "\u{1F44D}"),
    ("rocket", "\u{1F680}"),
    ("fire", "\u{1F525}"),
    ("star", "\u{2B50}\u{FE0F}"),
    ("tada", "\u{1F389}"),
    ("warning", "\u{26A0}\u{FE0F}"),
    ("check", "\u{2705}"),
    ("cross", "\u{274C}"),
    ("sparkle", "\u{2728}"),
    ("bulb", "\u{1F4A1}"),
];

static SHORTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i):([a-z0-9_+-]+):").expect("shortcode pattern"));

/// Expand known `:name:` shortcodes in `input`, leaving everything else
/// untouched.
pub fn replace_shortcodes(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    SHORTCODE
        .replace_all(input, |caps: &Captures<'_>| {
            match EMOJI_TABLE.iter().find(|(name, _)| *name == &caps[1]) {
                Some((_, emoji)) => (*emoji).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
