//! HTML sanitization.
//!
//! Every rendered document passes through here before it reaches a
//! presentation surface; the raw renderer output is never published.
//! ammonia's allow-list keeps the semantic structure (headings, emphasis,
//! lists, tables, blockquotes, code, links, images) and drops script
//! elements, inline event handlers and `javascript:` URLs. The allow-list
//! is widened just enough for highlight classes and task-list checkboxes
//! to survive.

use ammonia::Builder;

pub struct Sanitizer {
    builder: Builder<'static>,
}

impl Sanitizer {
    pub fn new() -> Self {
        let mut builder = Builder::default();
        builder
            .add_tags(["input"])
            .add_tag_attributes("input", ["type", "checked", "disabled"])
            .add_tag_attributes("pre", ["class"])
            .add_tag_attributes("code", ["class"])
            .add_tag_attributes("span", ["class"]);
        Self { builder }
    }

    /// Sanitize rendered HTML. Idempotent: cleaning already-clean HTML is a
    /// no-op.
    pub fn sanitize(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }
        self.builder.clean(html).to_string()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}
