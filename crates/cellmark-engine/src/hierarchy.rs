//! Outline forest built from block tokens.
//!
//! Headings open nested scopes by depth; every other block attaches to the
//! innermost open heading (or the root when none is open yet). The result
//! is a proper tree: no node has more than one parent, and a heading's
//! ancestor chain is strictly increasing in level from root to leaf.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::Token;

/// Longest paragraph preview shown in the outline.
pub const PARAGRAPH_PREVIEW_CHARS: usize = 80;
/// Longest code preview shown in the outline (after the language prefix).
pub const CODE_PREVIEW_CHARS: usize = 60;

const LIST_LABEL: &str = "list";
const TABLE_LABEL: &str = "table";
const QUOTE_LABEL: &str = "quote";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Heading,
    List,
    ListItem,
    Table,
    Code,
    Paragraph,
    Blockquote,
}

/// One node of the outline forest.
///
/// Ids are freshly generated on every build; rebuilding the same document
/// yields new ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierNode {
    pub id: Uuid,
    pub kind: NodeKind,
    /// Heading depth 1-6; `None` for every other kind.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub level: Option<u8>,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<HierNode>,
}

impl HierNode {
    fn new(kind: NodeKind, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            level: None,
            text,
            children: Vec::new(),
        }
    }

    fn heading(level: u8, text: String) -> Self {
        Self {
            level: Some(level),
            ..Self::new(NodeKind::Heading, text)
        }
    }
}

/// Build the outline forest for an ordered token sequence.
///
/// Best effort by design: tokens the outline does not track ([`Token::Html`],
/// [`Token::Rule`]) are skipped silently, and this function never fails.
pub fn build_hierarchy(tokens: &[Token]) -> Vec<HierNode> {
    let mut builder = HierarchyBuilder::default();
    for token in tokens {
        builder.push(token);
    }
    builder.finish()
}

/// Explicit-stack builder: `stack` holds the open heading ancestry,
/// innermost last. A popped heading is attached to the node below it (or to
/// the roots), which keeps document order intact in every `children` list.
#[derive(Debug, Default)]
struct HierarchyBuilder {
    roots: Vec<HierNode>,
    stack: Vec<(HierNode, u8)>,
}

impl HierarchyBuilder {
    fn push(&mut self, token: &Token) {
        match token {
            Token::Heading { level, text } => {
                // A heading at depth D closes every open heading at depth
                // >= D: equal-depth headings are siblings, never nested.
                while self.stack.last().is_some_and(|(_, open)| *open >= *level) {
                    self.pop_heading();
                }
                self.stack.push((HierNode::heading(*level, text.clone()), *level));
            }
            Token::List { items, .. } => {
                let mut node = HierNode::new(NodeKind::List, LIST_LABEL.to_string());
                node.children = items
                    .iter()
                    .map(|item| HierNode::new(NodeKind::ListItem, item.text.clone()))
                    .collect();
                self.attach(node);
            }
            Token::Table { .. } => {
                self.attach(HierNode::new(NodeKind::Table, TABLE_LABEL.to_string()));
            }
            Token::Code { language, text } => {
                let mut preview = String::new();
                if let Some(language) = language {
                    preview.push('[');
                    preview.push_str(language);
                    preview.push_str("] ");
                }
                preview.push_str(&truncate_chars(text.trim_end(), CODE_PREVIEW_CHARS));
                self.attach(HierNode::new(NodeKind::Code, preview));
            }
            Token::Paragraph { text } => {
                self.attach(HierNode::new(
                    NodeKind::Paragraph,
                    truncate_chars(text, PARAGRAPH_PREVIEW_CHARS),
                ));
            }
            Token::BlockQuote { .. } => {
                self.attach(HierNode::new(NodeKind::Blockquote, QUOTE_LABEL.to_string()));
            }
            Token::Html { .. } | Token::Rule => {}
        }
    }

    fn finish(mut self) -> Vec<HierNode> {
        while !self.stack.is_empty() {
            self.pop_heading();
        }
        self.roots
    }

    fn attach(&mut self, node: HierNode) {
        match self.stack.last_mut() {
            Some((open, _)) => open.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn pop_heading(&mut self) {
        if let Some((node, _)) = self.stack.pop() {
            self.attach(node);
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => text[..byte_offset].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn build(markdown: &str) -> Vec<HierNode> {
        build_hierarchy(&tokenize(markdown))
    }

    /// Every heading's ancestor chain must be strictly increasing in level
    /// from root to leaf.
    fn assert_heading_nesting(nodes: &[HierNode], enclosing_level: u8) {
        for node in nodes {
            if let Some(level) = node.level {
                assert!(
                    level > enclosing_level,
                    "heading {:?} (level {level}) nested under level {enclosing_level}",
                    node.text
                );
                assert_heading_nesting(&node.children, level);
            } else {
                assert_heading_nesting(&node.children, enclosing_level);
            }
        }
    }

    fn collect_texts(nodes: &[HierNode], out: &mut Vec<String>) {
        for node in nodes {
            out.push(node.text.clone());
            collect_texts(&node.children, out);
        }
    }

    #[test]
    fn nests_headings_lists_and_paragraphs() {
        let forest = build("# A\n\n## B\n\nText\n\n- i1\n- i2\n\n### C");

        assert_eq!(forest.len(), 1);
        let a = &forest[0];
        assert_eq!((a.kind, a.level, a.text.as_str()), (NodeKind::Heading, Some(1), "A"));

        assert_eq!(a.children.len(), 1);
        let b = &a.children[0];
        assert_eq!((b.kind, b.level, b.text.as_str()), (NodeKind::Heading, Some(2), "B"));

        let kinds: Vec<NodeKind> = b.children.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Paragraph, NodeKind::List, NodeKind::Heading]
        );
        assert_eq!(b.children[0].text, "Text");

        let list = &b.children[1];
        let items: Vec<&str> = list.children.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(items, vec!["i1", "i2"]);

        let c = &b.children[2];
        assert_eq!((c.level, c.text.as_str()), (Some(3), "C"));
    }

    #[test]
    fn equal_depth_headings_are_siblings() {
        let forest = build("## One\n\n## Two\n\n## Three");
        let texts: Vec<&str> = forest.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["One", "Two", "Three"]);
        assert!(forest.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn skipped_levels_still_nest_under_nearest_shallower_heading() {
        let forest = build("# Top\n\n### Deep\n\n## Middle");
        assert_eq!(forest.len(), 1);
        let top = &forest[0];
        // H3 nests under H1 even though H2 was skipped; the later H2 closes
        // the H3 and becomes a sibling of it under H1.
        let children: Vec<(Option<u8>, &str)> = top
            .children
            .iter()
            .map(|n| (n.level, n.text.as_str()))
            .collect();
        assert_eq!(children, vec![(Some(3), "Deep"), (Some(2), "Middle")]);
    }

    #[test]
    fn deeper_heading_closes_back_to_matching_ancestor() {
        let forest = build("# A\n\n## B\n\n### C\n\n## D");
        let a = &forest[0];
        let levels: Vec<Option<u8>> = a.children.iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![Some(2), Some(2)]);
        assert_eq!(a.children[0].children[0].text, "C");
        assert_heading_nesting(&forest, 0);
    }

    #[test]
    fn content_before_any_heading_lands_at_the_root() {
        let forest = build("Intro paragraph\n\n# Later");
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].kind, NodeKind::Paragraph);
        assert_eq!(forest[1].kind, NodeKind::Heading);
    }

    #[test]
    fn depth_first_order_matches_token_order() {
        let markdown = "para0\n\n# A\n\npara1\n\n## B\n\npara2\n\n# C\n\npara3";
        let forest = build(markdown);
        let mut texts = Vec::new();
        collect_texts(&forest, &mut texts);
        assert_eq!(texts, vec!["para0", "A", "para1", "B", "para2", "C", "para3"]);
        assert_heading_nesting(&forest, 0);
    }

    #[test]
    fn duplicate_headings_get_distinct_nodes_and_ids() {
        let forest = build("# Same\n\n# Same");
        assert_eq!(forest.len(), 2);
        assert_ne!(forest[0].id, forest[1].id);
    }

    #[test]
    fn ids_are_fresh_on_every_build() {
        let tokens = tokenize("# A");
        let first = build_hierarchy(&tokens);
        let second = build_hierarchy(&tokens);
        assert_ne!(first[0].id, second[0].id);
    }

    #[test]
    fn code_preview_carries_language_prefix_and_truncates() {
        let long_body = "x".repeat(200);
        let forest = build(&format!("```rust\n{long_body}\n```"));
        assert_eq!(forest[0].kind, NodeKind::Code);
        assert!(forest[0].text.starts_with("[rust] "));
        assert_eq!(forest[0].text.len(), "[rust] ".len() + CODE_PREVIEW_CHARS);
    }

    #[test]
    fn paragraph_preview_truncates_on_char_boundaries() {
        let long = "é".repeat(120);
        let forest = build(&long);
        assert_eq!(forest[0].text.chars().count(), PARAGRAPH_PREVIEW_CHARS);
    }

    #[test]
    fn table_and_quote_use_placeholder_labels() {
        let forest = build("| A |\n| --- |\n| 1 |\n\n> quoted");
        assert_eq!(forest[0].text, "table");
        assert_eq!(forest[1].text, "quote");
    }

    #[test]
    fn html_and_rules_are_skipped() {
        let forest = build("<div>raw</div>\n\n---\n\n# Kept");
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].text, "Kept");
    }

    #[test]
    fn empty_token_sequence_yields_empty_forest() {
        assert!(build_hierarchy(&[]).is_empty());
    }

    #[rstest]
    #[case("#", "")]
    #[case("# ", "")]
    fn heading_with_no_text_still_creates_a_node(#[case] markdown: &str, #[case] expected: &str) {
        let forest = build(markdown);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].text, expected);
    }
}
