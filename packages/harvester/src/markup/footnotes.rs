//! Footnote extraction, the first pass over a section body.
//!
//! The DOM below the body roots is copied into an owned [`BodyNode`] tree.
//! Every footnote annotation is replaced by a [`BodyNode::Footnote`] marker
//! carrying a local number, and the annotation's text moves into a
//! [`LocalFootnoteTable`]. The source DOM is never modified; the segmenter
//! only ever sees the returned tree.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

use super::config::{CompiledMarkup, NodeKind};
use crate::normalize::collapse_whitespace;
use crate::types::LocalFootnoteTable;

/// Source number a footnote body may start with, e.g. `[12]`.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SOURCE_NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\s*\d+\s*\]\s*").expect("valid regex"));

/// A section body with footnote annotations replaced by markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyNode {
    /// Raw text, whitespace not yet collapsed.
    Text(String),

    /// Explicit line break.
    LineBreak,

    /// Paragraph-level container.
    Block(Vec<BodyNode>),

    /// Heading element found inside the body.
    Heading(String),

    /// Subheading marker text.
    Subheading(String),

    /// Quoted verse.
    Quote(Vec<BodyNode>),

    /// Reference to a local footnote number.
    Footnote(u32),
}

impl BodyNode {
    /// Whether the node renders any non-whitespace text.
    #[must_use]
    pub fn has_visible_text(&self) -> bool {
        match self {
            Self::Text(text) => !text.trim().is_empty(),
            Self::Heading(text) | Self::Subheading(text) => !text.is_empty(),
            Self::Block(children) | Self::Quote(children) => {
                children.iter().any(Self::has_visible_text)
            }
            Self::LineBreak | Self::Footnote(_) => false,
        }
    }
}

/// Output of the extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBody {
    /// One [`BodyNode::Block`] per body root, in document order.
    pub nodes: Vec<BodyNode>,

    /// Bodies of every marker in `nodes`.
    pub footnotes: LocalFootnoteTable,
}

/// Extract footnotes from a list of body roots with one shared numbering.
///
/// Numbers start at 1 and follow document order across all roots.
/// Annotations whose text is empty after cleanup are dropped without a
/// marker; an annotation nested inside another one gets its own number,
/// and its marker follows the outer one.
pub fn extract_footnotes(roots: &[ElementRef<'_>], markup: &CompiledMarkup) -> ExtractedBody {
    let mut extractor = FootnoteExtractor::new(markup);
    let nodes = roots
        .iter()
        .map(|root| BodyNode::Block(extractor.convert_children(*root)))
        .collect();
    ExtractedBody {
        nodes,
        footnotes: extractor.table,
    }
}

/// Walks a body subtree, numbering footnote annotations as it meets them.
struct FootnoteExtractor<'m> {
    markup: &'m CompiledMarkup,
    last_number: u32,
    table: LocalFootnoteTable,
}

impl<'m> FootnoteExtractor<'m> {
    fn new(markup: &'m CompiledMarkup) -> Self {
        Self {
            markup,
            last_number: 0,
            table: LocalFootnoteTable::new(),
        }
    }

    fn convert_children(&mut self, element: ElementRef<'_>) -> Vec<BodyNode> {
        let markup = self.markup;
        let mut out = Vec::new();
        for kind in markup.child_kinds(element) {
            self.convert(kind, &mut out);
        }
        out
    }

    fn convert(&mut self, kind: NodeKind<'_>, out: &mut Vec<BodyNode>) {
        match kind {
            NodeKind::Text(text) => out.push(BodyNode::Text(text.to_string())),
            NodeKind::LineBreak => out.push(BodyNode::LineBreak),
            NodeKind::Footnote(element) => {
                let numbers = self.register(element);
                out.extend(numbers.into_iter().map(BodyNode::Footnote));
            }
            NodeKind::Subheading(element) => {
                let (text, markers) = self.label(element);
                if !text.is_empty() {
                    out.push(BodyNode::Subheading(text));
                }
                out.extend(markers);
            }
            NodeKind::Heading(element) => {
                let (text, markers) = self.label(element);
                if !text.is_empty() {
                    out.push(BodyNode::Heading(text));
                }
                out.extend(markers);
            }
            NodeKind::Quote(element) => {
                let children = self.convert_children(element);
                out.push(BodyNode::Quote(children));
            }
            NodeKind::Block(element) => {
                let children = self.convert_children(element);
                out.push(BodyNode::Block(children));
            }
            NodeKind::Inline(element) => {
                let children = self.convert_children(element);
                out.extend(children);
            }
            NodeKind::Skip => {}
        }
    }

    /// Text of a heading-like element plus the markers of any footnotes
    /// inside it, which follow the label in the output.
    fn label(&mut self, element: ElementRef<'_>) -> (String, Vec<BodyNode>) {
        let children = self.convert_children(element);
        let mut text = String::new();
        let mut markers = Vec::new();
        flatten_label(&children, &mut text, &mut markers);
        (collapse_whitespace(&text), markers)
    }

    /// Number an annotation and every annotation nested inside it.
    ///
    /// Numbers follow the order in which the annotations open, so an outer
    /// annotation precedes its nested ones. Annotations whose text is empty
    /// are dropped without a number.
    fn register(&mut self, element: ElementRef<'_>) -> Vec<u32> {
        let mut raw = String::new();
        let mut nested = Vec::new();
        visible_text(self.markup, element, &mut raw, &mut nested);
        let collapsed = collapse_whitespace(&raw);
        let body = SOURCE_NUMBER_PREFIX.replace(&collapsed, "").trim().to_string();

        let mut numbers = Vec::new();
        if body.is_empty() {
            tracing::debug!(raw = %collapsed, "Dropped empty footnote");
        } else {
            self.last_number += 1;
            self.table.insert(self.last_number, body);
            numbers.push(self.last_number);
        }

        for inner in nested {
            numbers.extend(self.register(inner));
        }
        numbers
    }
}

/// Concatenate the text below `element`, skipping noise.
///
/// Nested annotations are collected into `nested` instead of contributing
/// text.
fn visible_text<'a>(
    markup: &CompiledMarkup,
    element: ElementRef<'a>,
    out: &mut String,
    nested: &mut Vec<ElementRef<'a>>,
) {
    for kind in markup.child_kinds(element) {
        match kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::LineBreak => out.push(' '),
            NodeKind::Block(child) => {
                out.push(' ');
                visible_text(markup, child, out, nested);
                out.push(' ');
            }
            NodeKind::Footnote(child) => {
                out.push(' ');
                nested.push(child);
            }
            NodeKind::Subheading(child)
            | NodeKind::Quote(child)
            | NodeKind::Heading(child)
            | NodeKind::Inline(child) => visible_text(markup, child, out, nested),
            NodeKind::Skip => {}
        }
    }
}

fn flatten_label(nodes: &[BodyNode], text: &mut String, markers: &mut Vec<BodyNode>) {
    for node in nodes {
        match node {
            BodyNode::Text(part) | BodyNode::Heading(part) | BodyNode::Subheading(part) => {
                text.push_str(part);
            }
            BodyNode::LineBreak => text.push(' '),
            BodyNode::Block(children) | BodyNode::Quote(children) => {
                flatten_label(children, text, markers);
            }
            BodyNode::Footnote(number) => markers.push(BodyNode::Footnote(*number)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::config::MarkupConfig;
    use pretty_assertions::assert_eq;
    use scraper::{Html, Selector};

    fn extract(html: &str) -> ExtractedBody {
        let markup = CompiledMarkup::new(&MarkupConfig::default()).unwrap();
        let fragment = Html::parse_fragment(html);
        let selector = Selector::parse("p").unwrap();
        let roots: Vec<_> = fragment.select(&selector).collect();
        extract_footnotes(&roots, &markup)
    }

    fn markers(nodes: &[BodyNode], out: &mut Vec<u32>) {
        for node in nodes {
            match node {
                BodyNode::Footnote(n) => out.push(*n),
                BodyNode::Block(children) | BodyNode::Quote(children) => markers(children, out),
                _ => {}
            }
        }
    }

    #[test]
    fn test_footnotes_numbered_in_document_order() {
        let body = extract(
            r#"<p>أول<span class="tip">[7] حاشية أولى</span> ثم
            <b>ثان<span class="tip">[8] حاشية ثانية</span></b></p>
            <p>ثالث<span class="tip">حاشية ثالثة</span></p>"#,
        );

        let bodies: Vec<(u32, &str)> = body.footnotes.iter().collect();
        assert_eq!(
            bodies,
            vec![(1, "حاشية أولى"), (2, "حاشية ثانية"), (3, "حاشية ثالثة")]
        );

        let mut found = Vec::new();
        markers(&body.nodes, &mut found);
        assert_eq!(found, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_footnote_is_dropped() {
        let body = extract(
            r#"<p>a<span class="tip">[3] </span>b<span class="tip">  </span>c<span class="tip">note</span></p>"#,
        );
        assert_eq!(body.footnotes.len(), 1);
        assert_eq!(body.footnotes.get(1), Some("note"));

        let mut found = Vec::new();
        markers(&body.nodes, &mut found);
        assert_eq!(found, vec![1]);
    }

    #[test]
    fn test_nested_footnotes_get_their_own_numbers() {
        let body = extract(
            r#"<p>x<span class="tip">outer <span class="tip">inner</span> end</span> y<span class="tip">last</span></p>"#,
        );

        let bodies: Vec<(u32, &str)> = body.footnotes.iter().collect();
        assert_eq!(bodies, vec![(1, "outer end"), (2, "inner"), (3, "last")]);

        let mut found = Vec::new();
        markers(&body.nodes, &mut found);
        assert_eq!(found, vec![1, 2, 3]);
    }

    #[test]
    fn test_nested_footnote_survives_empty_outer() {
        let body = extract(r#"<p>x<span class="tip">[4] <span class="tip">inner</span></span></p>"#);
        assert_eq!(body.footnotes.len(), 1);
        assert_eq!(body.footnotes.get(1), Some("inner"));
    }

    #[test]
    fn test_noise_inside_footnote_is_skipped() {
        let body = extract(
            r#"<p>x<span class="tip">[1] نص <a href="/s"><i class="fa-external-link"></i>رابط</a><button>نسخ</button></span></p>"#,
        );
        assert_eq!(body.footnotes.get(1), Some("نص"));
    }

    #[test]
    fn test_footnote_inside_subheading_follows_label() {
        let body = extract(
            r#"<p><span class="title-1">عنوان<span class="tip">حاشية</span></span>نص</p>"#,
        );
        assert_eq!(
            body.nodes,
            vec![BodyNode::Block(vec![
                BodyNode::Subheading("عنوان".to_string()),
                BodyNode::Footnote(1),
                BodyNode::Text("نص".to_string()),
            ])]
        );
    }

    #[test]
    fn test_empty_subheading_is_not_emitted() {
        let body = extract(r#"<p>a<span class="title-1"> </span>b</p>"#);
        assert_eq!(
            body.nodes,
            vec![BodyNode::Block(vec![
                BodyNode::Text("a".to_string()),
                BodyNode::Text("b".to_string()),
            ])]
        );
    }

    #[test]
    fn test_has_visible_text() {
        assert!(BodyNode::Text(" x ".to_string()).has_visible_text());
        assert!(!BodyNode::Quote(vec![BodyNode::Text("  ".to_string())]).has_visible_text());
        assert!(!BodyNode::Block(vec![BodyNode::Footnote(1), BodyNode::LineBreak]).has_visible_text());
    }
}
