//! Markup configuration and node classification.
//!
//! [`MarkupConfig`] names the CSS selectors and tags that describe a source
//! page. [`CompiledMarkup`] holds the parsed selectors and maps every DOM node
//! onto one [`NodeKind`], which is the only place the segmenter looks at raw
//! markup.

use scraper::node::Node;
use scraper::{ElementRef, Selector};

use crate::error::{HarvesterError, Result};
use crate::markup::utils::{has_any_class, tag_name};

/// Tags that end a run of inline text and start a new paragraph.
const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "blockquote",
    "ul",
    "ol",
    "li",
    "table",
    "tr",
    "td",
    "th",
];

/// Tags treated as headings when they occur inside a section body.
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Selectors and tag lists describing one source site's page layout.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupConfig {
    /// Top-level section container.
    pub section: String,

    /// Heading element inside a section.
    pub heading: String,

    /// Classes marking a heading match as a UI artifact.
    pub excluded_heading_classes: Vec<String>,

    /// Body roots inside a section, walked in document order.
    pub body: String,

    /// Inline subheading marker.
    pub subheading: String,

    /// Inline footnote annotation.
    pub footnote: String,

    /// Quoted verse span.
    pub quote: String,

    /// Glyph opening a quoted verse.
    pub quote_open: String,

    /// Glyph closing a quoted verse.
    pub quote_close: String,

    /// Tags whose content never contributes text.
    pub skipped_tags: Vec<String>,

    /// Icon marking an anchor as an external-link button.
    pub external_link_icon: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            section: "article.border-bottom".to_string(),
            heading: "h5.default-text-color".to_string(),
            excluded_heading_classes: vec![
                "modal-title".to_string(),
                "th5-responsive".to_string(),
                "ext-uppercase".to_string(),
            ],
            body: "p".to_string(),
            subheading: "span.title-1".to_string(),
            footnote: "span.tip".to_string(),
            quote: "span.aaya".to_string(),
            quote_open: "﴿".to_string(),
            quote_close: "﴾".to_string(),
            skipped_tags: ["script", "style", "nav", "footer", "button"]
                .into_iter()
                .map(String::from)
                .collect(),
            external_link_icon: "i.fa-external-link".to_string(),
        }
    }
}

/// Structural role of one DOM node.
#[derive(Debug, Clone, Copy)]
pub enum NodeKind<'a> {
    /// Bare text.
    Text(&'a str),
    /// `<br>`.
    LineBreak,
    /// Footnote annotation.
    Footnote(ElementRef<'a>),
    /// Inline subheading marker.
    Subheading(ElementRef<'a>),
    /// Quoted verse span.
    Quote(ElementRef<'a>),
    /// Heading element nested in the body.
    Heading(ElementRef<'a>),
    /// Paragraph-level container.
    Block(ElementRef<'a>),
    /// Any other element; its children are walked in place.
    Inline(ElementRef<'a>),
    /// Comments, UI noise and everything else without visible text.
    Skip,
}

/// A [`MarkupConfig`] with its selectors parsed.
#[derive(Debug, Clone)]
pub struct CompiledMarkup {
    pub(crate) section: Selector,
    pub(crate) heading: Selector,
    pub(crate) body: Selector,
    subheading: Selector,
    footnote: Selector,
    quote: Selector,
    external_link_icon: Selector,
    excluded_heading_classes: Vec<String>,
    skipped_tags: Vec<String>,
    pub(crate) quote_open: String,
    pub(crate) quote_close: String,
}

impl CompiledMarkup {
    /// Parse every selector of `config`.
    ///
    /// # Errors
    /// Returns `InvalidSelector` naming the first selector that fails to parse.
    pub fn new(config: &MarkupConfig) -> Result<Self> {
        Ok(Self {
            section: parse_selector(&config.section)?,
            heading: parse_selector(&config.heading)?,
            body: parse_selector(&config.body)?,
            subheading: parse_selector(&config.subheading)?,
            footnote: parse_selector(&config.footnote)?,
            quote: parse_selector(&config.quote)?,
            external_link_icon: parse_selector(&config.external_link_icon)?,
            excluded_heading_classes: config.excluded_heading_classes.clone(),
            skipped_tags: config
                .skipped_tags
                .iter()
                .map(|tag| tag.to_ascii_lowercase())
                .collect(),
            quote_open: config.quote_open.clone(),
            quote_close: config.quote_close.clone(),
        })
    }

    /// Classify the children of `element` in document order.
    pub fn child_kinds<'a, 's>(
        &'s self,
        element: ElementRef<'a>,
    ) -> impl Iterator<Item = NodeKind<'a>> + 's
    where
        'a: 's,
    {
        element.children().map(move |node| match node.value() {
            Node::Text(text) => NodeKind::Text(&**text),
            Node::Element(_) => {
                ElementRef::wrap(node).map_or(NodeKind::Skip, |child| self.classify(child))
            }
            _ => NodeKind::Skip,
        })
    }

    /// Classify one element.
    ///
    /// Noise is checked first, so a footnote inside a `<script>` is skipped.
    pub fn classify<'a>(&self, element: ElementRef<'a>) -> NodeKind<'a> {
        let tag = tag_name(element);

        if self.is_noise(element) {
            return NodeKind::Skip;
        }
        if tag == "br" {
            return NodeKind::LineBreak;
        }
        if self.footnote.matches(&element) {
            return NodeKind::Footnote(element);
        }
        if self.subheading.matches(&element) {
            return NodeKind::Subheading(element);
        }
        if self.quote.matches(&element) {
            return NodeKind::Quote(element);
        }
        if HEADING_TAGS.contains(&tag) {
            return NodeKind::Heading(element);
        }
        if BLOCK_TAGS.contains(&tag) {
            return NodeKind::Block(element);
        }
        NodeKind::Inline(element)
    }

    /// Whether an element is UI noise: a skipped tag or an external-link
    /// anchor.
    pub fn is_noise(&self, element: ElementRef<'_>) -> bool {
        let tag = tag_name(element);
        if self.skipped_tags.iter().any(|skipped| skipped == tag) {
            return true;
        }
        tag == "a" && element.select(&self.external_link_icon).next().is_some()
    }

    /// Whether a heading match carries one of the excluded classes.
    pub fn is_excluded_heading(&self, element: ElementRef<'_>) -> bool {
        has_any_class(element, &self.excluded_heading_classes)
    }
}

/// Parse one CSS selector, keeping the offending text in the error.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| HarvesterError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
