//! Page segmentation.
//!
//! A page is cut into sections; each section's body goes through footnote
//! extraction and is then flattened into [`ContentUnit`]s, split at every
//! subheading and nested heading.

use std::collections::HashSet;

use scraper::{ElementRef, Html};

use super::config::{CompiledMarkup, MarkupConfig};
use super::footnotes::{extract_footnotes, BodyNode};
use super::utils::get_text;
use crate::error::Result;
use crate::resolver::KeyResolver;
use crate::types::{CanonicalKey, ContentUnit, FootnoteMarker, SectionFragment, TextRun};

/// Maximum number of consecutive line breaks kept in a run.
const MAX_NEWLINES: usize = 2;

/// Whitespace waiting to be written before the next visible character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Space,
    Newlines(usize),
}

/// Accumulates one [`TextRun`].
///
/// Whitespace is collapsed lazily: it is only written once more text follows,
/// so a run never starts or ends with whitespace and footnote markers stick to
/// the word before them.
#[derive(Debug)]
struct RunBuilder {
    text: String,
    markers: Vec<FootnoteMarker>,
    pending: Pending,
    glued: bool,
}

impl RunBuilder {
    fn new() -> Self {
        Self {
            text: String::new(),
            markers: Vec::new(),
            pending: Pending::None,
            glued: false,
        }
    }

    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.space();
            } else {
                self.flush_pending();
                self.text.push(c);
                self.glued = false;
            }
        }
    }

    fn space(&mut self) {
        if !self.glued && self.pending == Pending::None {
            self.pending = Pending::Space;
        }
    }

    fn line_break(&mut self) {
        self.pending = match self.pending {
            Pending::Newlines(n) => Pending::Newlines((n + 1).min(MAX_NEWLINES)),
            Pending::None | Pending::Space => Pending::Newlines(1),
        };
    }

    fn paragraph_break(&mut self) {
        self.pending = Pending::Newlines(MAX_NEWLINES);
    }

    /// Write a glyph that must not be followed by a space.
    fn open_glyph(&mut self, glyph: &str) {
        self.push_text(glyph);
        self.glued = true;
    }

    /// Write a glyph that must not be preceded by whitespace.
    ///
    /// A pending line break moves after the glyph.
    fn close_glyph(&mut self, glyph: &str) {
        let deferred = std::mem::replace(&mut self.pending, Pending::None);
        self.glued = false;
        self.push_text(glyph);
        if let Pending::Newlines(_) = deferred {
            self.pending = deferred;
        }
    }

    fn marker(&mut self, local: u32) {
        self.markers.push(FootnoteMarker {
            local,
            offset: self.text.len(),
        });
    }

    fn flush_pending(&mut self) {
        if self.text.is_empty() {
            self.pending = Pending::None;
            return;
        }
        match self.pending {
            Pending::None => {}
            Pending::Space => self.text.push(' '),
            Pending::Newlines(n) => {
                for _ in 0..n {
                    self.text.push('\n');
                }
            }
        }
        self.pending = Pending::None;
    }

    /// Take the finished run, leaving the builder empty.
    fn finish(&mut self) -> Option<TextRun> {
        let builder = std::mem::replace(self, Self::new());
        if builder.text.is_empty() && builder.markers.is_empty() {
            return None;
        }
        let len = builder.text.len();
        let footnotes = builder
            .markers
            .into_iter()
            .map(|marker| FootnoteMarker {
                offset: marker.offset.min(len),
                ..marker
            })
            .collect();
        Some(TextRun {
            text: builder.text,
            footnotes,
        })
    }
}

/// Second pass: flattens a [`BodyNode`] tree into content units.
struct UnitWriter<'m> {
    markup: &'m CompiledMarkup,
    units: Vec<ContentUnit>,
    run: RunBuilder,
}

impl<'m> UnitWriter<'m> {
    fn new(markup: &'m CompiledMarkup) -> Self {
        Self {
            markup,
            units: Vec::new(),
            run: RunBuilder::new(),
        }
    }

    fn write_all(&mut self, nodes: &[BodyNode]) {
        for node in nodes {
            self.write(node);
        }
    }

    fn write(&mut self, node: &BodyNode) {
        match node {
            BodyNode::Text(text) => self.run.push_text(text),
            BodyNode::LineBreak => self.run.line_break(),
            BodyNode::Footnote(local) => self.run.marker(*local),
            BodyNode::Block(children) => {
                self.run.paragraph_break();
                self.write_all(children);
                self.run.paragraph_break();
            }
            BodyNode::Quote(children) => {
                if node.has_visible_text() {
                    let markup = self.markup;
                    self.run.open_glyph(&markup.quote_open);
                    self.write_all(children);
                    self.run.close_glyph(&markup.quote_close);
                } else {
                    self.write_all(children);
                }
            }
            BodyNode::Subheading(text) => {
                self.flush_run();
                self.units.push(ContentUnit::Subheading(text.clone()));
            }
            BodyNode::Heading(text) => {
                self.flush_run();
                self.units.push(ContentUnit::Heading(text.clone()));
            }
        }
    }

    fn flush_run(&mut self) {
        if let Some(run) = self.run.finish() {
            self.units.push(ContentUnit::TextRun(run));
        }
    }

    fn finish(mut self) -> Vec<ContentUnit> {
        self.flush_run();
        self.units
    }
}

/// Flatten an extracted body into content units.
///
/// Text before the first subheading becomes its own leading run.
pub fn split_units(nodes: &[BodyNode], markup: &CompiledMarkup) -> Vec<ContentUnit> {
    let mut writer = UnitWriter::new(markup);
    writer.write_all(nodes);
    writer.finish()
}

/// Cuts pages into [`SectionFragment`]s.
#[derive(Debug, Clone)]
pub struct Segmenter {
    markup: CompiledMarkup,
}

impl Segmenter {
    /// Create a segmenter for a page layout.
    ///
    /// # Errors
    /// Returns `InvalidSelector` if a selector in `config` does not parse.
    pub fn new(config: &MarkupConfig) -> Result<Self> {
        Ok(Self {
            markup: CompiledMarkup::new(config)?,
        })
    }

    /// Create a segmenter for the built-in page layout.
    ///
    /// # Errors
    /// Returns `InvalidSelector` if a default selector does not parse.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&MarkupConfig::default())
    }

    /// Parse and segment one page.
    pub fn segment(&self, html: &str, resolver: &mut KeyResolver) -> Vec<SectionFragment> {
        let document = Html::parse_document(html);
        self.segment_document(&document, resolver)
    }

    /// Segment an already parsed page.
    ///
    /// Sections are visited in document order. A section is skipped when its
    /// heading is missing, empty or a UI artifact, when it has no body, when
    /// its body yields no content, or when an earlier section of the same
    /// page already produced a fragment for the same key.
    pub fn segment_document(
        &self,
        document: &Html,
        resolver: &mut KeyResolver,
    ) -> Vec<SectionFragment> {
        let mut fragments = Vec::new();
        let mut seen = HashSet::new();

        for section in document.select(&self.markup.section) {
            let Some(fragment) = self.segment_section(section, resolver, &seen) else {
                continue;
            };
            seen.insert(fragment.key.clone());
            fragments.push(fragment);
        }

        fragments
    }

    fn segment_section(
        &self,
        section: ElementRef<'_>,
        resolver: &mut KeyResolver,
        seen: &HashSet<CanonicalKey>,
    ) -> Option<SectionFragment> {
        let Some(heading_element) = section.select(&self.markup.heading).next() else {
            tracing::debug!("Skipped section without heading");
            return None;
        };
        if self.markup.is_excluded_heading(heading_element) {
            tracing::debug!("Skipped section with excluded heading");
            return None;
        }

        let heading = get_text(heading_element);
        if heading.is_empty() {
            tracing::debug!("Skipped section with empty heading");
            return None;
        }

        let roots: Vec<ElementRef<'_>> = section.select(&self.markup.body).collect();
        if roots.is_empty() {
            tracing::debug!(heading = %heading, "Skipped section without body");
            return None;
        }

        let extracted = extract_footnotes(&roots, &self.markup);
        let units = split_units(&extracted.nodes, &self.markup);
        if units.is_empty() {
            tracing::debug!(heading = %heading, "Skipped section with empty body");
            return None;
        }

        // Only headings with content may define a key
        let key = resolver.resolve(&heading);
        if seen.contains(&key) {
            tracing::debug!(heading = %heading, key = %key, "Skipped duplicate heading on page");
            return None;
        }

        Some(SectionFragment {
            key,
            heading,
            units,
            footnotes: extracted.footnotes,
        })
    }
}
