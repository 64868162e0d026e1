//! Core data types for the harvester.
//!
//! A page yields [`SectionFragment`]s; the store turns each fragment into an
//! [`Entry`] of a [`TopicRecord`]. Everything here is immutable once built.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Stable identity of one topic cluster.
///
/// The wrapped string is the normalized form of the first heading seen for
/// the cluster. Treat it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// Wrap an already normalized string.
    #[must_use]
    pub fn new(normalized: impl Into<String>) -> Self {
        Self(normalized.into())
    }

    /// Borrow the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of an inline footnote reference inside a [`TextRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FootnoteMarker {
    /// Local footnote number, resolvable in the entry's [`LocalFootnoteTable`].
    pub local: u32,

    /// Byte offset into [`TextRun::text`] where the reference sits.
    pub offset: usize,
}

/// A stretch of prose with its inline footnote references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRun {
    /// Prose with whitespace collapsed; `\n` marks explicit line breaks.
    pub text: String,

    /// Footnote references in ascending offset order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<FootnoteMarker>,
}

impl TextRun {
    /// Create a run without footnotes.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            footnotes: Vec::new(),
        }
    }

    /// Rebuild the text with a label spliced in at each marker.
    ///
    /// `label` receives the local number; returning `None` drops the marker.
    pub fn splice_markers(&self, mut label: impl FnMut(u32) -> Option<String>) -> String {
        let mut out = String::with_capacity(self.text.len() + self.footnotes.len() * 6);
        let mut cursor = 0;

        for marker in &self.footnotes {
            let offset = marker.offset.min(self.text.len());
            if offset > cursor {
                if let Some(slice) = self.text.get(cursor..offset) {
                    out.push_str(slice);
                    cursor = offset;
                }
            }
            if let Some(text) = label(marker.local) {
                out.push_str(&text);
            }
        }

        out.push_str(self.text.get(cursor..).unwrap_or_default());
        out
    }

    /// Text with local markers written as `[^N]`.
    ///
    /// # Examples
    /// ```
    /// use tafseer_harvester::types::{FootnoteMarker, TextRun};
    ///
    /// let run = TextRun {
    ///     text: "alpha beta".to_string(),
    ///     footnotes: vec![FootnoteMarker { local: 1, offset: 5 }],
    /// };
    /// assert_eq!(run.marked_text(), "alpha[^1] beta");
    /// ```
    #[must_use]
    pub fn marked_text(&self) -> String {
        self.splice_markers(|local| Some(format!("[^{local}]")))
    }
}

/// One typed unit of section content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContentUnit {
    /// A heading element found inside a section body.
    Heading(String),

    /// Inline marker that opens a named sub-block of prose.
    Subheading(String),

    /// Prose.
    TextRun(TextRun),
}

/// Footnote bodies of one extracted section, keyed by local number.
///
/// Numbers start at 1 and are only meaningful within the section they were
/// extracted from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocalFootnoteTable(BTreeMap<u32, String>);

impl LocalFootnoteTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a footnote body under a local number.
    pub fn insert(&mut self, local: u32, body: impl Into<String>) {
        self.0.insert(local, body.into());
    }

    /// Look up a footnote body.
    #[must_use]
    pub fn get(&self, local: u32) -> Option<&str> {
        self.0.get(&local).map(String::as_str)
    }

    /// Number of footnotes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no footnotes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in ascending local number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Segmentation output for one heading on one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionFragment {
    /// Topic the heading resolved to.
    pub key: CanonicalKey,

    /// Heading as displayed on the page.
    pub heading: String,

    /// Ordered content of the section body.
    pub units: Vec<ContentUnit>,

    /// Footnotes referenced from `units`.
    pub footnotes: LocalFootnoteTable,
}

/// One page's contribution to a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Book (subdivision) label, e.g. the surah name.
    pub source_title: String,

    /// Title of the page the entry was found on.
    pub page_title: String,

    /// Heading as it appeared on that page.
    pub heading: String,

    /// Ordered content.
    pub units: Vec<ContentUnit>,

    /// Footnotes for `units`.
    pub footnotes: LocalFootnoteTable,
}

impl Entry {
    /// Build an entry from a fragment and its page location.
    #[must_use]
    pub fn from_fragment(
        fragment: SectionFragment,
        source_title: impl Into<String>,
        page_title: impl Into<String>,
    ) -> Self {
        Self {
            source_title: source_title.into(),
            page_title: page_title.into(),
            heading: fragment.heading,
            units: fragment.units,
            footnotes: fragment.footnotes,
        }
    }

    /// Number of footnote references across all text runs.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.units
            .iter()
            .map(|unit| match unit {
                ContentUnit::TextRun(run) => run.footnotes.len(),
                _ => 0,
            })
            .sum()
    }
}

/// All entries accumulated for one canonical key.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicRecord {
    /// Cluster identity.
    pub key: CanonicalKey,

    /// Heading of the first entry; used as document title.
    pub display_title: String,

    /// Entries in traversal order.
    pub entries: Vec<Entry>,
}

impl TopicRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new(key: CanonicalKey, display_title: impl Into<String>) -> Self {
        Self {
            key,
            display_title: display_title.into(),
            entries: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key_display() {
        let key = CanonicalKey::new("تفسير الايات");
        assert_eq!(key.to_string(), "تفسير الايات");
        assert_eq!(key.as_str(), "تفسير الايات");
    }

    #[test]
    fn test_splice_markers_positions() {
        let run = TextRun {
            text: "قال الله تعالى".to_string(),
            footnotes: vec![
                FootnoteMarker {
                    local: 1,
                    offset: "قال".len(),
                },
                FootnoteMarker {
                    local: 2,
                    offset: "قال الله تعالى".len(),
                },
            ],
        };
        assert_eq!(run.marked_text(), "قال[^1] الله تعالى[^2]");
    }

    #[test]
    fn test_splice_markers_adjacent_and_dropped() {
        let run = TextRun {
            text: "ab".to_string(),
            footnotes: vec![
                FootnoteMarker { local: 1, offset: 1 },
                FootnoteMarker { local: 2, offset: 1 },
                FootnoteMarker { local: 3, offset: 2 },
            ],
        };
        let text = run.splice_markers(|n| (n != 2).then(|| format!("<{n}>")));
        assert_eq!(text, "a<1>b<3>");
    }

    #[test]
    fn test_splice_markers_clamps_offset() {
        let run = TextRun {
            text: "x".to_string(),
            footnotes: vec![FootnoteMarker { local: 1, offset: 99 }],
        };
        assert_eq!(run.marked_text(), "x[^1]");
    }

    #[test]
    fn test_local_footnote_table() {
        let mut table = LocalFootnoteTable::new();
        assert!(table.is_empty());
        table.insert(2, "second");
        table.insert(1, "first");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1), Some("first"));
        assert_eq!(table.get(3), None);
        let numbers: Vec<u32> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_entry_marker_count() {
        let fragment = SectionFragment {
            key: CanonicalKey::new("k"),
            heading: "h".to_string(),
            units: vec![
                ContentUnit::TextRun(TextRun {
                    text: "a".to_string(),
                    footnotes: vec![FootnoteMarker { local: 1, offset: 1 }],
                }),
                ContentUnit::Subheading("s".to_string()),
                ContentUnit::TextRun(TextRun {
                    text: "b".to_string(),
                    footnotes: vec![FootnoteMarker { local: 2, offset: 0 }],
                }),
            ],
            footnotes: LocalFootnoteTable::new(),
        };
        let entry = Entry::from_fragment(fragment, "الفاتحة", "page");
        assert_eq!(entry.marker_count(), 2);
        assert_eq!(entry.source_title, "الفاتحة");
    }
}
