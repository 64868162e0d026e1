//! Aggregation of section fragments into per-topic records.

use std::collections::HashMap;

use crate::types::{CanonicalKey, Entry, SectionFragment, TopicRecord};

/// All topics seen during one run, in first-seen order.
///
/// The store only grows. Entry order is output order, so fragments must be
/// registered in traversal order by a single writer.
#[derive(Debug, Clone, Default)]
pub struct TopicStore {
    topics: Vec<TopicRecord>,
    index: HashMap<CanonicalKey, usize>,
}

impl TopicStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment as an entry of its topic.
    ///
    /// The first fragment registered for a key creates the topic and gives it
    /// its display title.
    pub fn register(
        &mut self,
        fragment: SectionFragment,
        source_title: impl Into<String>,
        page_title: impl Into<String>,
    ) {
        let position = match self.index.get(&fragment.key) {
            Some(&position) => position,
            None => {
                let position = self.topics.len();
                tracing::debug!(key = %fragment.key, title = %fragment.heading, "New topic");
                self.topics
                    .push(TopicRecord::new(fragment.key.clone(), fragment.heading.clone()));
                self.index.insert(fragment.key.clone(), position);
                position
            }
        };

        let entry = Entry::from_fragment(fragment, source_title, page_title);
        self.topics[position].entries.push(entry);
    }

    /// Topics in first-seen order.
    pub fn topics(&self) -> impl Iterator<Item = &TopicRecord> {
        self.topics.iter()
    }

    /// Number of topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether no fragment has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Total number of entries across all topics.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.topics.iter().map(|topic| topic.entries.len()).sum()
    }

    /// Consume the store, yielding topics in first-seen order.
    #[must_use]
    pub fn into_topics(self) -> Vec<TopicRecord> {
        self.topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentUnit, LocalFootnoteTable, TextRun};

    fn fragment(key: &str, heading: &str, text: &str) -> SectionFragment {
        SectionFragment {
            key: CanonicalKey::new(key),
            heading: heading.to_string(),
            units: vec![ContentUnit::TextRun(TextRun::plain(text))],
            footnotes: LocalFootnoteTable::new(),
        }
    }

    #[test]
    fn test_first_seen_heading_is_display_title() {
        let mut store = TopicStore::new();
        store.register(fragment("k", "تفسير الآيات", "a"), "الفاتحة", "p1");
        store.register(fragment("k", "تفسیر الایات", "b"), "الفاتحة", "p2");

        let topic = store.topics().next().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(topic.display_title, "تفسير الآيات");
        assert_eq!(topic.entries.len(), 2);
        assert_eq!(topic.entries[1].heading, "تفسیر الایات");
    }

    #[test]
    fn test_entries_keep_registration_order() {
        let mut store = TopicStore::new();
        store.register(fragment("a", "A", "1"), "s1", "p1");
        store.register(fragment("b", "B", "2"), "s1", "p1");
        store.register(fragment("a", "A", "3"), "s2", "p2");

        let keys: Vec<&str> = store.topics().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);

        let pages: Vec<&str> = store
            .topics()
            .find(|t| t.key.as_str() == "a")
            .unwrap()
            .entries
            .iter()
            .map(|e| e.page_title.as_str())
            .collect();
        assert_eq!(pages, vec!["p1", "p2"]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.entry_count(), 3);
    }

    #[test]
    fn test_empty_store() {
        let store = TopicStore::new();
        assert!(store.is_empty());
        assert!(store.into_topics().is_empty());
    }
}
