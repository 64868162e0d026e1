//! Main harvester service that ties all components together.
//!
//! [`Pipeline`] turns parsed pages into topics. [`Harvester`] drives it over
//! the live site: index page, then each book's landing page, then the book's
//! chain of section pages linked by "next" anchors.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use reqwest::Url;
use scraper::Html;

use crate::config::{
    index_url, validate_base_url, BASE_URL, DEFAULT_DELAY_MS, LANDING_PAGE_PREFIX,
    SIMILARITY_THRESHOLD,
};
use crate::error::{HarvesterError, Result};
use crate::http::PageSource;
use crate::markup::{MarkupConfig, Segmenter};
use crate::resolver::KeyResolver;
use crate::store::TopicStore;
use crate::traversal::{book_links, first_section_link, next_link, page_title, BookLink};

/// Segmenter, key resolver and store for one run.
///
/// Pages must be ingested in traversal order: both the resolver's keys and
/// the store's entry order depend on it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    segmenter: Segmenter,
    resolver: KeyResolver,
    store: TopicStore,
}

impl Pipeline {
    /// Create a pipeline for the built-in page layout.
    ///
    /// # Errors
    /// Returns `InvalidThreshold` unless `0 < threshold <= 1`.
    pub fn new(threshold: f64) -> Result<Self> {
        Self::with_markup(&MarkupConfig::default(), threshold)
    }

    /// Create a pipeline for a custom page layout.
    pub fn with_markup(markup: &MarkupConfig, threshold: f64) -> Result<Self> {
        Ok(Self {
            segmenter: Segmenter::new(markup)?,
            resolver: KeyResolver::new(threshold)?,
            store: TopicStore::new(),
        })
    }

    /// Segment a page and register its fragments.
    ///
    /// Returns the number of fragments registered.
    pub fn ingest(&mut self, document: &Html, source_title: &str, page_title: &str) -> usize {
        let fragments = self.segmenter.segment_document(document, &mut self.resolver);
        let count = fragments.len();
        if count == 0 {
            tracing::warn!(source_title, page_title, "Page yielded no sections");
        }
        for fragment in fragments {
            self.store.register(fragment, source_title, page_title);
        }
        count
    }

    /// Parse and ingest raw markup.
    pub fn ingest_html(&mut self, html: &str, source_title: &str, page_title: &str) -> usize {
        self.ingest(&Html::parse_document(html), source_title, page_title)
    }

    /// Topics collected so far.
    #[must_use]
    pub fn store(&self) -> &TopicStore {
        &self.store
    }

    /// Canonical key registry.
    #[must_use]
    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// Finish the run and hand over the collected topics.
    #[must_use]
    pub fn into_store(self) -> TopicStore {
        self.store
    }
}

/// Settings for a crawl.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestOptions {
    /// Site root; the index lives at `<base_url>/tafseer`.
    pub base_url: String,

    /// Pause before every request after the index page.
    pub delay: Duration,

    /// Only crawl the first `limit` books.
    pub limit: Option<usize>,

    /// Heading similarity threshold.
    pub threshold: f64,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            limit: None,
            threshold: SIMILARITY_THRESHOLD,
        }
    }
}

/// Counters for one crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Books visited.
    pub books: usize,

    /// Pages fetched and segmented, landing pages included.
    pub pages: usize,

    /// Pages that could not be fetched.
    pub skipped_pages: usize,

    /// Fragments registered.
    pub fragments: usize,
}

/// Progress notifications emitted while crawling.
#[derive(Debug, Clone, Copy)]
pub enum HarvestEvent<'a> {
    /// The book list was read from the index.
    Index { books: usize },

    /// A book is about to be crawled (`position` starts at 1).
    Book {
        position: usize,
        total: usize,
        book: &'a BookLink,
    },

    /// A page was segmented.
    Page { title: &'a str, fragments: usize },
}

/// Crawls the site and feeds every page through a [`Pipeline`].
#[derive(Debug)]
pub struct Harvester<S> {
    source: S,
    base: Url,
    pipeline: Pipeline,
    options: HarvestOptions,
    visited: HashSet<String>,
    stats: HarvestStats,
    requests: usize,
}

impl<S: PageSource> Harvester<S> {
    /// Create a harvester reading pages from `source`.
    ///
    /// # Errors
    /// Returns `InvalidUrl` or `InvalidThreshold` for bad options.
    pub fn new(source: S, options: HarvestOptions) -> Result<Self> {
        let base = validate_base_url(&options.base_url)?;
        Ok(Self {
            source,
            base,
            pipeline: Pipeline::new(options.threshold)?,
            options,
            visited: HashSet::new(),
            stats: HarvestStats::default(),
            requests: 0,
        })
    }

    /// Crawl every book.
    ///
    /// # Errors
    /// Only a missing index page is fatal; any other page that fails to load
    /// is logged and skipped.
    pub fn run(&mut self) -> Result<HarvestStats> {
        self.run_with_progress(|_| {})
    }

    /// Crawl every book, reporting progress to `progress`.
    pub fn run_with_progress(
        &mut self,
        mut progress: impl FnMut(HarvestEvent<'_>),
    ) -> Result<HarvestStats> {
        let index = index_url(&self.base)?;
        tracing::info!(
            url = %index,
            threshold = self.pipeline.resolver().threshold(),
            "Starting crawl"
        );
        let html = match self.source.fetch(&index, self.base.as_str()) {
            Ok(Some(html)) => html,
            Ok(None) => return Err(HarvesterError::IndexUnavailable(index)),
            Err(e) => return Err(HarvesterError::IndexUnavailable(format!("{index}: {e}"))),
        };
        self.requests += 1;

        let mut books = book_links(&Html::parse_document(&html), &self.base);
        if let Some(limit) = self.options.limit {
            books.truncate(limit);
        }
        if books.is_empty() {
            tracing::warn!(url = %index, "Index page lists no books");
        }
        progress(HarvestEvent::Index { books: books.len() });

        let total = books.len();
        for (i, book) in books.iter().enumerate() {
            progress(HarvestEvent::Book {
                position: i + 1,
                total,
                book,
            });
            self.crawl_book(book, &index, &mut progress);
        }

        Ok(self.stats)
    }

    /// Crawl one book: its landing page, then its section chain.
    fn crawl_book(
        &mut self,
        book: &BookLink,
        index: &str,
        progress: &mut impl FnMut(HarvestEvent<'_>),
    ) {
        tracing::info!(number = book.number, title = %book.title, "Crawling book");
        self.stats.books += 1;

        self.visited.insert(book.url.clone());
        let Some(html) = self.fetch_page(&book.url, index) else {
            return;
        };

        let first = {
            let document = Html::parse_document(&html);
            let landing_title = format!("{LANDING_PAGE_PREFIX} {}", book.title);
            self.ingest(&document, &book.title, &landing_title, progress);
            first_section_link(&document, &self.base, book.number)
        };

        let Some(first) = first else {
            tracing::info!(number = book.number, "Book has no section pages");
            return;
        };

        let mut next = Some(first);
        while let Some(url) = next.take() {
            if !self.visited.insert(url.clone()) {
                tracing::warn!(url = %url, "Traversal cycle detected, stopping book");
                break;
            }
            let Some(html) = self.fetch_page(&url, &book.url) else {
                break;
            };

            let document = Html::parse_document(&html);
            let title = page_title(&document);
            self.ingest(&document, &book.title, &title, progress);
            next = next_link(&document, &self.base);
        }
    }

    fn ingest(
        &mut self,
        document: &Html,
        source_title: &str,
        page_title: &str,
        progress: &mut impl FnMut(HarvestEvent<'_>),
    ) {
        let fragments = self.pipeline.ingest(document, source_title, page_title);
        self.stats.pages += 1;
        self.stats.fragments += fragments;
        progress(HarvestEvent::Page {
            title: page_title,
            fragments,
        });
    }

    /// Fetch a page, pausing first; failures are logged and yield `None`.
    fn fetch_page(&mut self, url: &str, referer: &str) -> Option<String> {
        if self.requests > 0 && !self.options.delay.is_zero() {
            thread::sleep(self.options.delay);
        }
        self.requests += 1;

        match self.source.fetch(url, referer) {
            Ok(Some(html)) => Some(html),
            Ok(None) => {
                self.stats.skipped_pages += 1;
                None
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Skipping page");
                self.stats.skipped_pages += 1;
                None
            }
        }
    }

    /// Topics collected so far.
    #[must_use]
    pub fn store(&self) -> &TopicStore {
        self.pipeline.store()
    }

    /// Finish the run and hand over the collected topics.
    #[must_use]
    pub fn into_store(self) -> TopicStore {
        self.pipeline.into_store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves pages from memory and records every request.
    #[derive(Default)]
    struct MemorySource {
        pages: HashMap<String, String>,
        requests: RefCell<Vec<(String, String)>>,
    }

    impl MemorySource {
        fn with(mut self, path: &str, html: &str) -> Self {
            self.pages
                .insert(format!("https://dorar.net{path}"), html.to_string());
            self
        }
    }

    impl PageSource for MemorySource {
        fn fetch(&self, url: &str, referer: &str) -> Result<Option<String>> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), referer.to_string()));
            Ok(self.pages.get(url).cloned())
        }
    }

    fn options() -> HarvestOptions {
        HarvestOptions {
            delay: Duration::ZERO,
            ..HarvestOptions::default()
        }
    }

    fn section_page(title: &str, heading: &str, body: &str, next: Option<&str>) -> String {
        let next = next
            .map(|href| format!(r#"<a href="{href}">التالي</a>"#))
            .unwrap_or_default();
        format!(
            r#"<html><head><meta property="og:title" content="الدرر السنية - {title}"></head><body>
            <article class="border-bottom"><h5 class="default-text-color">{heading}</h5><p>{body}</p></article>
            {next}</body></html>"#
        )
    }

    const INDEX: &str = r#"<div class="card-personal"><a href="/tafseer/1">الفاتحة</a></div>"#;

    #[test]
    fn test_missing_index_is_fatal() {
        let mut harvester = Harvester::new(MemorySource::default(), options()).unwrap();
        assert!(matches!(
            harvester.run(),
            Err(HarvesterError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn test_crawl_follows_next_links() {
        let source = MemorySource::default()
            .with("/tafseer", INDEX)
            .with(
                "/tafseer/1",
                r#"<article class="border-bottom"><h5 class="default-text-color">مقدمة السورة</h5><p>تعريف</p></article>
                <a href="/tafseer/1/2">2</a><a href="/tafseer/1/1">1</a>"#,
            )
            .with(
                "/tafseer/1/1",
                &section_page("الآيات (1-4)", "تفسير الآيات", "أول", Some("/tafseer/1/2")),
            )
            .with(
                "/tafseer/1/2",
                &section_page("الآيات (5-7)", "تفسیر الایات", "ثان", None),
            );

        let mut harvester = Harvester::new(source, options()).unwrap();
        let stats = harvester.run().unwrap();
        assert_eq!(
            stats,
            HarvestStats {
                books: 1,
                pages: 3,
                skipped_pages: 0,
                fragments: 3,
            }
        );

        let topics: Vec<_> = harvester.store().topics().collect();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].entries[0].page_title, "تعريف الفاتحة");
        let pages: Vec<&str> = topics[1]
            .entries
            .iter()
            .map(|e| e.page_title.as_str())
            .collect();
        assert_eq!(pages, vec!["الآيات (1-4)", "الآيات (5-7)"]);
    }

    #[test]
    fn test_cycle_stops_traversal() {
        let source = MemorySource::default()
            .with("/tafseer", INDEX)
            .with("/tafseer/1", r#"<a href="/tafseer/1/1">1</a>"#)
            .with(
                "/tafseer/1/1",
                &section_page("a", "تفسير الآيات", "أول", Some("/tafseer/1/2")),
            )
            .with(
                "/tafseer/1/2",
                &section_page("b", "غريب الكلمات", "ثان", Some("/tafseer/1/1")),
            );

        let mut harvester = Harvester::new(source, options()).unwrap();
        let stats = harvester.run().unwrap();
        assert_eq!(stats.pages, 3);

        let requested = harvester.source.requests.borrow().len();
        assert_eq!(requested, 4);
    }

    #[test]
    fn test_missing_page_is_skipped() {
        let source = MemorySource::default()
            .with("/tafseer", INDEX)
            .with("/tafseer/1", r#"<a href="/tafseer/1/1">1</a>"#);

        let mut harvester = Harvester::new(source, options()).unwrap();
        let stats = harvester.run().unwrap();
        assert_eq!(stats.skipped_pages, 1);
        assert!(harvester.store().is_empty());
    }

    #[test]
    fn test_referer_is_book_page() {
        let source = MemorySource::default()
            .with("/tafseer", INDEX)
            .with("/tafseer/1", r#"<a href="/tafseer/1/1">1</a>"#)
            .with(
                "/tafseer/1/1",
                &section_page("a", "تفسير الآيات", "أول", None),
            );

        let mut harvester = Harvester::new(source, options()).unwrap();
        harvester.run().unwrap();

        let requests = harvester.source.requests.borrow();
        assert_eq!(requests[1].1, "https://dorar.net/tafseer");
        assert_eq!(requests[2].1, "https://dorar.net/tafseer/1");
    }

    #[test]
    fn test_limit_truncates_books() {
        let index = r#"<div class="card-personal"><a href="/tafseer/1">الفاتحة</a></div>
            <div class="card-personal"><a href="/tafseer/2">البقرة</a></div>"#;
        let source = MemorySource::default().with("/tafseer", index);
        let mut harvester = Harvester::new(
            source,
            HarvestOptions {
                limit: Some(1),
                ..options()
            },
        )
        .unwrap();

        let mut seen = Vec::new();
        harvester
            .run_with_progress(|event| {
                if let HarvestEvent::Book { book, .. } = event {
                    seen.push(book.number);
                }
            })
            .unwrap();
        assert_eq!(seen, vec![1]);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let bad_url = HarvestOptions {
            base_url: "dorar.net".to_string(),
            ..options()
        };
        assert!(Harvester::new(MemorySource::default(), bad_url).is_err());

        let malformed = HarvestOptions {
            base_url: "https://exa mple.com".to_string(),
            ..options()
        };
        assert!(matches!(
            Harvester::new(MemorySource::default(), malformed),
            Err(HarvesterError::InvalidUrl(_))
        ));

        let bad_threshold = HarvestOptions {
            threshold: 0.0,
            ..options()
        };
        assert!(Harvester::new(MemorySource::default(), bad_threshold).is_err());
    }

    #[test]
    fn test_pipeline_ingest_html() {
        let mut pipeline = Pipeline::new(SIMILARITY_THRESHOLD).unwrap();
        let count = pipeline.ingest_html(
            &section_page("p", "تفسير الآيات", "نص", None),
            "الفاتحة",
            "p",
        );
        assert_eq!(count, 1);
        assert_eq!(pipeline.resolver().keys().len(), 1);
        assert_eq!(pipeline.into_store().entry_count(), 1);
    }
}
