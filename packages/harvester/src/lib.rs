//! Tafseer Harvester - Collect commentary sections from dorar.net.
//!
//! This crate crawls the tafseer encyclopedia on dorar.net, cuts every page
//! into titled sections, reconciles headings that differ only in spelling
//! or diacritics, and writes one Markdown document per topic with all of
//! its sections in reading order and footnotes renumbered per document.
//!
//! # Example
//!
//! ```
//! use tafseer_harvester::markup::Segmenter;
//! use tafseer_harvester::render::{render, RenderOptions};
//! use tafseer_harvester::resolver::KeyResolver;
//! use tafseer_harvester::store::TopicStore;
//!
//! let html = r#"<article class="border-bottom">
//!     <h5 class="default-text-color">تفسير الآيات</h5>
//!     <p>نص<span class="tip">حاشية</span></p>
//! </article>"#;
//!
//! let segmenter = Segmenter::with_defaults().unwrap();
//! let mut resolver = KeyResolver::default();
//! let mut store = TopicStore::new();
//! for fragment in segmenter.segment(html, &mut resolver) {
//!     store.register(fragment, "الفاتحة", "الآيات (1-7)");
//! }
//!
//! let topic = store.topics().next().unwrap();
//! let document = render(topic, &RenderOptions::default());
//! assert!(document.text.contains("نص[^1]"));
//! assert!(document.text.contains("[^1]: حاشية"));
//! ```
//!
//! # Architecture
//!
//! The harvester is organized into several modules:
//!
//! - [`config`]: Configuration constants, URL builders and validation
//! - [`types`]: Core data types (SectionFragment, Entry, TopicRecord, etc.)
//! - [`error`]: Error types and Result alias
//! - [`normalize`]: Arabic text normalization for heading comparison
//! - [`resolver`]: Canonical topic keys by fuzzy heading matching
//! - [`markup`]: Page segmentation and footnote extraction
//! - [`store`]: Aggregation of sections into topics
//! - [`render`]: Markdown output, file naming and the manifest
//! - [`traversal`]: Link discovery on index, book and section pages
//! - [`http`]: HTTP transport with retries
//! - [`harvester`]: Main harvester service
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod harvester;
pub mod http;
pub mod markup;
pub mod normalize;
pub mod render;
pub mod resolver;
pub mod store;
pub mod traversal;
pub mod types;

// Re-export main entry points
pub use harvester::{HarvestOptions, HarvestStats, Harvester, Pipeline};

// Re-export commonly used items
pub use config::validate_threshold;
pub use error::{HarvesterError, Result};
pub use types::{CanonicalKey, ContentUnit, Entry, SectionFragment, TextRun, TopicRecord};
