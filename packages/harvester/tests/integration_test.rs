//! End-to-end integration tests for the harvester pipeline.
//!
//! Tests the complete pipeline from page segmentation to rendered documents
//! using saved pages of surah al-Fatiha.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use scraper::Html;
use tafseer_harvester::config::{MANIFEST_FILENAME, SIMILARITY_THRESHOLD};
use tafseer_harvester::render::{render, save_topics, topic_path, RenderOptions};
use tafseer_harvester::store::TopicStore;
use tafseer_harvester::traversal::page_title;
use tafseer_harvester::types::{ContentUnit, TopicRecord};
use tafseer_harvester::Pipeline;
use tempfile::tempdir;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("fatiha")
        .join(name)
}

/// Load fixture file content.
fn load_fixture(name: &str) -> String {
    let path = fixture_path(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

/// Run both section pages through one pipeline.
fn run_pipeline() -> TopicStore {
    let mut pipeline = Pipeline::new(SIMILARITY_THRESHOLD).unwrap();
    for name in ["pages/01.html", "pages/02.html"] {
        let document = Html::parse_document(&load_fixture(name));
        let title = page_title(&document);
        pipeline.ingest(&document, "الفاتحة", &title);
    }
    pipeline.into_store()
}

fn topic<'a>(store: &'a TopicStore, title: &str) -> &'a TopicRecord {
    store
        .topics()
        .find(|t| t.display_title == title)
        .unwrap_or_else(|| panic!("missing topic {title}"))
}

#[test]
fn test_topics_in_first_seen_order() {
    let store = run_pipeline();

    let titles: Vec<&str> = store.topics().map(|t| t.display_title.as_str()).collect();
    assert_eq!(titles, vec!["غريب الكلمات:", "تفسير الآيات:"]);
    assert_eq!(store.entry_count(), 4);
}

#[test]
fn test_spelling_variants_share_a_topic() {
    let store = run_pipeline();
    let tafseer = topic(&store, "تفسير الآيات:");

    let headings: Vec<&str> = tafseer.entries.iter().map(|e| e.heading.as_str()).collect();
    assert_eq!(headings, vec!["تفسير الآيات:", "تفسیر الآیات"]);

    let pages: Vec<&str> = tafseer
        .entries
        .iter()
        .map(|e| e.page_title.as_str())
        .collect();
    assert_eq!(pages, vec!["الآيات (1-4)", "الآيات (5-7)"]);
}

#[test]
fn test_duplicate_and_ui_sections_are_skipped() {
    let store = run_pipeline();

    assert!(store.topics().all(|t| t.display_title != "مشاركة"));
    let tafseer = topic(&store, "تفسير الآيات:");
    let second = &tafseer.entries[1];
    let ContentUnit::TextRun(run) = &second.units[0] else {
        panic!("expected a text run");
    };
    assert!(!run.text.contains("نص مكرر"));
}

#[test]
fn test_subheadings_and_footnotes_are_extracted() {
    let store = run_pipeline();
    let gharib = topic(&store, "غريب الكلمات:");
    let first = &gharib.entries[0];

    assert_eq!(first.units[0], ContentUnit::Subheading("الْحَمْدُ:".to_string()));
    let ContentUnit::TextRun(run) = &first.units[1] else {
        panic!("expected a text run");
    };
    assert_eq!(run.marked_text(), "الثناء بالجميل[^1]");
    assert_eq!(first.footnotes.get(1), Some("ينظر: مفردات الراغب"));
}

#[test]
fn test_rendered_document() {
    let store = run_pipeline();
    let tafseer = topic(&store, "تفسير الآيات:");
    let rendered = render(tafseer, &RenderOptions::default());

    assert_eq!(rendered.footnote_count, 3);
    assert!(rendered.text.starts_with("# تفسير الآيات:\n"));
    assert!(rendered.text.contains("> عدد المقاطع: 2\n"));
    assert_eq!(rendered.text.matches("## سورة الفاتحة\n").count(), 1);
    assert!(rendered.text.contains("### الآيات (1-4)\n\n"));
    assert!(rendered.text.contains("### الآيات (5-7)\n*ضمن: تفسیر الآیات*\n"));
    assert!(rendered.text.contains("﴿بِسْمِ اللَّهِ الرَّحْمَنِ الرَّحِيمِ﴾"));
    assert!(rendered.text.contains("أبتدئ بكل اسم لله[^1]\n\nثم قال:"));
    assert!(rendered.text.contains("أرشدنا[^3]"));
    assert!(rendered.text.ends_with(
        "## الحواشي\n\n[^1]: ينظر: تفسير الطبري\n[^2]: ينظر: تفسير السعدي\n[^3]: ينظر: تفسير ابن عطية\n"
    ));
}

#[test]
fn test_save_topics_from_fixtures() {
    let store = run_pipeline();
    let dir = tempdir().unwrap();

    let manifest = save_topics(store.topics(), &RenderOptions::default(), dir.path()).unwrap();

    let files: Vec<&str> = manifest.topics.iter().map(|t| t.file.as_str()).collect();
    assert_eq!(files, vec!["غريب الكلمات.md", "تفسير الآيات.md"]);
    assert_eq!(manifest.topics[1].footnotes, 3);
    for listed in &manifest.topics {
        assert!(topic_path(dir.path(), listed).is_file());
    }
    assert!(dir.path().join(MANIFEST_FILENAME).is_file());
}
