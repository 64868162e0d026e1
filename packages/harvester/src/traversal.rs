//! Link discovery on index, book and section pages.
//!
//! Books live at `/tafseer/<n>`, their sections at `/tafseer/<n>/<m>`.
//! Every function here reads an already parsed page and never fails: a page
//! without the expected links simply yields nothing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::config::{absolute_url, book_url, NEXT_LINK_LABEL};
use crate::markup::{get_attribute, get_text};
use crate::normalize::collapse_whitespace;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static BOOK_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/tafseer/(\d+)$").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SECTION_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/tafseer/(\d+)/(\d+)$").expect("valid regex"));

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static BOOK_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.card-personal").expect("valid selector"));

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector")
});

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

/// A book (surah) listed on the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookLink {
    /// Book number taken from the link.
    pub number: u32,

    /// Link text, used as the source title of every entry of the book.
    pub title: String,

    /// Absolute URL of the book's landing page.
    pub url: String,
}

/// List the books linked from the index page.
///
/// Only the first book link inside each card counts. Links without text are
/// ignored, repeated hrefs are kept once, and the result is sorted by book
/// number.
pub fn book_links(document: &Html, base_url: &Url) -> Vec<BookLink> {
    let mut seen = HashSet::new();
    let mut books = Vec::new();

    for card in document.select(&BOOK_CARD) {
        let Some((anchor, number)) = card.select(&ANCHOR).find_map(|anchor| {
            let href = get_attribute(anchor, "href")?;
            let number = BOOK_HREF.captures(href)?.get(1)?.as_str().parse::<u32>().ok()?;
            Some((anchor, number))
        }) else {
            continue;
        };

        let title = get_text(anchor);
        let href = get_attribute(anchor, "href").unwrap_or_default();
        if title.is_empty() || !seen.insert(href.to_string()) {
            continue;
        }

        let Ok(url) = book_url(base_url, number) else {
            continue;
        };
        books.push(BookLink { number, title, url });
    }

    books.sort_by_key(|book| book.number);
    books
}

/// Iterate over `(book, section, anchor)` for every section link on a page.
fn section_links(document: &Html) -> impl Iterator<Item = (u32, u32, ElementRef<'_>)> {
    document.select(&ANCHOR).filter_map(|anchor| {
        let href = get_attribute(anchor, "href")?;
        let captures = SECTION_HREF.captures(href)?;
        let book = captures.get(1)?.as_str().parse().ok()?;
        let section = captures.get(2)?.as_str().parse().ok()?;
        Some((book, section, anchor))
    })
}

/// Find the first section of `book` on its landing page.
///
/// The first section is the lowest section number linked for that book.
pub fn first_section_link(document: &Html, base_url: &Url, book: u32) -> Option<String> {
    section_links(document)
        .filter(|(linked_book, _, _)| *linked_book == book)
        .min_by_key(|(_, section, _)| *section)
        .and_then(|(_, _, anchor)| get_attribute(anchor, "href"))
        .and_then(|href| absolute_url(base_url, href).ok())
}

/// Find the "next page" link of a section page.
pub fn next_link(document: &Html, base_url: &Url) -> Option<String> {
    section_links(document)
        .find(|(_, _, anchor)| get_text(*anchor).contains(NEXT_LINK_LABEL))
        .and_then(|(_, _, anchor)| get_attribute(anchor, "href"))
        .and_then(|href| absolute_url(base_url, href).ok())
}

/// Extract a page's own title.
///
/// Prefers the `og:title` meta tag, dropping the site name before the first
/// `" - "`; falls back to the last `" - "` part of `<title>`. Empty when
/// neither is present.
pub fn page_title(document: &Html) -> String {
    if let Some(content) = document
        .select(&OG_TITLE)
        .next()
        .and_then(|meta| get_attribute(meta, "content"))
        .filter(|content| !content.trim().is_empty())
    {
        let content = collapse_whitespace(content);
        let title = content.split_once(" - ").map_or(content.as_str(), |(_, rest)| rest);
        return title.trim().to_string();
    }

    document
        .select(&TITLE)
        .next()
        .map(|title| {
            let text = collapse_whitespace(&title.text().collect::<String>());
            text.rsplit(" - ").next().unwrap_or_default().trim().to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://dorar.net").unwrap()
    }

    #[test]
    fn test_book_links_sorted_and_deduplicated() {
        let html = Html::parse_document(
            r#"<html><body>
            <div class="card-personal"><a href="/tafseer/2">البقرة</a></div>
            <div class="card-personal"><a href="/about">x</a><a href="/tafseer/1"> الفاتحة </a></div>
            <div class="card-personal"><a href="/tafseer/2">البقرة</a></div>
            <div class="card-personal"><a href="/tafseer/3"> </a></div>
            <div class="other"><a href="/tafseer/4">النساء</a></div>
            </body></html>"#,
        );

        let books = book_links(&html, &base());
        assert_eq!(
            books,
            vec![
                BookLink {
                    number: 1,
                    title: "الفاتحة".to_string(),
                    url: "https://dorar.net/tafseer/1".to_string(),
                },
                BookLink {
                    number: 2,
                    title: "البقرة".to_string(),
                    url: "https://dorar.net/tafseer/2".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_first_section_link_picks_lowest_section() {
        let html = Html::parse_document(
            r#"<a href="/tafseer/2/5">5</a><a href="/tafseer/1/1">other book</a>
            <a href="/tafseer/2/3">3</a><a href="/tafseer/2/10">10</a>"#,
        );
        assert_eq!(
            first_section_link(&html, &base(), 2),
            Some("https://dorar.net/tafseer/2/3".to_string())
        );
        assert_eq!(first_section_link(&html, &base(), 9), None);
    }

    #[test]
    fn test_next_link() {
        let html = Html::parse_document(
            r#"<a href="/tafseer/1/1">السابق</a><a href="/tafseer/1/3"><span>التالي</span> »</a>"#,
        );
        assert_eq!(
            next_link(&html, &base()),
            Some("https://dorar.net/tafseer/1/3".to_string())
        );

        let last = Html::parse_document(r#"<a href="/tafseer/1/2">السابق</a>"#);
        assert_eq!(next_link(&last, &base()), None);
    }

    #[test]
    fn test_page_title_prefers_og_title() {
        let html = Html::parse_document(
            r#"<html><head><meta property="og:title" content="الدرر السنية - سورة الفاتحة - الآيات (1-4)">
            <title>ignored</title></head></html>"#,
        );
        assert_eq!(page_title(&html), "سورة الفاتحة - الآيات (1-4)");
    }

    #[test]
    fn test_page_title_falls_back_to_title() {
        let html = Html::parse_document(
            "<html><head><title>الدرر السنية - موسوعة التفسير - الآيات (5-7)</title></head></html>",
        );
        assert_eq!(page_title(&html), "الآيات (5-7)");

        let multiline = Html::parse_document(
            "<html><head><title>الدرر السنية -\n  الآيات\n  (5-7) </title></head></html>",
        );
        assert_eq!(page_title(&multiline), "الآيات (5-7)");

        let bare = Html::parse_document("<html><body></body></html>");
        assert_eq!(page_title(&bare), "");
    }
}
