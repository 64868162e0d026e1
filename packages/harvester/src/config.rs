//! Configuration constants and validation functions for the harvester.

use reqwest::Url;

use crate::error::{HarvesterError, Result};

/// Base URL of the source site.
pub const BASE_URL: &str = "https://dorar.net";

/// Path of the index page listing every book (surah).
pub const INDEX_PATH: &str = "/tafseer";

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 20;

/// Default delay between consecutive page requests, in milliseconds.
///
/// The source is a public site; requests are spaced out to stay polite.
pub const DEFAULT_DELAY_MS: u64 = 1200;

/// Similarity ratio at or above which two headings share a topic.
///
/// Empirical value. Tunable via `--threshold`.
pub const SIMILARITY_THRESHOLD: f64 = 0.82;

/// Maximum output filename length in characters (before the extension).
pub const FILENAME_MAX_CHARS: usize = 80;

/// Filename used when a title sanitizes to nothing.
pub const FALLBACK_FILENAME: &str = "قسم";

/// Link text that marks the "next page" anchor.
pub const NEXT_LINK_LABEL: &str = "التالي";

/// Prefix of the page title given to a book's landing page ("introduction
/// of <book>").
pub const LANDING_PAGE_PREFIX: &str = "تعريف";

/// Name of the manifest written next to the topic documents.
pub const MANIFEST_FILENAME: &str = "index.yaml";

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "dorar_tafseer_sections";

/// Validate a similarity threshold.
///
/// # Returns
/// * `Ok(())` if `0 < threshold <= 1`
/// * `Err(HarvesterError::InvalidThreshold)` otherwise (including NaN)
///
/// # Examples
/// ```
/// use tafseer_harvester::config::validate_threshold;
///
/// assert!(validate_threshold(0.82).is_ok());
/// assert!(validate_threshold(1.0).is_ok());
/// assert!(validate_threshold(0.0).is_err());
/// assert!(validate_threshold(1.2).is_err());
/// ```
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(HarvesterError::InvalidThreshold(threshold))
    }
}

/// Resolve an href found on a page against the site root.
///
/// Absolute hrefs are returned unchanged; root-relative ones replace the
/// base path.
///
/// # Examples
/// ```
/// use reqwest::Url;
/// use tafseer_harvester::config::absolute_url;
///
/// let base = Url::parse("https://dorar.net").unwrap();
/// assert_eq!(absolute_url(&base, "/tafseer/2").unwrap(), "https://dorar.net/tafseer/2");
/// assert_eq!(absolute_url(&base, "https://x.org/a").unwrap(), "https://x.org/a");
/// ```
pub fn absolute_url(base: &Url, href: &str) -> Result<String> {
    base.join(href)
        .map(String::from)
        .map_err(|_| HarvesterError::InvalidUrl(href.to_string()))
}

/// Build the index page URL for a site root.
pub fn index_url(base: &Url) -> Result<String> {
    absolute_url(base, INDEX_PATH)
}

/// Build the landing page URL of book number `number`.
///
/// # Examples
/// ```
/// use reqwest::Url;
/// use tafseer_harvester::config::book_url;
///
/// let base = Url::parse("https://dorar.net").unwrap();
/// assert_eq!(book_url(&base, 2).unwrap(), "https://dorar.net/tafseer/2");
/// ```
pub fn book_url(base: &Url, number: u32) -> Result<String> {
    absolute_url(base, &format!("{INDEX_PATH}/{number}"))
}

/// Parse a site root.
///
/// # Returns
/// * `Ok(Url)` for an absolute http(s) URL with a host
/// * `Err(HarvesterError::InvalidUrl)` otherwise
pub fn validate_base_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|_| HarvesterError::InvalidUrl(url.to_string()))?;
    let has_host = parsed.host_str().is_some_and(|host| !host.is_empty());
    if !matches!(parsed.scheme(), "http" | "https") || !has_host {
        return Err(HarvesterError::InvalidUrl(url.to_string()));
    }
    Ok(parsed)
}
