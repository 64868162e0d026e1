//! Error types for the harvester.
//!
//! Extraction and reconciliation never fail: malformed markup is skipped
//! and logged. Only setup (selectors, thresholds), transport and output
//! return `HarvesterError`.

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Similarity threshold outside `(0, 1]`.
    #[error("Invalid similarity threshold: {0}. Expected a value in (0, 1] (e.g., 0.82)")]
    InvalidThreshold(f64),

    /// A CSS selector in the markup configuration did not parse.
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// URL could not be used as a page address.
    #[error("Invalid URL: '{0}'")]
    InvalidUrl(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to download a page.
    #[error("Failed to download page {url}: {source}")]
    PageDownload {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// All retry attempts exhausted.
    #[error("Request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// The index page listing all books could not be fetched.
    #[error("Index page unavailable: {0}")]
    IndexUnavailable(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    YamlSerialization(#[from] serde_yaml_ng::Error),
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
