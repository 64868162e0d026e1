//! Paragraph wrapping for rendered prose.

#[cfg(test)]
use std::sync::LazyLock;

#[cfg(test)]
use regex::Regex;
use textwrap::{fill, Options, WordSeparator};

/// Footnote reference as written in rendered text, e.g. `[^12]`.
#[cfg(test)]
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static FOOTNOTE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\^\d+\]").expect("valid regex"));

/// Whether a line is longer than `width` characters.
pub fn should_wrap_text(text: &str, width: usize) -> bool {
    text.chars().count() > width
}

/// Wrap text at `width`, keeping existing line breaks.
///
/// Lines are only broken at ASCII spaces and words are never split, so a
/// footnote reference glued to its word always stays on one line.
pub fn wrap_text(text: &str, width: usize) -> String {
    let options = Options::new(width)
        .word_separator(WordSeparator::AsciiSpace)
        .break_words(false);

    text.split('\n')
        .map(|line| {
            if should_wrap_text(line, width) {
                fill(line, &options)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Count footnote references in rendered text.
#[cfg(test)]
pub(crate) fn count_footnote_references(text: &str) -> usize {
    FOOTNOTE_REFERENCE.find_iter(text).count()
}
