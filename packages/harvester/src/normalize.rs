//! Text normalization for heading comparison.
//!
//! [`normalize`] produces a matching form only; displayed text always keeps
//! its original spelling.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Check whether a character belongs to the stripped diacritic set.
///
/// Covers Arabic tashkeel, Quranic annotation marks, superscript alef and
/// tatweel (kashida).
#[must_use]
pub fn is_diacritic(c: char) -> bool {
    matches!(
        c,
        '\u{0610}'..='\u{061A}'
            | '\u{0640}'
            | '\u{064B}'..='\u{065F}'
            | '\u{0670}'
            | '\u{06D6}'..='\u{06DC}'
            | '\u{06DF}'..='\u{06E4}'
            | '\u{06E7}'..='\u{06E8}'
            | '\u{06EA}'..='\u{06ED}'
    )
}

/// Fold orthographically interchangeable letter shapes onto one form.
fn fold_letter(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
        'ى' | 'ی' => 'ي',
        'ک' => 'ك',
        other => other,
    }
}

/// Normalize text for fuzzy matching.
///
/// Decomposes (NFD), drops diacritics and combining marks, folds letter
/// variants, collapses whitespace runs to one space and trims.
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
///
/// # Examples
/// ```
/// use tafseer_harvester::normalize::normalize;
///
/// assert_eq!(normalize("تفسير الآيات"), normalize("تفسیر الایات"));
/// assert_eq!(normalize("  بِسْمِ   اللَّهِ "), "بسم الله");
/// ```
#[must_use]
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|&c| !is_diacritic(c) && !is_combining_mark(c))
        .map(fold_letter)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove diacritics without folding letters or touching whitespace.
///
/// Used where text stays human-facing, such as output filenames.
#[must_use]
pub fn strip_diacritics(text: &str) -> String {
    text.chars()
        .filter(|&c| !is_diacritic(c) && !is_combining_mark(c))
        .collect()
}

/// Collapse whitespace runs to a single space and trim.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
