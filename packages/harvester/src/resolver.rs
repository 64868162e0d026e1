//! Canonical key resolution for headings.
//!
//! Headings for the same topic drift across pages (punctuation, minor
//! wording, scribal spelling). [`KeyResolver`] clusters them by comparing the
//! normalized heading against every key registered so far and reusing the
//! best match when it clears the threshold.
//!
//! Each call costs one comparison per registered key. The number of distinct
//! topics is in the low hundreds, so a linear scan is fine; it will not scale
//! to unbounded key sets.

use std::collections::HashMap;

use crate::config::{validate_threshold, SIMILARITY_THRESHOLD};
use crate::error::Result;
use crate::normalize::normalize;
use crate::types::CanonicalKey;

/// Similarity of two strings in `[0, 1]`, based on matching blocks.
///
/// Finds the longest common block, then recurses on the unmatched text to
/// its left and right; the ratio is `2 * matched / (len(a) + len(b))`,
/// counted in characters. Two empty strings are identical (1.0).
///
/// The pair is put in a fixed order before matching, so the result does not
/// depend on argument order.
///
/// # Examples
/// ```
/// use tafseer_harvester::resolver::similarity_ratio;
///
/// assert_eq!(similarity_ratio("abcd", "abcd"), 1.0);
/// assert_eq!(similarity_ratio("abcd", "wxyz"), 0.0);
/// assert_eq!(similarity_ratio("abcd", "bcde"), 0.75);
/// ```
#[must_use]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Total size of all matching blocks between `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut pending = vec![(0, a.len(), 0, b.len())];
    let mut matched = 0;

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(start_a, start_b, size)`. Among equally long blocks the one
/// starting earliest in `a`, then earliest in `b`, wins.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi - blo + 1;
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            if a[i] == b[j] {
                let size = prev[col - 1] + 1;
                cur[col] = size;
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            } else {
                cur[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    (best_i, best_j, best_size)
}

/// Maps heading strings onto stable canonical keys.
///
/// Keys are append-only for the lifetime of the resolver: once a heading
/// resolves to a key it keeps doing so, and the first heading of a cluster
/// defines that cluster's key. Results depend on call order; callers feed
/// headings in traversal order.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    threshold: f64,
    keys: Vec<CanonicalKey>,
    resolved: HashMap<String, CanonicalKey>,
}

impl KeyResolver {
    /// Create a resolver with a custom threshold.
    ///
    /// # Errors
    /// Returns `InvalidThreshold` unless `0 < threshold <= 1`.
    pub fn new(threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            threshold,
            keys: Vec::new(),
            resolved: HashMap::new(),
        })
    }

    /// Resolve a heading to its canonical key, registering a new key when no
    /// existing one is similar enough.
    ///
    /// Only the first sighting of a normalized heading is matched; later
    /// sightings get the same key back even if a closer key has appeared
    /// since. Ties between equally similar keys go to the earliest
    /// registered one.
    pub fn resolve(&mut self, heading: &str) -> CanonicalKey {
        let normalized = normalize(heading);
        if let Some(key) = self.resolved.get(&normalized) {
            return key.clone();
        }

        let mut best: Option<(&CanonicalKey, f64)> = None;
        for key in &self.keys {
            let score = similarity_ratio(&normalized, key.as_str());
            let better = match best {
                None => true,
                Some((_, best_score)) => score > best_score,
            };
            if better {
                best = Some((key, score));
            }
        }

        let matched = best
            .filter(|(_, score)| *score >= self.threshold)
            .map(|(key, _)| key.clone());
        let key = match matched {
            Some(key) => key,
            None => {
                let key = CanonicalKey::new(normalized.clone());
                tracing::debug!(key = %key, heading = %heading, "Registered new canonical key");
                self.keys.push(key.clone());
                key
            }
        };

        self.resolved.insert(normalized, key.clone());
        key
    }

    /// Keys registered so far, in registration order.
    #[must_use]
    pub fn keys(&self) -> &[CanonicalKey] {
        &self.keys
    }

    /// The similarity threshold in use.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self {
            threshold: SIMILARITY_THRESHOLD,
            keys: Vec::new(),
            resolved: HashMap::new(),
        }
    }
}
