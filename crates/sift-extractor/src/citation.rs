//! CitationMatcher: anchor a model-provided hint to a span of the source
//!
//! Three strategies are tried in order, stopping at the first hit:
//!
//! 1. exact substring search in the window text
//! 2. case-insensitive search with whitespace runs collapsed
//! 3. best token-overlap match, accepted only above a similarity threshold
//!
//! Returned intervals are in document coordinates.

use serde::{Deserialize, Serialize};
use sift_domain::{char_len, slice_chars, CharInterval, Window};
use std::collections::HashMap;
use tracing::warn;

/// Which strategy produced a citation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Verbatim substring
    Exact,
    /// Case and whitespace insensitive substring
    Normalized,
    /// Fuzzy token overlap
    TokenOverlap,
}

/// A located citation
#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    /// Span in document coordinates
    pub interval: CharInterval,
    /// Source text covered by the span
    pub text: String,
    /// Strategy that found it
    pub strategy: MatchStrategy,
    /// 1.0 for exact and normalized matches, the overlap score otherwise
    pub score: f64,
}

/// Locates `raw_text_hint`s inside windows
#[derive(Debug, Clone)]
pub struct CitationMatcher {
    min_similarity: f64,
}

impl Default for CitationMatcher {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl CitationMatcher {
    /// Matcher accepting token-overlap scores of at least `min_similarity`
    pub fn new(min_similarity: f64) -> Self {
        Self { min_similarity }
    }

    /// Find the best span for `hint` in `window`
    ///
    /// Returns `None` for blank hints or when no strategy succeeds.
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_domain::{CharInterval, Window};
    /// use sift_extractor::{CitationMatcher, MatchStrategy};
    ///
    /// let source = "Patient denies chest pain. Takes Metformin  500mg daily.";
    /// let window = Window::from_source(1, source, 10, 56);
    /// let matcher = CitationMatcher::default();
    ///
    /// let citation = matcher.locate("takes metformin 500mg", &window).unwrap();
    /// assert_eq!(citation.strategy, MatchStrategy::Normalized);
    /// assert_eq!(citation.interval, CharInterval::new(27, 49));
    /// assert_eq!(citation.text, "Takes Metformin  500mg");
    /// ```
    pub fn locate(&self, hint: &str, window: &Window) -> Option<Citation> {
        let hint = hint.trim();
        if hint.is_empty() || window.text.is_empty() {
            return None;
        }

        let (local, strategy, score) = if let Some(local) = exact_match(hint, &window.text) {
            (local, MatchStrategy::Exact, 1.0)
        } else if let Some(local) = normalized_match(hint, &window.text) {
            (local, MatchStrategy::Normalized, 1.0)
        } else {
            let (local, score) = token_overlap_match(hint, &window.text)?;
            if score < self.min_similarity {
                return None;
            }
            (local, MatchStrategy::TokenOverlap, score)
        };

        let span = window.span();
        let interval = match CharInterval::bounded(span.start + local.start, span.start + local.end, span.end) {
            Ok(interval) => interval,
            Err(e) => {
                warn!(window = window.index, "Discarding citation outside its window: {}", e);
                return None;
            }
        };

        Some(Citation {
            interval,
            text: slice_chars(&window.text, local.start, local.end).to_string(),
            strategy,
            score,
        })
    }
}

fn exact_match(hint: &str, text: &str) -> Option<CharInterval> {
    let byte_start = text.find(hint)?;
    let start = char_len(&text[..byte_start]);
    Some(CharInterval::new(start, start + char_len(hint)))
}

/// Lowercased chars with whitespace runs collapsed to one space, plus the
/// source char index each normalized char came from
fn normalize(text: &str) -> (Vec<char>, Vec<usize>) {
    let mut chars = Vec::new();
    let mut origin = Vec::new();
    let mut in_space = false;

    for (idx, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            if !in_space && !chars.is_empty() {
                chars.push(' ');
                origin.push(idx);
            }
            in_space = true;
            continue;
        }
        in_space = false;
        for lower in c.to_lowercase() {
            chars.push(lower);
            origin.push(idx);
        }
    }

    if chars.last() == Some(&' ') {
        chars.pop();
        origin.pop();
    }
    (chars, origin)
}

fn normalized_match(hint: &str, text: &str) -> Option<CharInterval> {
    let (needle, _) = normalize(hint);
    let (haystack, origin) = normalize(text);
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    let pos = haystack.windows(needle.len()).position(|w| w == needle.as_slice())?;
    let start = origin[pos];
    let end = origin[pos + needle.len() - 1] + 1;
    Some(CharInterval::new(start, end))
}

struct Token {
    text: String,
    start: usize,
    end: usize,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Option<Token> = None;

    for (idx, c) in text.chars().enumerate() {
        if c.is_alphanumeric() {
            let token = current.get_or_insert_with(|| Token {
                text: String::new(),
                start: idx,
                end: idx,
            });
            token.text.extend(c.to_lowercase());
            token.end = idx + 1;
        } else if let Some(token) = current.take() {
            tokens.push(token);
        }
    }
    tokens.extend(current);
    tokens
}

/// Best window of source tokens by multiset overlap with the hint's tokens
///
/// Score is the fraction of hint tokens found. Ties keep the earliest span,
/// and the span is trimmed to its first and last matching token.
fn token_overlap_match(hint: &str, text: &str) -> Option<(CharInterval, f64)> {
    let hint_tokens = tokenize(hint);
    let text_tokens = tokenize(text);
    if hint_tokens.is_empty() || text_tokens.is_empty() {
        return None;
    }

    let mut wanted: HashMap<&str, usize> = HashMap::new();
    for token in &hint_tokens {
        *wanted.entry(token.text.as_str()).or_insert(0) += 1;
    }

    let span = hint_tokens.len().min(text_tokens.len());
    let mut best: Option<(usize, usize, usize)> = None; // (hits, first, last)

    for candidate in text_tokens.windows(span) {
        let mut remaining = wanted.clone();
        let mut hits = 0;
        let mut first = None;
        let mut last = 0;

        for (offset, token) in candidate.iter().enumerate() {
            if let Some(count) = remaining.get_mut(token.text.as_str()) {
                if *count > 0 {
                    *count -= 1;
                    hits += 1;
                    first.get_or_insert(offset);
                    last = offset;
                }
            }
        }

        if let Some(first) = first {
            if best.map_or(true, |(best_hits, _, _)| hits > best_hits) {
                best = Some((hits, candidate[first].start, candidate[last].end));
            }
        }
    }

    let (hits, start, end) = best?;
    let score = hits as f64 / hint_tokens.len() as f64;
    Some((CharInterval::new(start, end), score))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: citations always lie inside the window and the document
        #[test]
        fn test_citation_within_bounds(
            source in "[a-zA-Z .,\n]{1,400}",
            hint in "[a-zA-Z ]{0,40}",
            split in 0usize..400,
        ) {
            let len = char_len(&source);
            let start = split.min(len.saturating_sub(1));
            let window = Window::from_source(0, &source, start, len);

            if let Some(citation) = CitationMatcher::new(0.3).locate(&hint, &window) {
                prop_assert!(citation.interval.start >= window.start);
                prop_assert!(citation.interval.start <= citation.interval.end);
                prop_assert!(citation.interval.end <= len);
                prop_assert_eq!(
                    slice_chars(&source, citation.interval.start, citation.interval.end),
                    citation.text.as_str()
                );
            }
        }
    }
}
