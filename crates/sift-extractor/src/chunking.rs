//! Windower: cuts a document into overlapping character windows

use crate::config::{ChunkStrategy, ChunkingPolicy};
use sift_domain::{char_len, Window};

/// Split `text` into ordered, overlapping windows
///
/// Always returns at least one window. Text no longer than `max_chars` gives
/// a single window; empty text gives one empty window. Consecutive windows
/// satisfy `next.start == prev.end - chunk_overlap`.
///
/// The policy must already be validated (`chunk_overlap < max_chars`).
///
/// # Examples
///
/// ```
/// use sift_extractor::{split, ChunkingPolicy};
///
/// let text = "x".repeat(10_000);
/// let windows = split(&text, &ChunkingPolicy::char_count(4_000, 200));
/// let spans: Vec<_> = windows.iter().map(|w| (w.start, w.end)).collect();
/// assert_eq!(spans, vec![(0, 4_000), (3_800, 7_800), (7_600, 10_000)]);
/// ```
pub fn split(text: &str, policy: &ChunkingPolicy) -> Vec<Window> {
    match policy.strategy {
        ChunkStrategy::CharCount => split_by_char_count(text, policy.max_chars, policy.chunk_overlap),
    }
}

fn split_by_char_count(text: &str, max_chars: usize, overlap: usize) -> Vec<Window> {
    let len = char_len(text);
    // Guard against an unvalidated policy looping forever
    let max_chars = max_chars.max(1);
    let step = max_chars.saturating_sub(overlap).max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_chars).min(len);
        windows.push(Window::from_source(windows.len(), text, start, end));
        if end >= len {
            break;
        }
        start = end - (max_chars - step);
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(windows: &[Window]) -> Vec<(usize, usize)> {
        windows.iter().map(|w| (w.start, w.end)).collect()
    }

    #[test]
    fn test_single_window_for_short_text() {
        let windows = split("Short text here.", &ChunkingPolicy::char_count(100, 10));
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].text, "Short text here.");
    }

    #[test]
    fn test_exactly_max_chars_is_one_window() {
        let text = "a".repeat(50);
        let windows = split(&text, &ChunkingPolicy::char_count(50, 10));
        assert_eq!(spans(&windows), vec![(0, 50)]);
    }

    #[test]
    fn test_ten_thousand_chars_three_windows() {
        let text: String = (0..10_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let windows = split(&text, &ChunkingPolicy::char_count(4_000, 200));

        assert_eq!(spans(&windows), vec![(0, 4_000), (3_800, 7_800), (7_600, 10_000)]);
        assert_eq!(windows[1].text, &text[3_800..7_800]);
        assert_eq!(windows.iter().map(|w| w.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_text() {
        let windows = split("", &ChunkingPolicy::default());
        assert_eq!(windows.len(), 1);
        assert!(windows[0].is_empty());
        assert_eq!(windows[0].text, "");
    }

    #[test]
    fn test_zero_overlap() {
        let text = "abcdefghij";
        let windows = split(text, &ChunkingPolicy::char_count(4, 0));
        assert_eq!(spans(&windows), vec![(0, 4), (4, 8), (8, 10)]);
        assert_eq!(windows[2].text, "ij");
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let text = "ééééé ààààà";
        let windows = split(text, &ChunkingPolicy::char_count(6, 1));
        assert_eq!(spans(&windows), vec![(0, 6), (5, 11)]);
        assert_eq!(windows[0].text, "ééééé ");
        assert_eq!(windows[1].text, " ààààà");
    }
}
