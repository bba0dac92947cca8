//! Windows - contiguous slices of the source document

use crate::interval::CharInterval;
use serde::{Deserialize, Serialize};

/// A contiguous, possibly overlapping slice of the source document
///
/// `text` always equals the characters `[start, end)` of the source.
/// Windows are produced once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Position of the window in the run (0-based)
    pub index: usize,
    /// Inclusive start offset in characters
    pub start: usize,
    /// Exclusive end offset in characters
    pub end: usize,
    /// The window's text
    pub text: String,
}

impl Window {
    /// Build a window over `source[start..end)` (character offsets)
    pub fn from_source(index: usize, source: &str, start: usize, end: usize) -> Self {
        Self {
            index,
            start,
            end,
            text: slice_chars(source, start, end).to_string(),
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True for the empty window produced from an empty document
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The window's span in document coordinates
    pub fn span(&self) -> CharInterval {
        CharInterval::new(self.start, self.end)
    }
}

/// Number of characters (Unicode scalar values) in `text`
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `char_idx`-th character, or `text.len()` past the end
pub fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

/// Slice `text` by character offsets, clamping to the text's end
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let from = byte_offset(text, start);
    let to = byte_offset(text, end.max(start));
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_from_source() {
        let w = Window::from_source(1, "hello world", 6, 11);
        assert_eq!(w.text, "world");
        assert_eq!(w.len(), 5);
        assert_eq!(w.span(), CharInterval::new(6, 11));
    }

    #[test]
    fn test_slice_chars_multibyte() {
        let text = "naïve café";
        assert_eq!(char_len(text), 10);
        assert_eq!(slice_chars(text, 6, 10), "café");
        assert_eq!(slice_chars(text, 0, 5), "naïve");
    }

    #[test]
    fn test_slice_chars_clamps() {
        assert_eq!(slice_chars("abc", 1, 99), "bc");
        assert_eq!(slice_chars("abc", 5, 9), "");
    }
}
