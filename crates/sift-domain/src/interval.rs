//! Character intervals - the unit of citation

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when constructing an interval against a source text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// Start lies after end
    #[error("interval start {start} is after end {end}")]
    Inverted {
        /// Interval start
        start: usize,
        /// Interval end
        end: usize,
    },

    /// End lies past the source text
    #[error("interval end {end} exceeds source length {len}")]
    OutOfBounds {
        /// Interval end
        end: usize,
        /// Length of the source text in characters
        len: usize,
    },
}

/// Half-open interval `[start, end)` measured in characters of the source document
///
/// Offsets count Unicode scalar values, not bytes.
///
/// # Examples
///
/// ```
/// use sift_domain::CharInterval;
///
/// let a = CharInterval::new(10, 20);
/// let b = CharInterval::new(15, 30);
/// assert_eq!(a.len(), 10);
/// assert_eq!(a.overlap_len(&b), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharInterval {
    /// Inclusive start offset
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
}

impl CharInterval {
    /// Create an interval without bounds checking
    ///
    /// # Panics
    /// Panics if `start > end`
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "interval start must be <= end");
        Self { start, end }
    }

    /// Create an interval checked against a source of `source_len` characters
    pub fn bounded(start: usize, end: usize, source_len: usize) -> Result<Self, IntervalError> {
        if start > end {
            return Err(IntervalError::Inverted { start, end });
        }
        if end > source_len {
            return Err(IntervalError::OutOfBounds { end, len: source_len });
        }
        Ok(Self { start, end })
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True when the interval covers no characters
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Number of characters shared with `other`
    pub fn overlap_len(&self, other: &CharInterval) -> usize {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end.saturating_sub(start)
    }

    /// Overlap as a fraction of the smaller interval's length
    ///
    /// Two empty intervals at the same position are treated as fully overlapping.
    pub fn overlap_ratio(&self, other: &CharInterval) -> f64 {
        let smaller = self.len().min(other.len());
        if smaller == 0 {
            return if self == other { 1.0 } else { 0.0 };
        }
        self.overlap_len(other) as f64 / smaller as f64
    }
}

impl fmt::Display for CharInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_rejects_inverted() {
        assert_eq!(
            CharInterval::bounded(5, 3, 10),
            Err(IntervalError::Inverted { start: 5, end: 3 })
        );
    }

    #[test]
    fn test_bounded_rejects_out_of_range() {
        assert!(CharInterval::bounded(0, 11, 10).is_err());
        assert!(CharInterval::bounded(0, 10, 10).is_ok());
    }

    #[test]
    fn test_overlap_ratio() {
        let a = CharInterval::new(0, 100);
        let b = CharInterval::new(20, 100);
        // 80 shared chars, smaller interval is 80 long
        assert_eq!(a.overlap_ratio(&b), 1.0);

        let c = CharInterval::new(90, 110);
        assert_eq!(a.overlap_ratio(&c), 0.5);

        let d = CharInterval::new(100, 120);
        assert_eq!(a.overlap_ratio(&d), 0.0);
    }

    #[test]
    fn test_empty_intervals() {
        let a = CharInterval::new(4, 4);
        assert!(a.is_empty());
        assert_eq!(a.overlap_ratio(&CharInterval::new(4, 4)), 1.0);
        assert_eq!(a.overlap_ratio(&CharInterval::new(0, 10)), 0.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(CharInterval::new(103, 107).to_string(), "[103, 107)");
        assert_eq!(CharInterval::new(0, 0).to_string(), "[0, 0)");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn interval() -> impl Strategy<Value = CharInterval> {
        (0usize..500, 0usize..200).prop_map(|(start, len)| CharInterval::new(start, start + len))
    }

    proptest! {
        /// Property: overlap is symmetric and never exceeds either length
        #[test]
        fn test_overlap_symmetric(a in interval(), b in interval()) {
            prop_assert_eq!(a.overlap_len(&b), b.overlap_len(&a));
            prop_assert!(a.overlap_len(&b) <= a.len().min(b.len()));
        }

        /// Property: overlap ratio stays within [0, 1]
        #[test]
        fn test_overlap_ratio_bounded(a in interval(), b in interval()) {
            let ratio = a.overlap_ratio(&b);
            prop_assert!((0.0..=1.0).contains(&ratio));
        }
    }
}
