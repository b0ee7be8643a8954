//! Sliding windows over text, measured in chars.
//!
//! Both the fixed-window strategy and the per-section windowing of the
//! structured strategy slide the same kind of window:
//!
//! ```text
//! size = 100, overlap = 20, text = 250 chars
//!
//! Window 0: [0..100)
//! Window 1: [80..180)    <- starts at 100 - 20
//! Window 2: [160..250)   <- clamped to the text
//! Window 3: [240..250)   <- 160 + 80 is still inside the text
//! ```
//!
//! The loop stops only once the next start is at or past the end, so the last
//! window may sit entirely inside the previous one's overlap.
//!
//! Offsets are char offsets, not bytes: a window of 100 over Greek text holds
//! 100 letters, not 50. [`CharIndex`] maps them back to byte positions for
//! slicing.

use std::ops::Range;

use crate::{Error, Result};

/// Window size and overlap, in chars.
///
/// # Examples
///
/// ```rust
/// use strata::WindowSpec;
///
/// let spec = WindowSpec::new(100, 20);
/// assert_eq!(spec.step(), 80);
///
/// let starts: Vec<usize> = spec.spans(250).into_iter().map(|r| r.start).collect();
/// assert_eq!(starts, vec![0, 80, 160, 240]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    size: usize,
    overlap: usize,
}

impl WindowSpec {
    /// Create a window spec.
    ///
    /// # Panics
    ///
    /// Panics if `size == 0` or `overlap >= size`.
    #[must_use]
    pub fn new(size: usize, overlap: usize) -> Self {
        assert!(size > 0, "window size must be > 0");
        assert!(overlap < size, "overlap must be < size");
        Self { size, overlap }
    }

    /// Create a window spec, validating the sizes.
    ///
    /// # Errors
    ///
    /// Returns an error if `size == 0` or `overlap >= size`.
    pub fn try_new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidChunkSize(size));
        }
        if overlap >= size {
            return Err(Error::OverlapExceedsSize { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// Create a spec that tolerates `overlap >= size` by advancing one char
    /// at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if `size == 0`.
    pub fn lenient(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidChunkSize(size));
        }
        Ok(Self { size, overlap })
    }

    /// The window size.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// The overlap between adjacent windows.
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between window starts; never zero.
    #[must_use]
    pub fn step(&self) -> usize {
        self.size.saturating_sub(self.overlap).max(1)
    }

    /// All window spans over a text of `len` chars.
    #[must_use]
    pub fn spans(&self, len: usize) -> Vec<Range<usize>> {
        let mut spans = Vec::with_capacity(len.div_ceil(self.step()));
        let mut start = 0;

        while start < len {
            let end = (start + self.size).min(len);
            spans.push(start..end);
            start += self.step();
        }

        spans
    }
}

/// Char-offset view of a string.
#[derive(Debug)]
pub(crate) struct CharIndex<'a> {
    text: &'a str,
    /// Byte offset of every char, plus `text.len()` at the end.
    offsets: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self { text, offsets }
    }

    /// Number of chars.
    pub(crate) fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Slice by char range; out-of-range ends are clamped.
    pub(crate) fn slice(&self, range: Range<usize>) -> &'a str {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        &self.text[self.offsets[start]..self.offsets[end]]
    }
}

/// Whether the text has at least one alphanumeric char.
pub(crate) fn has_alphanumeric(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_monotone() {
        let spans = WindowSpec::new(100, 20).spans(250);
        assert_eq!(spans, vec![0..100, 80..180, 160..250, 240..250]);
    }

    #[test]
    fn test_spans_no_overlap() {
        let spans = WindowSpec::new(5, 0).spans(12);
        assert_eq!(spans, vec![0..5, 5..10, 10..12]);
    }

    #[test]
    fn test_spans_empty() {
        assert!(WindowSpec::new(10, 2).spans(0).is_empty());
    }

    #[test]
    fn test_lenient_step_is_one() {
        let spec = WindowSpec::lenient(3, 5).unwrap();
        assert_eq!(spec.step(), 1);
        assert_eq!(spec.spans(4).len(), 4);
    }

    #[test]
    fn test_try_new_errors() {
        assert!(matches!(
            WindowSpec::try_new(0, 0),
            Err(Error::InvalidChunkSize(0))
        ));
        assert!(matches!(
            WindowSpec::try_new(10, 10),
            Err(Error::OverlapExceedsSize { size: 10, overlap: 10 })
        ));
    }

    #[test]
    fn test_char_index_multibyte() {
        let idx = CharIndex::new("αβγδ");
        assert_eq!(idx.len(), 4);
        assert_eq!(idx.slice(1..3), "βγ");
        assert_eq!(idx.slice(3..10), "δ");
        assert_eq!(idx.slice(9..10), "");
    }

    #[test]
    #[should_panic]
    fn test_zero_size_panics() {
        let _ = WindowSpec::new(0, 0);
    }

    #[test]
    fn test_alphanumeric() {
        assert!(has_alphanumeric(" -- ά"));
        assert!(!has_alphanumeric(" -- !\n"));
    }
}
