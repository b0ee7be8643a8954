//! Fixed-window chunking with overlap and page tracking.
//!
//! The baseline strategy: slide a window of N chars, advancing by N - M.
//!
//! ## How It Works
//!
//! ```text
//! size = 10, overlap = 3
//!
//! Document: "abcdefghijklmnopqrstuvwxyz"
//!
//! Chunk 0: "abcdefghij"   [0..10)
//! Chunk 1: "hijklmnopq"   [7..17)   <- starts at 10 - 3 = 7
//! Chunk 2: "opqrstuvwx"   [14..24)  <- starts at 17 - 3 = 14
//! Chunk 3: "vwxyz"        [21..26)  <- final chunk may be shorter
//! ```
//!
//! ## Paginated Sources
//!
//! For PDFs the page texts are joined with single newlines, and each page's
//! char span is remembered. A window lists every page whose span it touches:
//!
//! ```text
//! page 1 "aaaa"  [0..4)
//! page 2 "bbb"   [5..8)    <- +1 for the joining newline
//!
//! window [3..6) -> pages "1,2"
//! ```
//!
//! ## Round Trip
//!
//! Taking every window up to the start of the next one and the last window
//! whole reproduces the source text exactly; see [`FixedWindowChunker::stitch`].

use serde_json::json;
use tracing::{info, warn};

use crate::window::CharIndex;
use crate::{Chunker, PageNumbers, Result, Segment, SegmentMetadata, SourceDocument, WindowSpec};

/// Fixed-window chunker with configurable overlap.
///
/// ## Example
///
/// ```rust
/// use strata::FixedWindowChunker;
///
/// let chunker = FixedWindowChunker::new(100, 20);
/// let text = "A".repeat(250);
/// let segments = chunker.chunk_text(&text, "doc");
///
/// // Starts at 0, 80, 160 and 240; the last window is shorter.
/// assert_eq!(segments.len(), 4);
/// assert_eq!(segments[0].len(), 100);
/// assert_eq!(segments[3].len(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct FixedWindowChunker {
    spec: WindowSpec,
}

/// Char span of one page in the joined text.
#[derive(Debug, Clone, Copy)]
struct PageSpan {
    start: usize,
    end: usize,
    number: u32,
}

impl FixedWindowChunker {
    /// Create a new fixed-window chunker.
    ///
    /// # Arguments
    ///
    /// * `size` - Window size in chars
    /// * `overlap` - Chars shared by adjacent windows
    ///
    /// # Panics
    ///
    /// Panics if `size == 0` or `overlap >= size`.
    #[must_use]
    pub fn new(size: usize, overlap: usize) -> Self {
        Self {
            spec: WindowSpec::new(size, overlap),
        }
    }

    /// Create a chunker, validating the sizes.
    ///
    /// # Errors
    ///
    /// Returns an error if `size == 0` or `overlap >= size`.
    pub fn try_new(size: usize, overlap: usize) -> Result<Self> {
        WindowSpec::try_new(size, overlap).map(|spec| Self { spec })
    }

    /// The window spec.
    #[must_use]
    pub const fn spec(&self) -> WindowSpec {
        self.spec
    }

    /// Chunk plain text. No page metadata is recorded.
    pub fn chunk_text(&self, content: &str, document_id: &str) -> Vec<Segment> {
        self.windows(content, document_id, None)
    }

    /// Chunk per-page text, recording page numbers for every window.
    pub fn chunk_pages(&self, pages: &[String], document_id: &str) -> Vec<Segment> {
        let mut spans = Vec::with_capacity(pages.len());
        let mut cursor = 0;
        for (i, page) in pages.iter().enumerate() {
            let len = page.chars().count();
            spans.push(PageSpan {
                start: cursor,
                end: cursor + len,
                number: i as u32 + 1,
            });
            cursor += len + 1;
        }

        self.windows(&pages.join("\n"), document_id, Some(&spans))
    }

    fn windows(&self, text: &str, document_id: &str, pages: Option<&[PageSpan]>) -> Vec<Segment> {
        let index = CharIndex::new(text);

        self.spec
            .spans(index.len())
            .into_iter()
            .enumerate()
            .map(|(n, span)| {
                let page_numbers = pages.map(|pages| {
                    PageNumbers::from_unsorted(
                        pages
                            .iter()
                            .filter(|p| !(span.end <= p.start || span.start >= p.end))
                            .map(|p| p.number)
                            .collect(),
                    )
                });

                Segment::new(
                    document_id,
                    format!("{document_id}_chunk_{n}"),
                    index.slice(span.clone()),
                    SegmentMetadata::Window {
                        start: span.start,
                        end: span.end,
                        page_numbers,
                    },
                )
            })
            .collect()
    }

    /// Rebuild the source text from a run of windows.
    ///
    /// Each window contributes the chars before the next window's start; the
    /// last contributes everything. Segments without window metadata are
    /// taken whole.
    pub fn stitch(segments: &[Segment]) -> String {
        let mut text = String::new();

        for (i, segment) in segments.iter().enumerate() {
            let keep = match (&segment.metadata, segments.get(i + 1).map(|s| &s.metadata)) {
                (
                    SegmentMetadata::Window { start, .. },
                    Some(SegmentMetadata::Window { start: next, .. }),
                ) => next.saturating_sub(*start),
                _ => usize::MAX,
            };
            text.extend(segment.content.chars().take(keep));
        }

        text
    }
}

impl Chunker for FixedWindowChunker {
    fn name(&self) -> &'static str {
        "Fixed Size"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "chunk_size": self.spec.size(),
            "overlap": self.spec.overlap(),
        })
    }

    fn chunk(&self, document: &SourceDocument) -> Result<Vec<Segment>> {
        let segments = match (&document.pages, document.is_pdf()) {
            (Some(pages), true) => self.chunk_pages(pages, &document.id),
            (None, true) => {
                warn!(document_id = %document.id, "pdf without page text, page numbers omitted");
                self.chunk_text(&document.text, &document.id)
            }
            (_, false) => self.chunk_text(&document.text, &document.id),
        };

        if segments.is_empty() {
            warn!(document_id = %document.id, "document has no content to chunk");
        } else {
            info!(document_id = %document.id, segments = segments.len(), "fixed-window chunking done");
        }

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages_of(seg: &Segment) -> Vec<u32> {
        match &seg.metadata {
            SegmentMetadata::Window {
                page_numbers: Some(p),
                ..
            } => p.0.clone(),
            _ => vec![],
        }
    }

    #[test]
    fn test_basic_chunking() {
        let chunker = FixedWindowChunker::new(10, 2);
        let segments = chunker.chunk_text("abcdefghijklmnopqrstuvwxyz", "d");

        assert_eq!(segments[0].content, "abcdefghij");
        assert_eq!(segments[0].metadata, SegmentMetadata::window(0, 10));
        assert_eq!(segments[1].metadata, SegmentMetadata::window(8, 18));
        assert_eq!(segments[1].segment_id, "d_chunk_1");
    }

    #[test]
    fn test_empty_text() {
        let chunker = FixedWindowChunker::new(10, 2);
        assert!(chunker.chunk_text("", "d").is_empty());
    }

    #[test]
    fn test_text_smaller_than_window() {
        let chunker = FixedWindowChunker::new(100, 20);
        let segments = chunker.chunk_text("small", "d");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].content, "small");
    }

    #[test]
    fn test_greek_counts_chars() {
        let chunker = FixedWindowChunker::new(3, 1);
        let segments = chunker.chunk_text("αβγδε", "d");
        let texts: Vec<&str> = segments.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(texts, vec!["αβγ", "γδε", "ε"]);
    }

    #[test]
    fn test_page_numbers() {
        let chunker = FixedWindowChunker::new(4, 1);
        // joined: "aaaa\nbbb" -> page 1 [0..4), page 2 [5..8)
        let pages = vec!["aaaa".to_string(), "bbb".to_string()];
        let segments = chunker.chunk_pages(&pages, "p");

        assert_eq!(pages_of(&segments[0]), vec![1]); // [0..4)
        assert_eq!(pages_of(&segments[1]), vec![1, 2]); // [3..7)
        assert_eq!(pages_of(&segments[2]), vec![2]); // [6..8)
    }

    #[test]
    fn test_chunk_dispatches_on_pdf() {
        let chunker = FixedWindowChunker::new(4, 1);
        let pdf = SourceDocument::new("p", "a.pdf", "aaaa\nbbb")
            .with_pages(vec!["aaaa".into(), "bbb".into()]);
        let txt = SourceDocument::new("t", "a.txt", "aaaa\nbbb")
            .with_pages(vec!["aaaa".into(), "bbb".into()]);

        assert!(!pages_of(&chunker.chunk(&pdf).unwrap()[0]).is_empty());
        assert!(pages_of(&chunker.chunk(&txt).unwrap()[0]).is_empty());
    }

    #[test]
    fn test_window_end_is_clamped_on_disk() {
        let segments = FixedWindowChunker::new(100, 20).chunk_text(&"a".repeat(250), "d");
        let ends: Vec<serde_json::Value> = segments
            .iter()
            .map(|s| serde_json::to_value(s.to_record(None)).unwrap()["metadata"]["end"].clone())
            .collect();
        assert_eq!(ends, vec![json!(100), json!(180), json!(250), json!(250)]);
    }

    #[test]
    fn test_stitch_roundtrip() {
        let text = "The quick brown fox jumps over the lazy dog. Pack my box.";
        for overlap in [0, 3, 9] {
            let chunker = FixedWindowChunker::new(10, overlap);
            let segments = chunker.chunk_text(text, "d");
            assert_eq!(FixedWindowChunker::stitch(&segments), text);
        }
    }

    #[test]
    fn test_try_new_rejects_overlap() {
        assert!(FixedWindowChunker::try_new(10, 10).is_err());
        assert!(FixedWindowChunker::try_new(10, 9).is_ok());
    }

    #[test]
    #[should_panic]
    fn test_overlap_exceeds_size_panics() {
        let _ = FixedWindowChunker::new(10, 10);
    }
}
