//! Similarity-guided chunking over lossless sentence units.
//!
//! ## How It Works
//!
//! 1. Split the text into sentence units without losing a char
//!    ([`split_units`](crate::split_units)).
//! 2. Embed every unit and compare each adjacent pair.
//! 3. Bisect the unit range until every piece fits `max_chunk_size`.
//!
//! ```text
//! Units:          [S0]  [S1]  [S2]  [S3]
//! Similarities:      0.2   0.9   0.4
//!                          ^
//! range [0, 3] too long, bisect after S1: [0, 1] | [2, 3]
//! ```
//!
//! ## Where It Bisects
//!
//! The range is cut after the adjacent pair with the *highest* similarity,
//! taking the first such pair on ties. That separates the two most similar
//! neighbours, which is the opposite of the usual "cut at the weakest link"
//! heuristic. It is kept as is: the existing chunk sets were produced this
//! way, and a reconstructor reading them relies on the same ids.
//!
//! ## Forced Splits
//!
//! A single unit longer than the bound cannot be divided further here (the
//! unit splitter already tried `;`, `,` and slicing with the same bound, so
//! this only happens for one grapheme cluster wider than the bound). It is
//! emitted anyway with `forced_split = true`.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::sentence::split_units;
use crate::{Chunker, Embedder, Error, Result, Segment, SegmentMetadata, SourceDocument};

/// Default size bound in chars.
const DEFAULT_MAX_CHUNK_SIZE: usize = 1024;

/// An inclusive run of sentence units produced by [`partition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceSpan {
    /// First unit index.
    pub start: usize,
    /// Last unit index (inclusive).
    pub end: usize,
    /// Emitted over the size bound because it is a single unit.
    pub forced: bool,
}

/// Partition `units` into size-bounded runs, left to right.
///
/// `similarities[i]` compares `units[i]` and `units[i + 1]`. A run fits when
/// its units joined by single spaces are at most `max_chunk_size` chars.
/// Units keep their trailing whitespace, so `"aaaa. "` and `"bbbb."` join
/// to `"aaaa.  bbbb."`.
///
/// ```rust
/// use strata::{partition, SentenceSpan};
///
/// let units: Vec<String> = ["aaaa", "bbbb", "cccc", "dddd"].map(String::from).to_vec();
/// let spans = partition(&units, &[0.2, 0.9, 0.4], 9)?;
///
/// let ranges: Vec<(usize, usize)> = spans.iter().map(|s| (s.start, s.end)).collect();
/// assert_eq!(ranges, vec![(0, 1), (2, 3)]);
/// # Ok::<(), strata::Error>(())
/// ```
///
/// # Errors
///
/// [`Error::SimilarityMismatch`] if `similarities` does not hold exactly
/// `units.len() - 1` values.
pub fn partition(
    units: &[String],
    similarities: &[f32],
    max_chunk_size: usize,
) -> Result<Vec<SentenceSpan>> {
    if units.is_empty() {
        return Ok(Vec::new());
    }
    if similarities.len() != units.len() - 1 {
        return Err(Error::SimilarityMismatch {
            units: units.len(),
            similarities: similarities.len(),
        });
    }

    let mut spans = Vec::new();
    // Right half pushed first so the left half is handled first.
    let mut stack = vec![(0, units.len() - 1)];

    while let Some((lo, hi)) = stack.pop() {
        if lo > hi {
            return Err(Error::InvalidRange { lo, hi });
        }

        let len = joined(&units[lo..=hi]).chars().count();
        if len <= max_chunk_size || lo == hi {
            spans.push(SentenceSpan {
                start: lo,
                end: hi,
                forced: len > max_chunk_size,
            });
            continue;
        }

        let m = strongest_link(&similarities[lo..hi]) + lo;
        stack.push((m + 1, hi));
        stack.push((lo, m));
    }

    Ok(spans)
}

/// Index of the first maximum.
fn strongest_link(similarities: &[f32]) -> usize {
    let mut best = 0;
    for (i, &sim) in similarities.iter().enumerate().skip(1) {
        if sim > similarities[best] {
            best = i;
        }
    }
    best
}

/// Units joined by single spaces, separators included.
fn joined(units: &[String]) -> String {
    units.join(" ")
}

/// Chunker that bisects sentence runs by embedding similarity.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata::{Embedder, SimilarityChunker};
///
/// struct Lengths;
///
/// impl Embedder for Lengths {
///     fn embed(&self, text: &str) -> strata::Result<Vec<f32>> {
///         Ok(vec![text.len() as f32, 1.0])
///     }
/// }
///
/// let chunker = SimilarityChunker::new(Arc::new(Lengths), 30);
/// let segments = chunker.chunk_text("First one. Second one. Third one here.", "doc")?;
///
/// assert_eq!(segments[0].segment_id, "doc_0");
/// assert!(segments.iter().all(|s| s.len() <= 30));
/// # Ok::<(), strata::Error>(())
/// ```
#[derive(Clone)]
pub struct SimilarityChunker {
    embedder: Arc<dyn Embedder>,
    max_chunk_size: usize,
}

impl SimilarityChunker {
    /// Create a chunker.
    ///
    /// # Panics
    ///
    /// Panics if `max_chunk_size == 0`.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, max_chunk_size: usize) -> Self {
        assert!(max_chunk_size > 0, "max_chunk_size must be > 0");
        Self {
            embedder,
            max_chunk_size,
        }
    }

    /// Create a chunker with the default bound of 1024 chars.
    #[must_use]
    pub fn with_default_size(embedder: Arc<dyn Embedder>) -> Self {
        Self::new(embedder, DEFAULT_MAX_CHUNK_SIZE)
    }

    /// Create a chunker, validating the bound.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_chunk_size == 0`.
    pub fn try_new(embedder: Arc<dyn Embedder>, max_chunk_size: usize) -> Result<Self> {
        if max_chunk_size == 0 {
            return Err(Error::InvalidChunkSize(max_chunk_size));
        }
        Ok(Self {
            embedder,
            max_chunk_size,
        })
    }

    /// The size bound in chars.
    #[must_use]
    pub const fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Chunk plain text.
    ///
    /// # Errors
    ///
    /// [`Error::ContentIntegrity`] if unit splitting loses chars, or
    /// [`Error::Embedding`] if the embedder fails.
    pub fn chunk_text(&self, content: &str, document_id: &str) -> Result<Vec<Segment>> {
        let units = split_units(content, self.max_chunk_size)?;
        if units.is_empty() {
            warn!(document_id, "document has no content to chunk");
            return Ok(Vec::new());
        }
        debug!(document_id, units = units.len(), "sentence units ready");

        let texts: Vec<&str> = units.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        if embeddings.len() != units.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                units.len(),
                embeddings.len()
            )));
        }

        let similarities: Vec<f32> = embeddings
            .windows(2)
            .map(|pair| self.embedder.cosine_similarity(&pair[0], &pair[1]))
            .collect();

        let spans = partition(&units, &similarities, self.max_chunk_size)?;

        let segments = spans
            .iter()
            .enumerate()
            .map(|(n, span)| {
                if span.forced {
                    warn!(document_id, unit = span.start, "single unit exceeds max_chunk_size");
                }
                Segment::new(
                    document_id,
                    format!("{document_id}_{n}"),
                    joined(&units[span.start..=span.end]),
                    SegmentMetadata::Sentence {
                        start_sentence: span.start,
                        end_sentence: span.end,
                        forced_split: span.forced,
                    },
                )
            })
            .collect();

        Ok(segments)
    }
}

impl Chunker for SimilarityChunker {
    fn name(&self) -> &'static str {
        "Semantic"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "max_chunk_size": self.max_chunk_size })
    }

    fn chunk(&self, document: &SourceDocument) -> Result<Vec<Segment>> {
        let segments = self.chunk_text(&document.text, &document.id)?;
        if !segments.is_empty() {
            info!(document_id = %document.id, segments = segments.len(), "semantic chunking done");
        }
        Ok(segments)
    }
}

impl fmt::Debug for SimilarityChunker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityChunker")
            .field("max_chunk_size", &self.max_chunk_size)
            .finish_non_exhaustive()
    }
}
