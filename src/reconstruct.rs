//! Turning retrieved chunk ids back into reading passages.
//!
//! A vector index returns chunks one at a time. For structured documents that
//! is the wrong unit to show: a section windowed into three parts should be
//! read whole, and only once even when two of its parts were retrieved.
//!
//! ## Reassembly
//!
//! ```text
//! retrieved: doc_chunk_5  "Guide > Install (part 2/3)"
//!
//! ordinal 5, part 2  ->  first sibling = 5 - 2 + 1 = 4
//! fetch doc_chunk_4, doc_chunk_5, doc_chunk_6
//!
//! "\n\nSection: Guide > Install > Install\n" + parts joined by "\n"
//! ```
//!
//! Sibling ids come from arithmetic on the trailing ordinal, which works
//! because the structured chunker numbers parts of a section contiguously.
//!
//! ## Outcomes
//!
//! | Situation                         | Result                    |
//! |-----------------------------------|---------------------------|
//! | section part, all siblings found  | [`Passage::Reconstructed`]|
//! | same section seen earlier         | dropped                   |
//! | more parts than the ceiling       | [`Passage::Incomplete`]   |
//! | unknown id, no marker, gap        | [`Passage::PassThrough`]  |

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, ReconstructConfig, Result, Segment, SegmentMetadata};

/// Read access to persisted segments by id.
pub trait SegmentLookup {
    /// The segment with this id, if it exists.
    fn segment(&self, chunk_id: &str) -> Option<&Segment>;
}

impl SegmentLookup for HashMap<String, Segment> {
    fn segment(&self, chunk_id: &str) -> Option<&Segment> {
        self.get(chunk_id)
    }
}

/// One hit returned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedRef {
    /// The retrieved chunk id.
    pub chunk_id: String,
    /// Distance or similarity reported by the index.
    #[serde(default)]
    pub score: Option<f32>,
    /// The domain (collection) the hit came from.
    #[serde(default)]
    pub domain: Option<String>,
    /// Stored document text, as returned by the index.
    #[serde(default)]
    pub content: Option<String>,
    /// Stored metadata, as returned by the index.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl RetrievedRef {
    /// A reference carrying only an id.
    #[must_use]
    pub fn new(chunk_id: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            score: None,
            domain: None,
            content: None,
            metadata: None,
        }
    }

    /// Attach the index score.
    #[must_use]
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Attach the source domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// A section stitched back together from its parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructedPassage {
    /// Owning document.
    pub document_id: String,
    /// The retrieved chunk id.
    pub chunk_id: String,
    /// Source domain of the hit.
    pub domain: Option<String>,
    /// Index score of the hit.
    pub score: Option<f32>,
    /// Metadata of the retrieved segment.
    pub metadata: SegmentMetadata,
    /// Header plus every part, in order.
    pub content: String,
    /// Number of segments stitched.
    pub parts: usize,
}

/// A section with too many parts to stitch; no body is attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncompletePassage {
    /// Owning document.
    pub document_id: String,
    /// The retrieved chunk id.
    pub chunk_id: String,
    /// Source domain of the hit.
    pub domain: Option<String>,
    /// Index score of the hit.
    pub score: Option<f32>,
    /// Metadata of the retrieved segment.
    pub metadata: SegmentMetadata,
    /// Parts the section was split into.
    pub total_parts: usize,
    /// The ceiling that was exceeded.
    pub ceiling: usize,
}

/// Result of reconstructing one retrieved reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Passage {
    /// Full context assembled.
    Reconstructed(ReconstructedPassage),
    /// Ceiling exceeded; the caller should show a degraded-context notice.
    Incomplete(IncompletePassage),
    /// Returned unchanged.
    PassThrough(RetrievedRef),
}

impl Passage {
    /// Whether a full body was assembled.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Reconstructed(_))
    }

    /// The passage text, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Reconstructed(p) => Some(&p.content),
            Self::Incomplete(_) => None,
            Self::PassThrough(r) => r.content.as_deref(),
        }
    }

    /// The retrieved chunk id this passage answers.
    pub fn chunk_id(&self) -> &str {
        match self {
            Self::Reconstructed(p) => &p.chunk_id,
            Self::Incomplete(p) => &p.chunk_id,
            Self::PassThrough(r) => &r.chunk_id,
        }
    }
}

/// Rebuilds multi-part context from retrieved references.
///
/// ## Example
///
/// ```rust
/// use std::collections::HashMap;
/// use strata::{ContextReconstructor, RetrievedRef, SectionNode, SectionTree, StructuredChunker};
///
/// let body = "word ".repeat(60);
/// let tree = SectionTree::new(vec![SectionNode::new("Intro", 1).with_content([body])]);
/// let segments = StructuredChunker::new(100, 10).with_min_chunk_size(10).chunk_sections(tree, "d");
/// assert!(segments.len() > 1);
///
/// let lookup: HashMap<_, _> = segments.into_iter().map(|s| (s.segment_id.clone(), s)).collect();
/// let passages = ContextReconstructor::default().reconstruct(
///     &[RetrievedRef::new("d_chunk_1"), RetrievedRef::new("d_chunk_0")],
///     &lookup,
/// );
///
/// // Both hits belong to the same section: one passage.
/// assert_eq!(passages.len(), 1);
/// assert!(passages[0].content().unwrap().starts_with("\n\nSection: Intro > Intro\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextReconstructor {
    config: ReconstructConfig,
}

impl ContextReconstructor {
    /// Create a reconstructor.
    #[must_use]
    pub fn new(config: ReconstructConfig) -> Self {
        Self { config }
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconstructConfig {
        &self.config
    }

    /// Reconstruct passages in retrieval order.
    ///
    /// A section is emitted at the position of its first retrieved part;
    /// later parts of the same section are dropped.
    pub fn reconstruct<L>(&self, retrieved: &[RetrievedRef], lookup: &L) -> Vec<Passage>
    where
        L: SegmentLookup + ?Sized,
    {
        let mut emitted: HashSet<String> = HashSet::new();
        let mut passages = Vec::with_capacity(retrieved.len());

        for hit in retrieved {
            let Some(segment) = lookup.segment(&hit.chunk_id) else {
                warn!(chunk_id = %hit.chunk_id, "retrieved chunk not found");
                passages.push(Passage::PassThrough(hit.clone()));
                continue;
            };

            match &segment.metadata {
                SegmentMetadata::Section {
                    breadcrumb,
                    heading,
                    ..
                } => {
                    let Some(part) = breadcrumb.part else {
                        debug!(chunk_id = %hit.chunk_id, "no part marker");
                        passages.push(Passage::PassThrough(hit.clone()));
                        continue;
                    };

                    if !emitted.insert(breadcrumb.base_key(heading)) {
                        debug!(chunk_id = %hit.chunk_id, "section already emitted");
                        continue;
                    }

                    if part.total > self.config.ceiling {
                        warn!(
                            chunk_id = %hit.chunk_id,
                            total_parts = part.total,
                            ceiling = self.config.ceiling,
                            "too many parts to reconstruct"
                        );
                        passages.push(Passage::Incomplete(IncompletePassage {
                            document_id: segment.document_id.clone(),
                            chunk_id: hit.chunk_id.clone(),
                            domain: hit.domain.clone(),
                            score: hit.score,
                            metadata: segment.metadata.clone(),
                            total_parts: part.total,
                            ceiling: self.config.ceiling,
                        }));
                        continue;
                    }

                    match self.assemble_parts(segment, lookup) {
                        Ok(content) => {
                            passages.push(self.reconstructed(hit, segment, content, part.total));
                        }
                        Err(e) => {
                            warn!(chunk_id = %hit.chunk_id, error = %e, "passing reference through");
                            passages.push(Passage::PassThrough(hit.clone()));
                        }
                    }
                }
                SegmentMetadata::Window { .. } if self.config.expand_windows => {
                    let (content, parts) = self.expand_window(segment, lookup);
                    passages.push(self.reconstructed(hit, segment, content, parts));
                }
                _ => passages.push(Passage::PassThrough(hit.clone())),
            }
        }

        passages
    }

    fn reconstructed(
        &self,
        hit: &RetrievedRef,
        segment: &Segment,
        content: String,
        parts: usize,
    ) -> Passage {
        Passage::Reconstructed(ReconstructedPassage {
            document_id: segment.document_id.clone(),
            chunk_id: hit.chunk_id.clone(),
            domain: hit.domain.clone(),
            score: hit.score,
            metadata: segment.metadata.clone(),
            content,
            parts,
        })
    }

    /// Header plus the contents of every part of `segment`'s section.
    ///
    /// Segments without a part marker are returned as their own content.
    ///
    /// # Errors
    ///
    /// [`Error::MissingSegment`] if a sibling is absent from `lookup`, or the
    /// segment id carries no ordinal consistent with its part index.
    pub fn assemble_parts<L>(&self, segment: &Segment, lookup: &L) -> Result<String>
    where
        L: SegmentLookup + ?Sized,
    {
        let SegmentMetadata::Section {
            breadcrumb,
            heading,
            ..
        } = &segment.metadata
        else {
            return Ok(segment.content.clone());
        };
        let Some(part) = breadcrumb.part else {
            return Ok(segment.content.clone());
        };

        let missing = || Error::MissingSegment {
            chunk_id: segment.segment_id.clone(),
        };
        let first = segment
            .ordinal()
            .and_then(|n| (n + 1).checked_sub(part.index))
            .ok_or_else(missing)?;

        let mut contents = Vec::with_capacity(part.total);
        for n in first..first + part.total {
            let id = segment.sibling_id(n).ok_or_else(missing)?;
            let sibling = lookup
                .segment(&id)
                .ok_or(Error::MissingSegment { chunk_id: id })?;
            contents.push(sibling.content.as_str());
        }

        Ok(format!(
            "\n\n{}: {} > {}\n{}",
            self.config.header_label,
            breadcrumb.path,
            heading,
            contents.join("\n")
        ))
    }

    /// The window with its neighbours, overlap removed, joined by blank
    /// lines. Missing neighbours are left out.
    ///
    /// Returns the text and the number of windows it spans.
    pub fn expand_window<L>(&self, segment: &Segment, lookup: &L) -> (String, usize)
    where
        L: SegmentLookup + ?Sized,
    {
        let overlap = self.config.overlap;
        let neighbour = |delta: isize| {
            let n = segment.ordinal()?.checked_add_signed(delta)?;
            lookup.segment(&segment.sibling_id(n)?)
        };

        let mut pieces = Vec::with_capacity(3);
        if let Some(prev) = neighbour(-1) {
            let keep = prev.len().saturating_sub(overlap);
            pieces.push(prev.content.chars().take(keep).collect::<String>());
        }
        pieces.push(segment.content.clone());
        if let Some(next) = neighbour(1) {
            pieces.push(next.content.chars().skip(overlap).collect());
        }

        let parts = pieces.len();
        (pieces.join("\n\n"), parts)
    }
}
