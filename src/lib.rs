//! # strata
//!
//! Document segmentation and context reconstruction for retrieval-augmented
//! generation (RAG) pipelines.
//!
//! ## The Problem
//!
//! Long documents have to be cut into pieces small enough to embed and
//! retrieve. At query time the opposite problem appears: the vector index
//! hands back scattered pieces, and the model reads best when it gets whole
//! sections back, once each, in a sensible order.
//!
//! strata covers both halves: three chunking strategies that produce
//! [`Segment`]s with stable ids, and a [`ContextReconstructor`] that turns a
//! list of retrieved ids back into reading passages.
//!
//! ## Chunking Strategies
//!
//! ### Fixed Window
//!
//! Slide a window of N chars with M chars of overlap. For PDFs, every window
//! also records the pages it touches.
//!
//! ```text
//! size = 100, overlap = 20, text = 250 chars
//!
//! [0..100) [80..180) [160..250) [240..250)
//! ```
//!
//! ### Similarity-Guided
//!
//! Split text into sentence units without losing a single char, embed each
//! unit, and recursively bisect the unit range at the adjacent pair with the
//! highest similarity until every piece fits the size bound.
//!
//! ```text
//! Units:        [S0] [S1] [S2] [S3]
//! Similarities:    0.2  0.9  0.4
//!                        ^
//!                 bisect here: [S0 S1] | [S2 S3]
//! ```
//!
//! ### Structure-Aware
//!
//! Consume a pre-extracted section tree, derive each heading's ancestors,
//! fold undersized sections into their neighbours, and window each section
//! with a breadcrumb such as `Guide > Install (part 2/3)`.
//!
//! ## Reconstruction
//!
//! Given retrieved chunk ids, the reconstructor looks each one up, and for
//! structured segments fetches every sibling part of the same section and
//! stitches them under one header. A section is emitted once per call, no
//! matter how many of its parts were retrieved.
//!
//! ## Quick Start
//!
//! ```rust
//! use strata::{Chunker, FixedWindowChunker, SourceDocument};
//!
//! let doc = SourceDocument::new("notes", "notes.txt", "The quick brown fox. ".repeat(20));
//! let chunker = FixedWindowChunker::new(100, 20);
//! let segments = chunker.chunk(&doc)?;
//!
//! assert_eq!(segments[0].segment_id, "notes_chunk_0");
//! assert_eq!(FixedWindowChunker::stitch(&segments), doc.text);
//! # Ok::<(), strata::Error>(())
//! ```
//!
//! ## Concurrency
//!
//! Every chunker is `Send + Sync` and stateless between calls, so documents
//! can be chunked in parallel from independent threads. Reconstruction keeps
//! its dedup set local to one call.

mod config;
mod embed;
mod error;
mod fixed;
mod outline;
mod reconstruct;
mod section;
mod segment;
mod semantic;
mod sentence;
mod source;
mod store;
mod structured;
mod window;

pub use config::{
    ChunkingConfig, FixedConfig, ReconstructConfig, SemanticConfig, StrategyKind,
    StructuredConfig,
};
pub use embed::{cosine_similarity, Embedder};
pub use error::{Error, Result};
pub use fixed::FixedWindowChunker;
pub use outline::{heading_level, is_heading, OutlineBuilder};
pub use reconstruct::{
    ContextReconstructor, IncompletePassage, Passage, ReconstructedPassage, RetrievedRef,
    SegmentLookup,
};
pub use section::{Attachment, Hierarchy, SectionBody, SectionNode, SectionTree};
pub use segment::{
    AncestorChain, Breadcrumb, ChunkRecord, PageNumbers, Part, RecordMetadata, Segment,
    SegmentMetadata,
};
pub use semantic::{partition, SentenceSpan, SimilarityChunker};
pub use sentence::split_units;
pub use source::SourceDocument;
pub use store::{ChunkStore, SegmentIndex};
pub use structured::StructuredChunker;
pub use window::WindowSpec;

#[cfg(feature = "fastembed")]
pub use embed::FastEmbedder;

/// A document chunking strategy.
///
/// All strategies implement this trait, so a pipeline can pick one from
/// configuration and treat it uniformly:
///
/// ```rust
/// use strata::{Chunker, FixedWindowChunker, SourceDocument, StructuredChunker};
///
/// fn count(chunker: &dyn Chunker, doc: &SourceDocument) -> usize {
///     chunker.chunk(doc).map(|s| s.len()).unwrap_or(0)
/// }
///
/// let doc = SourceDocument::new("d", "d.txt", "Hello world. This is a test.");
/// assert_eq!(count(&FixedWindowChunker::new(100, 20), &doc), 1);
/// // No section tree: the structured strategy refuses the document.
/// assert_eq!(count(&StructuredChunker::default(), &doc), 0);
/// ```
pub trait Chunker: Send + Sync {
    /// Strategy name, as used in chunk storage directory names.
    fn name(&self) -> &'static str;

    /// The strategy's parameters, for display and provenance.
    fn parameters(&self) -> serde_json::Value;

    /// Split a document into an ordered sequence of segments.
    ///
    /// # Errors
    ///
    /// Fails when content integrity cannot be guaranteed, when the embedding
    /// capability fails, or when the document lacks the input the strategy
    /// needs.
    fn chunk(&self, document: &SourceDocument) -> Result<Vec<Segment>>;
}
