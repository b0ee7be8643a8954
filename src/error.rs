//! Error types for strata.
//!
//! Fatal errors abort the current chunking call and propagate to the caller;
//! nothing here is retried internally. Two conditions are deliberately not
//! errors: a reconstruction that exceeds the part ceiling (see
//! [`Passage::Incomplete`](crate::Passage::Incomplete)) and a retrieved chunk
//! id that is not in the segment lookup (passed through unchanged).

/// Errors that can occur during chunking, storage and reconstruction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A split/rejoin step lost or altered characters.
    #[error("content integrity violated during {stage}: expected {expected} chars, got {actual}")]
    ContentIntegrity {
        /// Which step detected the loss.
        stage: &'static str,
        /// Length of the text before the step, in chars.
        expected: usize,
        /// Length of the rejoined pieces, in chars.
        actual: usize,
    },

    /// The recursive partition was asked for an empty range.
    #[error("invalid sentence range: {lo} > {hi}")]
    InvalidRange {
        /// Lower bound (inclusive).
        lo: usize,
        /// Upper bound (inclusive).
        hi: usize,
    },

    /// The similarity sequence does not match the number of units.
    #[error("expected {} similarities for {units} units, got {similarities}", .units.saturating_sub(1))]
    SimilarityMismatch {
        /// Number of sentence units.
        units: usize,
        /// Number of similarity values supplied.
        similarities: usize,
    },

    /// A sibling part needed for reconstruction is not in the lookup.
    #[error("segment not found: {chunk_id}")]
    MissingSegment {
        /// The derived id that could not be resolved.
        chunk_id: String,
    },

    /// Invalid chunk size (must be > 0).
    #[error("invalid chunk size: {0} (must be > 0)")]
    InvalidChunkSize(usize),

    /// Overlap exceeds chunk size.
    #[error("overlap {overlap} exceeds chunk size {size}")]
    OverlapExceedsSize {
        /// The chunk size.
        size: usize,
        /// The overlap that exceeded the size.
        overlap: usize,
    },

    /// The structured strategy needs a pre-extracted section tree.
    #[error("document {document_id} has no section tree")]
    MissingSectionTree {
        /// The document that was handed over without one.
        document_id: String,
    },

    /// Embedding capability error.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error while reading or writing chunk files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Chunk file (de)serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for strata operations.
pub type Result<T> = std::result::Result<T, Error>;
