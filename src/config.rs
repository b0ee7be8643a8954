//! Chunking and reconstruction settings.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Reading the JSON from disk (or anywhere else) is the
//! caller's job:
//!
//! ```rust
//! use strata::{ChunkingConfig, StrategyKind};
//!
//! let config = ChunkingConfig::from_json_str(r#"{
//!     "strategy": "fixed",
//!     "fixed": {"chunk_size": 500}
//! }"#)?;
//!
//! assert_eq!(config.strategy, StrategyKind::Fixed);
//! assert_eq!(config.fixed.chunk_size, 500);
//! assert_eq!(config.fixed.overlap, 200);
//!
//! let chunker = config.build(None)?;
//! assert_eq!(chunker.name(), "Fixed Size");
//! # Ok::<(), strata::Error>(())
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    Chunker, ContextReconstructor, Embedder, Error, FixedWindowChunker, Result,
    SimilarityChunker, StructuredChunker,
};

fn default_fixed_chunk_size() -> usize {
    1000
}

fn default_fixed_overlap() -> usize {
    200
}

fn default_semantic_max() -> usize {
    1024
}

fn default_structured_chunk_size() -> usize {
    1000
}

fn default_structured_overlap() -> usize {
    100
}

fn default_structured_max() -> usize {
    4000
}

fn default_structured_min() -> usize {
    350
}

fn default_ceiling() -> usize {
    99
}

fn default_header_label() -> String {
    "Section".to_string()
}

/// Which chunking strategy to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// [`FixedWindowChunker`].
    Fixed,
    /// [`SimilarityChunker`].
    Semantic,
    /// [`StructuredChunker`].
    #[default]
    Structured,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Selected strategy.
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Fixed-window settings.
    #[serde(default)]
    pub fixed: FixedConfig,
    /// Similarity-guided settings.
    #[serde(default)]
    pub semantic: SemanticConfig,
    /// Structure-aware settings.
    #[serde(default)]
    pub structured: StructuredConfig,
    /// Query-time reconstruction settings.
    #[serde(default)]
    pub reconstruction: ReconstructConfig,
}

/// Fixed-window settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedConfig {
    /// Window size in chars.
    #[serde(default = "default_fixed_chunk_size")]
    pub chunk_size: usize,
    /// Chars shared by adjacent windows.
    #[serde(default = "default_fixed_overlap")]
    pub overlap: usize,
}

impl Default for FixedConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_fixed_chunk_size(),
            overlap: default_fixed_overlap(),
        }
    }
}

/// Similarity-guided settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Size bound per segment in chars.
    #[serde(default = "default_semantic_max")]
    pub max_chunk_size: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_semantic_max(),
        }
    }
}

/// Structure-aware settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredConfig {
    /// Window size in chars.
    #[serde(default = "default_structured_chunk_size")]
    pub chunk_size: usize,
    /// Chars shared by adjacent windows of one section.
    #[serde(default = "default_structured_overlap")]
    pub overlap: usize,
    /// Reported upper bound.
    #[serde(default = "default_structured_max")]
    pub max_chunk_size: usize,
    /// Sections and last windows below this are merged.
    #[serde(default = "default_structured_min")]
    pub min_chunk_size: usize,
}

impl Default for StructuredConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_structured_chunk_size(),
            overlap: default_structured_overlap(),
            max_chunk_size: default_structured_max(),
            min_chunk_size: default_structured_min(),
        }
    }
}

/// Query-time reconstruction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructConfig {
    /// Sections with more parts than this are not stitched.
    #[serde(default = "default_ceiling")]
    pub ceiling: usize,
    /// Word that opens a reconstructed passage's header.
    #[serde(default = "default_header_label")]
    pub header_label: String,
    /// Overlap of the fixed windows, removed when expanding a window.
    #[serde(default = "default_fixed_overlap")]
    pub overlap: usize,
    /// Expand fixed windows with their neighbours.
    #[serde(default)]
    pub expand_windows: bool,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            ceiling: default_ceiling(),
            header_label: default_header_label(),
            overlap: default_fixed_overlap(),
            expand_windows: false,
        }
    }
}

impl ChunkingConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] for malformed JSON, [`Error::Config`] for invalid
    /// values.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check all sizes, reporting every problem at once.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] listing each invalid field.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.fixed.chunk_size == 0 {
            errors.push("fixed.chunk_size must be > 0".to_string());
        } else if self.fixed.overlap >= self.fixed.chunk_size {
            errors.push(format!(
                "fixed.overlap ({}) must be < fixed.chunk_size ({})",
                self.fixed.overlap, self.fixed.chunk_size
            ));
        }
        if self.semantic.max_chunk_size == 0 {
            errors.push("semantic.max_chunk_size must be > 0".to_string());
        }
        if self.structured.chunk_size == 0 {
            errors.push("structured.chunk_size must be > 0".to_string());
        }
        if self.reconstruction.ceiling == 0 {
            errors.push("reconstruction.ceiling must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }

    /// Build the selected chunker.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the semantic strategy is selected without an
    /// embedder, or when sizes are invalid.
    pub fn build(&self, embedder: Option<Arc<dyn Embedder>>) -> Result<Box<dyn Chunker>> {
        self.validate()?;

        let chunker: Box<dyn Chunker> = match self.strategy {
            StrategyKind::Fixed => Box::new(FixedWindowChunker::try_new(
                self.fixed.chunk_size,
                self.fixed.overlap,
            )?),
            StrategyKind::Semantic => {
                let embedder = embedder.ok_or_else(|| {
                    Error::Config("semantic strategy needs an embedder".to_string())
                })?;
                Box::new(SimilarityChunker::try_new(
                    embedder,
                    self.semantic.max_chunk_size,
                )?)
            }
            StrategyKind::Structured => Box::new(
                StructuredChunker::try_new(self.structured.chunk_size, self.structured.overlap)?
                    .with_min_chunk_size(self.structured.min_chunk_size)
                    .with_max_chunk_size(self.structured.max_chunk_size),
            ),
        };

        tracing::debug!(strategy = chunker.name(), parameters = %chunker.parameters(), "chunker built");
        Ok(chunker)
    }

    /// A reconstructor using the reconstruction settings.
    #[must_use]
    pub fn reconstructor(&self) -> ContextReconstructor {
        ContextReconstructor::new(self.reconstruction.clone())
    }
}
