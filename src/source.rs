//! Input documents handed to a [`Chunker`](crate::Chunker).
//!
//! Raw DOCX/PDF extraction happens upstream. A source document carries
//! whatever that step produced: the plain text, optionally the per-page text
//! of a PDF, and optionally a [`SectionTree`].

use std::path::{Path, PathBuf};

use crate::SectionTree;

/// A document ready to be chunked.
///
/// ```rust
/// use strata::SourceDocument;
///
/// let doc = SourceDocument::new("d1", "reports/q3.PDF", "page one\npage two")
///     .with_pages(vec!["page one".into(), "page two".into()]);
/// assert!(doc.is_pdf());
/// assert_eq!(doc.name, "q3.PDF");
/// ```
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Document id, the prefix of every segment id.
    pub id: String,
    /// Display name; defaults to the file name of `path`.
    pub name: String,
    /// Where the document came from.
    pub path: PathBuf,
    /// Extracted plain text.
    pub text: String,
    /// Extracted text per page, for paginated sources.
    pub pages: Option<Vec<String>>,
    /// Extracted section structure.
    pub sections: Option<SectionTree>,
}

impl SourceDocument {
    /// Create a document from its id, path and extracted text.
    #[must_use]
    pub fn new(id: impl Into<String>, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        let path = path.as_ref().to_path_buf();
        let id = id.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.clone());

        Self {
            id,
            name,
            path,
            text: text.into(),
            pages: None,
            sections: None,
        }
    }

    /// Override the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach per-page text.
    #[must_use]
    pub fn with_pages(mut self, pages: Vec<String>) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Attach a section tree.
    #[must_use]
    pub fn with_sections(mut self, sections: SectionTree) -> Self {
        self.sections = Some(sections);
        self
    }

    /// Whether the source path has a `.pdf` extension (any case).
    pub fn is_pdf(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}
