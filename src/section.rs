//! Section trees and the heading hierarchy derived from them.
//!
//! A structured document arrives as a flat, ordered list of sections, each
//! tagged with a heading level. Nesting is implicit:
//!
//! ```text
//! level  title
//!   1    A            A: []
//!   2    B            B: [A]
//!   3    C            C: [A, B]
//!   2    D            D: [A]        <- pops C and B
//!   1    E            E: []         <- pops D and A
//! ```
//!
//! [`Hierarchy::build`] recovers each title's ancestors with a stack: before
//! pushing a section, every entry at the same or a deeper level is popped, so
//! what remains is exactly the chain of strictly shallower ancestors.
//!
//! Text before the first heading lives in the tree's `default` body rather
//! than in a section.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Breadcrumb;

/// An opaque table or image attached to a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Extractor-assigned id (table index or image reference).
    pub id: serde_json::Value,
    /// Extractor payload (table rows, image path).
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Content that precedes the first heading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionBody {
    /// Paragraphs in document order.
    #[serde(default)]
    pub content: Vec<String>,
    /// Tables.
    #[serde(default)]
    pub tables: Vec<Attachment>,
    /// Images.
    #[serde(default)]
    pub images: Vec<Attachment>,
}

/// One heading-delimited section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionNode {
    /// Heading text.
    pub title: String,
    /// Nesting depth, 1 for top-level headings.
    pub level: u32,
    /// Paragraphs in document order.
    #[serde(default)]
    pub content: Vec<String>,
    /// Tables.
    #[serde(default)]
    pub tables: Vec<Attachment>,
    /// Images.
    #[serde(default)]
    pub images: Vec<Attachment>,
    /// Set when the section was merged into another or has nothing to say.
    #[serde(skip)]
    pub skip: bool,
    /// Title whose ancestors this section inherits, when it differs from
    /// `title` (merged sections).
    #[serde(skip)]
    pub(crate) outline_title: Option<String>,
}

impl SectionNode {
    /// Create an empty section.
    #[must_use]
    pub fn new(title: impl Into<String>, level: u32) -> Self {
        Self {
            title: title.into(),
            level,
            content: Vec::new(),
            tables: Vec::new(),
            images: Vec::new(),
            skip: false,
            outline_title: None,
        }
    }

    /// Append paragraphs.
    #[must_use]
    pub fn with_content<I, S>(mut self, paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content.extend(paragraphs.into_iter().map(Into::into));
        self
    }

    /// Paragraphs joined by newlines.
    pub fn joined_content(&self) -> String {
        self.content.join("\n")
    }

    /// The title used to look up ancestors.
    pub(crate) fn outline_title(&self) -> &str {
        self.outline_title.as_deref().unwrap_or(&self.title)
    }
}

/// A pre-extracted document structure.
///
/// Deserializes from the extractor's JSON, which looks like
/// `{"file": "...", "default": {"content": [...]}, "sections": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionTree {
    /// Content before the first heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<SectionBody>,
    /// Sections in document order.
    #[serde(default)]
    pub sections: Vec<SectionNode>,
}

impl SectionTree {
    /// Create a tree from sections only.
    #[must_use]
    pub fn new(sections: Vec<SectionNode>) -> Self {
        Self {
            default: None,
            sections,
        }
    }

    /// Attach pre-heading content.
    #[must_use]
    pub fn with_default(mut self, default: SectionBody) -> Self {
        self.default = Some(default);
        self
    }
}

/// Ancestor titles of every section, root first.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    ancestors: HashMap<String, Vec<String>>,
}

impl Hierarchy {
    /// Derive ancestors from levels. A repeated title keeps its last entry.
    pub fn build(sections: &[SectionNode]) -> Self {
        let mut stack: Vec<(&str, u32)> = Vec::new();
        let mut ancestors = HashMap::with_capacity(sections.len());

        for section in sections {
            while stack.last().is_some_and(|&(_, level)| level >= section.level) {
                stack.pop();
            }

            let chain = stack.iter().map(|(title, _)| (*title).to_string()).collect();
            ancestors.insert(section.title.clone(), chain);
            stack.push((&section.title, section.level));
        }

        Self { ancestors }
    }

    /// Ancestors of a title, root first; empty for unknown titles.
    pub fn ancestors(&self, title: &str) -> &[String] {
        self.ancestors.get(title).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `"A > B > title"` for a section, resolved through its outline title.
    pub fn breadcrumb(&self, section: &SectionNode) -> Breadcrumb {
        let mut path: Vec<&str> = self
            .ancestors(section.outline_title())
            .iter()
            .map(String::as_str)
            .collect();
        path.push(&section.title);
        Breadcrumb::new(path.join(" > "))
    }
}
