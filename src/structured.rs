//! Structure-aware chunking over a pre-extracted section tree.
//!
//! ## Passes
//!
//! ```text
//! SectionTree
//!     |
//!     |  1. default body: fold into the first section when short
//!     |  2. hierarchy: ancestors of every title (before merging)
//!     |  3. merge: undersized sections absorb their successors,
//!     |            or the last one folds into its predecessor
//!     |  4. emit: window "title\n\ncontent" and tag every window
//!     v
//! Segments  "Guide > Install (part 1/2)", "Guide > Install (part 2/2)", ...
//! ```
//!
//! ## Merging
//!
//! ```text
//! min_chunk_size = 350
//!
//!  Intro (80)   Setup (120)   Usage (900)   Notes (40)
//!  \___________ forward __________/            |
//!        "Intro + Setup + Usage"  <- backward -/
//! ```
//!
//! A merged section keeps the outline position of its first constituent, so
//! `Intro + Setup + Usage` gets the breadcrumb Intro would have had.
//!
//! ## Windowing
//!
//! Windows are `chunk_size` chars, stepping `max(chunk_size - overlap, 1)`.
//! A last window shorter than `min_chunk_size` is appended to the one before
//! it, so the overlap they share appears twice. Windows with no alphanumeric char are dropped before numbering, so
//! parts `1..=n` are always contiguous segment ordinals.

use serde_json::json;
use tracing::{debug, info};

use crate::segment::log_length_summary;
use crate::window::{has_alphanumeric, CharIndex};
use crate::{
    AncestorChain, Breadcrumb, Chunker, Error, Hierarchy, Result, SectionBody, SectionNode,
    SectionTree, Segment, SegmentMetadata, SourceDocument, WindowSpec,
};

/// Chunker for documents with a known heading structure.
///
/// ## Example
///
/// ```rust
/// use strata::{SectionNode, SectionTree, StructuredChunker};
///
/// let tree = SectionTree::new(vec![
///     SectionNode::new("Guide", 1).with_content(["An overview of the guide."]),
///     SectionNode::new("Install", 2).with_content(["Run the installer and follow the prompts."]),
/// ]);
///
/// let chunker = StructuredChunker::new(1000, 100).with_min_chunk_size(10);
/// let segments = chunker.chunk_sections(tree, "doc");
///
/// assert_eq!(segments[1].segment_id, "doc_chunk_1");
/// assert_eq!(segments[1].breadcrumb().unwrap().to_string(), "Guide > Install (part 1/1)");
/// ```
#[derive(Debug, Clone)]
pub struct StructuredChunker {
    window: WindowSpec,
    min_chunk_size: usize,
    max_chunk_size: usize,
}

impl Default for StructuredChunker {
    fn default() -> Self {
        Self::new(1000, 100)
    }
}

impl StructuredChunker {
    /// Create a chunker with `min_chunk_size = 350` and `max_chunk_size = 4000`.
    ///
    /// An `overlap >= chunk_size` is tolerated; windows then advance one
    /// char at a time.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size == 0`.
    #[must_use]
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        match Self::try_new(chunk_size, overlap) {
            Ok(chunker) => chunker,
            Err(e) => panic!("{e}"),
        }
    }

    /// Create a chunker, validating the sizes.
    ///
    /// # Errors
    ///
    /// Returns an error if `chunk_size == 0`.
    pub fn try_new(chunk_size: usize, overlap: usize) -> Result<Self> {
        Ok(Self {
            window: WindowSpec::lenient(chunk_size, overlap)?,
            min_chunk_size: 350,
            max_chunk_size: 4000,
        })
    }

    /// Set the size below which sections and last windows get merged.
    #[must_use]
    pub fn with_min_chunk_size(mut self, min: usize) -> Self {
        self.min_chunk_size = min;
        self
    }

    /// Set the reported upper bound. Windowing is governed by `chunk_size`.
    #[must_use]
    pub fn with_max_chunk_size(mut self, max: usize) -> Self {
        self.max_chunk_size = max;
        self
    }

    /// The window spec.
    #[must_use]
    pub const fn window(&self) -> WindowSpec {
        self.window
    }

    /// The merge threshold.
    #[must_use]
    pub const fn min_chunk_size(&self) -> usize {
        self.min_chunk_size
    }

    /// Chunk a section tree.
    pub fn chunk_sections(&self, tree: SectionTree, document_id: &str) -> Vec<Segment> {
        let SectionTree {
            default,
            mut sections,
        } = tree;
        let mut emitter = Emitter::new(document_id);

        if let Some(body) = default {
            self.place_default(body, &mut sections, &mut emitter);
        }

        let hierarchy = Hierarchy::build(&sections);
        self.merge_small_sections(&mut sections);

        for section in &sections {
            if section.skip {
                debug!(title = %section.title, "skipping merged section");
                continue;
            }

            let breadcrumb = hierarchy.breadcrumb(section);
            let parents = AncestorChain(hierarchy.ancestors(section.outline_title()).to_vec());

            let windows: Vec<String> = self
                .windows(&section.title, &section.content)
                .into_iter()
                .filter(|w| {
                    let keep = has_alphanumeric(w);
                    if !keep {
                        debug!(title = %section.title, "dropping window without content");
                    }
                    keep
                })
                .collect();

            let total = windows.len();
            for (i, text) in windows.into_iter().enumerate() {
                emitter.push(
                    text,
                    breadcrumb.clone().with_part(i + 1, total),
                    &section.title,
                    parents.clone(),
                );
            }
        }

        emitter.finish()
    }

    /// Fold a short default body into the first section, or emit it alone.
    fn place_default(&self, body: SectionBody, sections: &mut [SectionNode], emitter: &mut Emitter<'_>) {
        let joined = body.content.join("\n");
        let len = joined.chars().count();

        if len < self.min_chunk_size {
            if let Some(first) = sections.iter_mut().find(|s| !s.skip) {
                info!(len, title = %first.title, "merging short default section into first section");
                let SectionBody {
                    content,
                    tables,
                    images,
                } = body;
                prepend(&mut first.content, content);
                prepend(&mut first.tables, tables);
                prepend(&mut first.images, images);
                return;
            }
        }

        if has_alphanumeric(&joined) {
            emitter.push(
                joined,
                Breadcrumb::new("root"),
                "default",
                AncestorChain::default(),
            );
        } else {
            debug!("dropping default section without content");
        }
    }

    /// Merge sections shorter than `min_chunk_size` with their neighbours.
    ///
    /// Merged-in sections are marked `skip`; replacements are written back
    /// at the index of the section that absorbed them.
    fn merge_small_sections(&self, sections: &mut [SectionNode]) {
        let n = sections.len();
        let mut replacements: Vec<(usize, SectionNode)> = Vec::new();
        let mut previous: Option<usize> = None;
        let mut i = 0;

        while i < n {
            if sections[i].skip {
                i += 1;
                continue;
            }
            if !sections[i].content.iter().any(|p| has_alphanumeric(p)) {
                debug!(title = %sections[i].title, "skipping section without content");
                sections[i].skip = true;
                i += 1;
                continue;
            }

            let mut len = char_len(&sections[i]);
            if len >= self.min_chunk_size {
                previous = Some(i);
                i += 1;
                continue;
            }

            // Forward: absorb successors until the bound is met.
            let mut merged: Option<SectionNode> = None;
            let mut k = 1;
            while len < self.min_chunk_size && i + k < n {
                if sections[i + k].skip {
                    k += 1;
                    continue;
                }
                let acc = merged.get_or_insert_with(|| start_merge(&sections[i]));
                absorb(acc, &sections[i + k]);
                len = char_len(acc);
                k += 1;
            }

            if let Some(acc) = merged {
                for s in &mut sections[i + 1..(i + k).min(n)] {
                    s.skip = true;
                }
                debug!(title = %acc.title, len, "merged forward");
                replacements.push((i, acc));
                previous = Some(i);
                i += k;
                continue;
            }

            // Backward: nothing left ahead, fold into the previous section.
            match previous {
                Some(p) if !sections[p].skip => {
                    let pos = match replacements.iter().position(|(idx, _)| *idx == p) {
                        Some(pos) => pos,
                        None => {
                            replacements.push((p, start_merge(&sections[p])));
                            replacements.len() - 1
                        }
                    };
                    let target = &mut replacements[pos].1;
                    absorb(target, &sections[i]);
                    debug!(title = %target.title, "merged backward");
                    sections[i].skip = true;
                }
                _ => previous = Some(i),
            }
            i += 1;
        }

        replacements.sort_by_key(|(idx, _)| *idx);
        for (idx, node) in replacements.into_iter().rev() {
            sections[idx] = node;
        }
    }

    /// Window `title + "\n\n" + content` by char offsets.
    fn windows(&self, title: &str, content: &[String]) -> Vec<String> {
        let full = format!("{title}\n\n{}", content.join("\n"));
        let index = CharIndex::new(&full);
        let mut windows: Vec<String> = self
            .window
            .spans(index.len())
            .into_iter()
            .map(|s| index.slice(s).to_string())
            .collect();

        // A short tail is appended to the window before it, overlap and all.
        if windows.len() >= 2
            && windows
                .last()
                .is_some_and(|w| w.chars().count() < self.min_chunk_size)
        {
            if let Some(tail) = windows.pop() {
                if let Some(prev) = windows.last_mut() {
                    prev.push_str(&tail);
                }
            }
        }

        windows
    }
}

fn prepend<T>(dst: &mut Vec<T>, mut src: Vec<T>) {
    src.append(dst);
    *dst = src;
}

fn char_len(section: &SectionNode) -> usize {
    section.joined_content().chars().count()
}

/// A copy of `section` that can absorb others, keeping its outline position.
fn start_merge(section: &SectionNode) -> SectionNode {
    let mut merged = section.clone();
    merged.outline_title = Some(section.outline_title().to_string());
    merged.skip = false;
    merged
}

fn absorb(into: &mut SectionNode, other: &SectionNode) {
    into.title = format!("{} + {}", into.title, other.title);
    into.level = into.level.min(other.level);
    into.content.extend(other.content.iter().cloned());
    into.tables.extend(other.tables.iter().cloned());
    into.images.extend(other.images.iter().cloned());
}

/// Assigns `{document_id}_chunk_{n}` ids from one counter.
struct Emitter<'a> {
    document_id: &'a str,
    segments: Vec<Segment>,
}

impl<'a> Emitter<'a> {
    fn new(document_id: &'a str) -> Self {
        Self {
            document_id,
            segments: Vec::new(),
        }
    }

    fn push(&mut self, content: String, breadcrumb: Breadcrumb, heading: &str, parents: AncestorChain) {
        let chunk_id = format!("{}_chunk_{}", self.document_id, self.segments.len());
        self.segments.push(Segment::new(
            self.document_id,
            chunk_id.clone(),
            content,
            SegmentMetadata::Section {
                breadcrumb,
                heading: heading.to_string(),
                parents,
                chunk_id,
            },
        ));
    }

    fn finish(self) -> Vec<Segment> {
        self.segments
    }
}

impl Chunker for StructuredChunker {
    fn name(&self) -> &'static str {
        "Structured Document"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "max_chunk_size": self.max_chunk_size,
            "min_chunk_size": self.min_chunk_size,
            "chunk_size": self.window.size(),
            "overlap": self.window.overlap(),
        })
    }

    fn chunk(&self, document: &SourceDocument) -> Result<Vec<Segment>> {
        let tree = document
            .sections
            .clone()
            .ok_or_else(|| Error::MissingSectionTree {
                document_id: document.id.clone(),
            })?;

        info!(document_id = %document.id, sections = tree.sections.len(), "structured chunking started");
        let segments = self.chunk_sections(tree, &document.id);
        log_length_summary(&document.id, &segments);
        info!(document_id = %document.id, segments = segments.len(), "structured chunking done");

        Ok(segments)
    }
}
