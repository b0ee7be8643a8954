//! The Segment type: a chunk of document text with a stable id and typed metadata.
//!
//! A segment is created by one chunking strategy in one batch call and never
//! mutated afterwards. Re-chunking a document supersedes the previous set.
//!
//! ## Identifiers
//!
//! Ids are `{document_id}_chunk_{n}` (fixed-window and structured) or
//! `{document_id}_{n}` (similarity). The trailing ordinal is gap-free within
//! one run, which is what lets the reconstructor find sibling parts by
//! arithmetic alone:
//!
//! ```rust
//! use strata::{Segment, SegmentMetadata};
//!
//! let seg = Segment::new("doc", "doc_chunk_7", "text", SegmentMetadata::window(0, 4));
//! assert_eq!(seg.ordinal(), Some(7));
//! assert_eq!(seg.sibling_id(5).as_deref(), Some("doc_chunk_5"));
//! ```
//!
//! ## On-disk shape
//!
//! Persisted segments are [`ChunkRecord`]s: exactly `chunk_id`, `content` and
//! `metadata`, where `metadata` is a flat object. Each strategy writes its own
//! keys (`start`/`end`/`page_number`, `start_sentence`/`end_sentence`/
//! `forced_split`, or `breadcrumb`/`heading`/`parents`/`chunk_id`) next to
//! `document_id` and `document_name`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A chunk of document content with its id and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// The document this segment was cut from.
    pub document_id: String,
    /// Unique id within the document, ending in a gap-free ordinal.
    pub segment_id: String,
    /// The chunk text.
    pub content: String,
    /// Strategy-specific metadata.
    pub metadata: SegmentMetadata,
}

impl Segment {
    /// Create a new segment.
    #[must_use]
    pub fn new(
        document_id: impl Into<String>,
        segment_id: impl Into<String>,
        content: impl Into<String>,
        metadata: SegmentMetadata,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            segment_id: segment_id.into(),
            content: content.into(),
            metadata,
        }
    }

    /// The length of the content in chars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    /// Whether the content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// The trailing ordinal of the segment id.
    pub fn ordinal(&self) -> Option<usize> {
        split_ordinal(&self.segment_id).map(|(_, n)| n)
    }

    /// The id of the segment with ordinal `n` in the same run.
    pub fn sibling_id(&self, n: usize) -> Option<String> {
        split_ordinal(&self.segment_id).map(|(base, _)| format!("{base}_{n}"))
    }

    /// The section breadcrumb, for structured segments.
    pub fn breadcrumb(&self) -> Option<&Breadcrumb> {
        match &self.metadata {
            SegmentMetadata::Section { breadcrumb, .. } => Some(breadcrumb),
            _ => None,
        }
    }

    /// Convert to the on-disk record.
    #[must_use]
    pub fn to_record(&self, document_name: Option<&str>) -> ChunkRecord {
        ChunkRecord {
            chunk_id: self.segment_id.clone(),
            content: self.content.clone(),
            metadata: RecordMetadata {
                kind: self.metadata.clone(),
                document_id: self.document_id.clone(),
                document_name: document_name.map(str::to_string),
            },
        }
    }
}

impl From<ChunkRecord> for Segment {
    fn from(record: ChunkRecord) -> Self {
        Self {
            document_id: record.metadata.document_id,
            segment_id: record.chunk_id,
            content: record.content,
            metadata: record.metadata.kind,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Segment {{ id: {}, len: {} }}", self.segment_id, self.len())
    }
}

/// Split `base_n` into `(base, n)`.
pub(crate) fn split_ordinal(id: &str) -> Option<(&str, usize)> {
    let (base, n) = id.rsplit_once('_')?;
    n.parse().ok().map(|n| (base, n))
}

/// Per-strategy metadata.
///
/// Serialized untagged so the JSON object carries only the strategy's own keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentMetadata {
    /// A window of a structured section.
    Section {
        /// Ancestor path plus own title, with the part marker.
        breadcrumb: Breadcrumb,
        /// The (possibly merged) section title.
        heading: String,
        /// Ancestor titles, root first (stored leaf first).
        #[serde(default)]
        parents: AncestorChain,
        /// The segment's own id, repeated for vector-store metadata.
        chunk_id: String,
    },
    /// A run of sentence units.
    Sentence {
        /// First unit index (inclusive).
        start_sentence: usize,
        /// Last unit index (inclusive).
        end_sentence: usize,
        /// Emitted over the size bound because it was a single unit.
        forced_split: bool,
    },
    /// A fixed window over the raw text.
    Window {
        /// Start offset in chars.
        start: usize,
        /// End offset in chars (exclusive), clamped to the text length.
        ///
        /// The last windows of a text store the real end, not
        /// `start + chunk_size`. Files that hold the unclamped value still
        /// load; nothing reads `end` past the text.
        end: usize,
        /// Pages overlapped by the window, for paginated sources.
        #[serde(
            default,
            rename = "page_number",
            skip_serializing_if = "Option::is_none"
        )]
        page_numbers: Option<PageNumbers>,
    },
}

impl SegmentMetadata {
    /// Window metadata without page numbers.
    #[must_use]
    pub fn window(start: usize, end: usize) -> Self {
        Self::Window {
            start,
            end,
            page_numbers: None,
        }
    }

    /// Short label used in logs: the heading for sections, the kind otherwise.
    pub(crate) fn label(&self) -> &str {
        match self {
            Self::Section { heading, .. } => heading,
            Self::Sentence { .. } => "sentences",
            Self::Window { .. } => "window",
        }
    }
}

/// A section path with an optional `(part i/n)` marker.
///
/// ```rust
/// use strata::Breadcrumb;
///
/// let b = Breadcrumb::from("Guide > Install (part 2/3)");
/// assert_eq!(b.path, "Guide > Install");
/// assert_eq!(b.part.map(|p| (p.index, p.total)), Some((2, 3)));
/// assert_eq!(b.to_string(), "Guide > Install (part 2/3)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Breadcrumb {
    /// Ancestors and own title joined by `" > "`.
    pub path: String,
    /// Position among the section's windows.
    pub part: Option<Part>,
}

/// One-based position of a window within its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Part {
    /// One-based index.
    pub index: usize,
    /// Number of windows emitted for the section.
    pub total: usize,
}

const PART_MARKER: &str = " (part ";

impl Breadcrumb {
    /// A breadcrumb without a part marker.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            part: None,
        }
    }

    /// The same path with a part marker.
    #[must_use]
    pub fn with_part(mut self, index: usize, total: usize) -> Self {
        self.part = Some(Part { index, total });
        self
    }

    /// The reconstruction dedup key: path without marker, then heading.
    pub fn base_key(&self, heading: &str) -> String {
        format!("{}{}", self.path, heading)
    }

    fn parse(raw: &str) -> Self {
        let parsed = raw.rfind(PART_MARKER).and_then(|at| {
            let inner = raw[at + PART_MARKER.len()..].strip_suffix(')')?;
            let (index, total) = inner.split_once('/')?;
            let part = Part {
                index: index.trim().parse().ok()?,
                total: total.trim().parse().ok()?,
            };
            Some((at, part))
        });

        match parsed {
            Some((at, part)) => Self {
                path: raw[..at].to_string(),
                part: Some(part),
            },
            None => Self::new(raw),
        }
    }
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.part {
            Some(Part { index, total }) => write!(f, "{}{PART_MARKER}{index}/{total})", self.path),
            None => f.write_str(&self.path),
        }
    }
}

impl From<&str> for Breadcrumb {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for Breadcrumb {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Breadcrumb> for String {
    fn from(b: Breadcrumb) -> Self {
        b.to_string()
    }
}

/// Sorted, unique page numbers; stored as `"1,2,3"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PageNumbers(pub Vec<u32>);

impl PageNumbers {
    /// Build from any page list, sorting and removing duplicates.
    #[must_use]
    pub fn from_unsorted(mut pages: Vec<u32>) -> Self {
        pages.sort_unstable();
        pages.dedup();
        Self(pages)
    }
}

impl From<PageNumbers> for String {
    fn from(p: PageNumbers) -> Self {
        p.0.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
    }
}

impl TryFrom<String> for PageNumbers {
    type Error = std::num::ParseIntError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        raw.split(',')
            .map(|p| p.trim().parse())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// Ancestor titles, held root first.
///
/// On disk the order is reversed, leaf first, joined by `" > "`, which is
/// the layout existing chunk files use:
///
/// ```rust
/// use strata::AncestorChain;
///
/// let chain = AncestorChain(vec!["Guide".into(), "Install".into()]);
/// assert_eq!(String::from(chain.clone()), "Install > Guide");
/// assert_eq!(AncestorChain::from("Install > Guide".to_string()), chain);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct AncestorChain(pub Vec<String>);

impl From<AncestorChain> for String {
    fn from(c: AncestorChain) -> Self {
        c.0.iter().rev().map(String::as_str).collect::<Vec<_>>().join(" > ")
    }
}

impl From<String> for AncestorChain {
    fn from(raw: String) -> Self {
        if raw.is_empty() {
            Self::default()
        } else {
            Self(raw.rsplit(" > ").map(str::to_string).collect())
        }
    }
}

/// One persisted segment, in the on-disk JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// The segment id.
    pub chunk_id: String,
    /// The segment text.
    pub content: String,
    /// Flat metadata object.
    pub metadata: RecordMetadata,
}

/// Metadata object of a [`ChunkRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Strategy-specific keys.
    #[serde(flatten)]
    pub kind: SegmentMetadata,
    /// Owning document id.
    pub document_id: String,
    /// Human-readable document name, stamped by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
}

/// Log average length and the five longest and shortest segments.
pub(crate) fn log_length_summary(document_id: &str, segments: &[Segment]) {
    if segments.is_empty() {
        return;
    }

    let mut lengths: Vec<(usize, &Segment)> = segments.iter().map(|s| (s.len(), s)).collect();
    let average = lengths.iter().map(|(len, _)| len).sum::<usize>() / lengths.len();
    lengths.sort_by(|a, b| b.0.cmp(&a.0));

    tracing::debug!(document_id, average, count = segments.len(), "chunk length summary");
    for (len, seg) in lengths.iter().take(5) {
        tracing::debug!(len, heading = seg.metadata.label(), "long chunk");
    }
    for (len, seg) in lengths.iter().rev().take(5) {
        tracing::debug!(len, heading = seg.metadata.label(), "short chunk");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_parsing() {
        let seg = Segment::new("a_b", "a_b_chunk_12", "x", SegmentMetadata::window(0, 1));
        assert_eq!(seg.ordinal(), Some(12));
        assert_eq!(seg.sibling_id(3).as_deref(), Some("a_b_chunk_3"));

        let seg = Segment::new("d", "d_x", "x", SegmentMetadata::window(0, 1));
        assert_eq!(seg.ordinal(), None);
    }

    #[test]
    fn test_breadcrumb_without_part() {
        let b = Breadcrumb::from("root");
        assert_eq!(b.path, "root");
        assert!(b.part.is_none());
        assert_eq!(b.to_string(), "root");
    }

    #[test]
    fn test_breadcrumb_malformed_marker_is_plain_path() {
        let b = Breadcrumb::from("Intro (part x/2)");
        assert!(b.part.is_none());
        assert_eq!(b.path, "Intro (part x/2)");
    }

    #[test]
    fn test_breadcrumb_uses_last_marker() {
        let b = Breadcrumb::from("A (part 1/2) > B (part 3/4)");
        assert_eq!(b.path, "A (part 1/2) > B");
        assert_eq!(b.part, Some(Part { index: 3, total: 4 }));
    }

    #[test]
    fn test_section_record_json_shape() {
        let seg = Segment::new(
            "doc",
            "doc_chunk_0",
            "Εισαγωγή\n\nκείμενο",
            SegmentMetadata::Section {
                breadcrumb: Breadcrumb::new("A > Εισαγωγή").with_part(1, 1),
                heading: "Εισαγωγή".into(),
                parents: AncestorChain(vec!["A".into()]),
                chunk_id: "doc_chunk_0".into(),
            },
        );
        let json = serde_json::to_value(seg.to_record(Some("guide.docx"))).unwrap();

        assert_eq!(json["chunk_id"], "doc_chunk_0");
        assert_eq!(json["metadata"]["breadcrumb"], "A > Εισαγωγή (part 1/1)");
        assert_eq!(json["metadata"]["parents"], "A");
        assert_eq!(json["metadata"]["document_id"], "doc");
        assert_eq!(json["metadata"]["document_name"], "guide.docx");
        assert_eq!(json.as_object().unwrap().len(), 3);

        let text = serde_json::to_string(&seg.to_record(None)).unwrap();
        assert!(text.contains("Εισαγωγή"), "non-ASCII must not be escaped");
    }

    #[test]
    fn test_parents_stored_leaf_first() {
        let parents = AncestorChain(vec!["Guide".into(), "Install".into(), "Linux".into()]);
        let seg = Segment::new(
            "doc",
            "doc_chunk_3",
            "text",
            SegmentMetadata::Section {
                breadcrumb: Breadcrumb::new("Guide > Install > Linux > Flags").with_part(1, 1),
                heading: "Flags".into(),
                parents: parents.clone(),
                chunk_id: "doc_chunk_3".into(),
            },
        );

        let record = seg.to_record(None);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["metadata"]["parents"], "Linux > Install > Guide");

        match Segment::from(record).metadata {
            SegmentMetadata::Section { parents: back, .. } => assert_eq!(back, parents),
            other => panic!("expected section metadata, got {other:?}"),
        }
    }

    #[test]
    fn test_record_roundtrip_picks_variant() {
        let raw = r#"[
            {"chunk_id": "d_chunk_0", "content": "a", "metadata": {"start": 0, "end": 1, "page_number": "1,2", "document_id": "d"}},
            {"chunk_id": "d_1", "content": "b", "metadata": {"start_sentence": 0, "end_sentence": 2, "forced_split": false, "document_id": "d"}},
            {"chunk_id": "d_chunk_2", "content": "c", "metadata": {"breadcrumb": "root", "chunk_id": "d_chunk_2", "heading": "default", "parents": "", "document_id": "d"}}
        ]"#;
        let records: Vec<ChunkRecord> = serde_json::from_str(raw).unwrap();
        let segments: Vec<Segment> = records.into_iter().map(Segment::from).collect();

        assert_eq!(
            segments[0].metadata,
            SegmentMetadata::Window {
                start: 0,
                end: 1,
                page_numbers: Some(PageNumbers(vec![1, 2])),
            }
        );
        assert!(matches!(
            segments[1].metadata,
            SegmentMetadata::Sentence { end_sentence: 2, .. }
        ));
        assert_eq!(segments[2].breadcrumb().unwrap().path, "root");
        assert!(segments.iter().all(|s| s.document_id == "d"));
    }

    #[test]
    fn test_page_numbers_dedup_sorted() {
        let p = PageNumbers::from_unsorted(vec![3, 1, 3, 2]);
        assert_eq!(String::from(p), "1,2,3");
    }
}
