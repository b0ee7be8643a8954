//! Persisted chunk sets.
//!
//! ## Layout
//!
//! ```text
//! {root}/
//!   manuals_Structured Document/
//!     guide.docx.json        [ {chunk_id, content, metadata}, ... ]
//!     faq.pdf.json
//!   manuals_Fixed Size/
//!     guide.docx.json
//! ```
//!
//! One directory per (domain, strategy name), one pretty-printed JSON array
//! per document. Non-ASCII text is written as is, not `\u` escaped.
//!
//! At query time a [`SegmentIndex`] loads every file of one strategy across
//! all domains and serves segments by id to the
//! [`ContextReconstructor`](crate::ContextReconstructor).

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{ChunkRecord, Result, Segment, SegmentLookup};

/// Writes and reads chunk files under one root directory.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    /// A store rooted at `root`. Nothing is created until the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the chunks of one document live.
    #[must_use]
    pub fn path_for(&self, domain: &str, strategy: &str, document_name: &str) -> PathBuf {
        self.root
            .join(format!("{domain}_{strategy}"))
            .join(format!("{document_name}.json"))
    }

    /// Write a document's segments, replacing any previous set.
    ///
    /// `document_name` is stamped into every record's metadata.
    ///
    /// # Errors
    ///
    /// I/O or serialization failures.
    pub fn write(
        &self,
        domain: &str,
        strategy: &str,
        document_name: &str,
        segments: &[Segment],
    ) -> Result<PathBuf> {
        let path = self.path_for(domain, strategy, document_name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let records: Vec<ChunkRecord> = segments
            .iter()
            .map(|s| s.to_record(Some(document_name)))
            .collect();

        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &records)?;
        writer.flush()?;

        info!(path = %path.display(), chunks = records.len(), "stored chunks");
        Ok(path)
    }

    /// Read one chunk file.
    ///
    /// # Errors
    ///
    /// I/O failures, or any record that does not parse.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<ChunkRecord>> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Segments of one strategy, by id.
#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    segments: HashMap<String, Segment>,
}

impl SegmentIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every chunk file of `strategy` under `root`, across domains.
    ///
    /// Unreadable files and invalid records are skipped with a warning. When
    /// two records share an id, the one loaded later wins.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be listed.
    pub fn load(root: impl AsRef<Path>, strategy: &str) -> Result<Self> {
        let suffix = format!("_{strategy}");
        let mut index = Self::new();

        for dir in sorted_entries(root.as_ref())? {
            let matches = dir.is_dir()
                && dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(&suffix));
            if !matches {
                continue;
            }

            for file in sorted_entries(&dir)? {
                if file.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                index.load_file(&file);
            }
        }

        info!(strategy, segments = index.len(), "segment index loaded");
        Ok(index)
    }

    fn load_file(&mut self, path: &Path) {
        let values: Vec<serde_json::Value> = match File::open(path)
            .map_err(crate::Error::from)
            .and_then(|f| Ok(serde_json::from_reader(BufReader::new(f))?))
        {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable chunk file");
                return;
            }
        };

        for value in values {
            match serde_json::from_value::<ChunkRecord>(value) {
                Ok(record) => self.insert(record.into()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping invalid chunk record");
                }
            }
        }
        debug!(path = %path.display(), "chunk file loaded");
    }

    /// Add a segment, replacing any with the same id.
    pub fn insert(&mut self, segment: Segment) {
        if let Some(old) = self.segments.insert(segment.segment_id.clone(), segment) {
            warn!(chunk_id = %old.segment_id, "duplicate chunk id, keeping the later one");
        }
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromIterator<Segment> for SegmentIndex {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        let mut index = Self::new();
        for segment in iter {
            index.insert(segment);
        }
        index
    }
}

impl SegmentLookup for SegmentIndex {
    fn segment(&self, chunk_id: &str) -> Option<&Segment> {
        self.segments.get(chunk_id)
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AncestorChain, Breadcrumb, SegmentMetadata};

    fn section(doc: &str, n: usize, text: &str) -> Segment {
        let id = format!("{doc}_chunk_{n}");
        Segment::new(
            doc,
            id.clone(),
            text,
            SegmentMetadata::Section {
                breadcrumb: Breadcrumb::new("Κεφάλαιο").with_part(n + 1, 2),
                heading: "Κεφάλαιο".into(),
                parents: AncestorChain::default(),
                chunk_id: id,
            },
        )
    }

    #[test]
    fn test_write_layout_and_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());
        let segments = vec![section("d", 0, "πρώτο"), section("d", 1, "δεύτερο")];

        let path = store
            .write("manuals", "Structured Document", "guide.docx", &segments)
            .unwrap();
        assert_eq!(
            path,
            dir.path()
                .join("manuals_Structured Document")
                .join("guide.docx.json")
        );

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("πρώτο"));
        assert!(raw.contains("\n  {"), "two-space indent");

        let records = store.read(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].metadata.document_name.as_deref(), Some("guide.docx"));
        assert_eq!(Segment::from(records[0].clone()), segments[0]);
    }

    #[test]
    fn test_index_loads_matching_strategy_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());
        store
            .write("a", "Structured Document", "one", &[section("one", 0, "x")])
            .unwrap();
        store
            .write("b", "Structured Document", "two", &[section("two", 0, "y")])
            .unwrap();
        store
            .write("a", "Fixed Size", "one", &[section("other", 0, "z")])
            .unwrap();

        let index = SegmentIndex::load(dir.path(), "Structured Document").unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.segment("two_chunk_0").unwrap().content, "y");
        assert!(index.segment("other_chunk_0").is_none());
    }

    #[test]
    fn test_index_skips_invalid_records() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("a_Structured Document");
        fs::create_dir_all(&sub).unwrap();
        fs::write(
            sub.join("doc.json"),
            r#"[
                {"chunk_id": "d_chunk_0", "content": "ok", "metadata": {"breadcrumb": "root", "heading": "default", "parents": "", "chunk_id": "d_chunk_0", "document_id": "d"}},
                {"chunk_id": "d_chunk_1", "content": "no metadata"},
                {"chunk_id": "d_chunk_2", "content": "bad", "metadata": {"document_id": "d"}}
            ]"#,
        )
        .unwrap();
        fs::write(sub.join("broken.json"), "not json").unwrap();

        let index = SegmentIndex::load(dir.path(), "Structured Document").unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.segment("d_chunk_0").is_some());
    }

    #[test]
    fn test_duplicate_ids_later_wins() {
        let index: SegmentIndex = vec![section("d", 0, "old"), section("d", 0, "new")]
            .into_iter()
            .collect();
        assert_eq!(index.len(), 1);
        assert_eq!(index.segment("d_chunk_0").unwrap().content, "new");
    }

    #[test]
    fn test_missing_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SegmentIndex::load(dir.path().join("absent"), "Fixed Size").is_err());
    }
}
