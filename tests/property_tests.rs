//! Property-based tests for segmentation.
//!
//! These tests verify that the chunking strategies maintain key invariants:
//! - Round trip: fixed windows stitch back to the input
//! - Integrity: sentence units concatenate to the trimmed input
//! - Ids: unique, gap-free ordinals within one run
//! - Partition: deterministic, ordered, covering every unit once

use proptest::prelude::*;
use strata::{
    partition, split_units, FixedWindowChunker, SectionNode, SectionTree, Segment,
    SegmentMetadata, StructuredChunker,
};

// =============================================================================
// Test Generators
// =============================================================================

/// Arbitrary text, including non-ASCII.
fn arbitrary_text() -> impl Strategy<Value = String> {
    prop::string::string_regex("(.|\n){0,500}").unwrap()
}

/// Text with sentence-like structure.
fn sentence_like_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::string::string_regex("[A-Za-z;,]{1,15}").unwrap(), 3..40)
        .prop_map(|words| {
            let mut result = String::new();
            for (i, word) in words.iter().enumerate() {
                result.push_str(word);
                match i % 7 {
                    3 => result.push_str(". "),
                    5 => result.push_str("!\n\n"),
                    _ => result.push(' '),
                }
            }
            result
        })
}

/// Units with a matching similarity vector.
fn units_and_similarities() -> impl Strategy<Value = (Vec<String>, Vec<f32>)> {
    prop::collection::vec(prop::string::string_regex("[a-z ]{1,40}").unwrap(), 1..30)
        .prop_flat_map(|units| {
            let n = units.len();
            (Just(units), prop::collection::vec(0.0f32..1.0, n - 1))
        })
}

/// Flat section lists with levels and paragraphs.
fn section_list() -> impl Strategy<Value = Vec<SectionNode>> {
    prop::collection::vec(
        (1u32..4, prop::collection::vec("[a-z .-]{0,120}", 0..4)),
        1..12,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (level, paras))| SectionNode::new(format!("S{i}"), level).with_content(paras))
            .collect()
    })
}

// =============================================================================
// Invariant Helpers
// =============================================================================

/// Ids end in 0, 1, 2, ... in emission order.
fn ids_gap_free(segments: &[Segment], prefix: &str) -> bool {
    segments
        .iter()
        .enumerate()
        .all(|(i, s)| s.segment_id == format!("{prefix}{i}"))
}

/// Char count of the units joined by single spaces, separators kept.
fn joined_len(units: &[String]) -> usize {
    units.join(" ").chars().count()
}

// =============================================================================
// FixedWindowChunker Tests
// =============================================================================

proptest! {
    #[test]
    fn fixed_stitch_roundtrip(text in arbitrary_text(), size in 1usize..120, overlap in 0usize..40) {
        let chunker = FixedWindowChunker::new(size, overlap.min(size - 1));
        let segments = chunker.chunk_text(&text, "doc");
        prop_assert_eq!(FixedWindowChunker::stitch(&segments), text);
    }

    #[test]
    fn fixed_trimmed_overlap_bridges(text in arbitrary_text(), size in 2usize..120, overlap in 1usize..40) {
        let overlap = overlap.min(size - 1);
        let segments = FixedWindowChunker::new(size, overlap).chunk_text(&text, "doc");

        // Every window but the last, minus its overlap, then the last whole.
        let mut rebuilt = String::new();
        for (i, seg) in segments.iter().enumerate() {
            if i + 1 == segments.len() {
                rebuilt.push_str(&seg.content);
            } else {
                rebuilt.extend(seg.content.chars().take(size - overlap));
            }
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn fixed_windows_match_offsets(text in arbitrary_text(), size in 1usize..80) {
        let chars: Vec<char> = text.chars().collect();
        let segments = FixedWindowChunker::new(size, size / 3).chunk_text(&text, "doc");

        for seg in &segments {
            match seg.metadata {
                SegmentMetadata::Window { start, end, .. } => {
                    prop_assert!(start < end && end <= chars.len());
                    prop_assert!(end - start <= size);
                    let expected: String = chars[start..end].iter().collect();
                    prop_assert_eq!(&seg.content, &expected);
                }
                _ => prop_assert!(false, "expected window metadata"),
            }
        }
    }

    #[test]
    fn fixed_ids_gap_free(text in arbitrary_text(), size in 1usize..60) {
        let segments = FixedWindowChunker::new(size, 0).chunk_text(&text, "doc");
        prop_assert!(ids_gap_free(&segments, "doc_chunk_"));
    }
}

// =============================================================================
// Sentence Unit Tests
// =============================================================================

proptest! {
    #[test]
    fn units_concatenate_to_trimmed_input(text in arbitrary_text(), max in 1usize..200) {
        let units = split_units(&text, max).unwrap();
        prop_assert_eq!(units.concat(), text.trim());
    }

    #[test]
    fn ascii_units_fit_bound(text in sentence_like_text(), max in 1usize..60) {
        let units = split_units(&text, max).unwrap();
        prop_assert_eq!(units.concat(), text.trim());
        for unit in &units {
            prop_assert!(!unit.is_empty());
            prop_assert!(unit.chars().count() <= max, "unit {:?} exceeds {}", unit, max);
        }
    }
}

// =============================================================================
// Partition Tests
// =============================================================================

proptest! {
    #[test]
    fn partition_covers_units_in_order((units, sims) in units_and_similarities(), max in 1usize..200) {
        let spans = partition(&units, &sims, max).unwrap();

        let mut next = 0;
        for span in &spans {
            prop_assert_eq!(span.start, next);
            prop_assert!(span.start <= span.end);
            let len = joined_len(&units[span.start..=span.end]);
            if span.forced {
                prop_assert_eq!(span.start, span.end);
                prop_assert!(len > max);
            } else {
                prop_assert!(len <= max);
            }
            next = span.end + 1;
        }
        prop_assert_eq!(next, units.len());
    }

    #[test]
    fn partition_is_deterministic((units, sims) in units_and_similarities(), max in 1usize..200) {
        let first = partition(&units, &sims, max).unwrap();
        let second = partition(&units, &sims, max).unwrap();
        prop_assert_eq!(first, second);
    }
}

// =============================================================================
// StructuredChunker Tests
// =============================================================================

proptest! {
    #[test]
    fn structured_ids_gap_free(sections in section_list()) {
        let segments = StructuredChunker::new(100, 20)
            .with_min_chunk_size(50)
            .chunk_sections(SectionTree::new(sections), "doc");
        prop_assert!(ids_gap_free(&segments, "doc_chunk_"));
    }

    #[test]
    fn structured_parts_are_contiguous(sections in section_list()) {
        let segments = StructuredChunker::new(100, 20)
            .with_min_chunk_size(50)
            .chunk_sections(SectionTree::new(sections), "doc");

        for (k, seg) in segments.iter().enumerate() {
            let crumb = seg.breadcrumb().unwrap();
            let part = crumb.part.unwrap();
            prop_assert!(part.index >= 1 && part.index <= part.total);

            // Every sibling sits at the ordinal implied by the part index.
            let first = k + 1 - part.index;
            for sibling in &segments[first..first + part.total] {
                let sc = sibling.breadcrumb().unwrap();
                prop_assert_eq!(&sc.path, &crumb.path);
                prop_assert_eq!(sc.part.unwrap().total, part.total);
            }
        }
    }

    #[test]
    fn structured_small_sections_still_emit(sections in section_list()) {
        let has_text = sections
            .iter()
            .any(|s| s.content.iter().any(|p| p.chars().any(char::is_alphanumeric)));
        let segments = StructuredChunker::new(100, 20)
            .with_min_chunk_size(10_000)
            .chunk_sections(SectionTree::new(sections), "doc");
        prop_assert_eq!(!segments.is_empty(), has_text);
    }
}

// =============================================================================
// Edge Cases
// =============================================================================

#[test]
fn empty_input_produces_empty_output() {
    assert!(FixedWindowChunker::new(50, 10).chunk_text("", "d").is_empty());
    assert!(split_units("", 50).unwrap().is_empty());
    assert!(partition(&[], &[], 50).unwrap().is_empty());
    assert!(StructuredChunker::default()
        .chunk_sections(SectionTree::default(), "d")
        .is_empty());
}

#[test]
fn unicode_handling() {
    let text = "Hello 世界! Привет мир! Γειά σου κόσμε. مرحبا بالعالم";
    let segments = FixedWindowChunker::new(7, 2).chunk_text(text, "d");
    assert!(segments.iter().all(|s| s.len() <= 7));
    assert_eq!(FixedWindowChunker::stitch(&segments), text);

    let units = split_units(text, 8).unwrap();
    assert_eq!(units.concat(), text);
}

#[test]
fn chunking_is_deterministic() {
    let text = "The quick brown fox jumps over the lazy dog. Pack my box.";
    let fixed = FixedWindowChunker::new(30, 5);
    assert_eq!(fixed.chunk_text(text, "d"), fixed.chunk_text(text, "d"));
}
