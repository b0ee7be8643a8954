//! Lossless sentence units.
//!
//! Similarity-guided chunking works on sentence units, and it must never
//! drop or alter a char on the way. Every step here is checked: concatenating
//! the units must give back the (trimmed) input exactly.
//!
//! ## Boundaries
//!
//! A boundary is a run of whitespace after `.`, `!` or `?`. The whitespace is
//! kept at the end of the preceding unit:
//!
//! ```text
//! "One. Two!  Three"  ->  ["One. ", "Two!  ", "Three"]
//! ```
//!
//! ## Oversized Units
//!
//! A unit longer than the size bound is divided further, trying progressively
//! finer delimiters and keeping each delimiter on its piece:
//!
//! ```text
//! 1. ";"   "a; b; c"  ->  ["a;", " b;", " c"]
//! 2. ","   used when some ";" piece is still too long
//! 3. force slices of at most max chars, cut on grapheme boundaries
//! ```

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::{Error, Result};

fn boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.!?]\s+").expect("boundary pattern is valid"))
}

/// Split `content` into sentence units of at most `max_chunk_size` chars
/// where possible.
///
/// The input is trimmed first; the units concatenate to the trimmed input.
///
/// ```rust
/// use strata::split_units;
///
/// let units = split_units("  One. Two? Three.  ", 100)?;
/// assert_eq!(units, vec!["One. ", "Two? ", "Three."]);
/// assert_eq!(units.concat(), "One. Two? Three.");
/// # Ok::<(), strata::Error>(())
/// ```
///
/// # Errors
///
/// Returns [`Error::ContentIntegrity`] if any split loses or alters chars.
pub fn split_units(content: &str, max_chunk_size: usize) -> Result<Vec<String>> {
    let original = content.trim();
    let sentences = split_sentences(original);
    verify("sentence split", original, &sentences)?;

    let mut units = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        if sentence.chars().count() > max_chunk_size {
            let pieces = split_oversized(sentence, max_chunk_size);
            verify("oversized sentence split", sentence, &pieces)?;
            units.extend(pieces.into_iter().map(str::to_string));
        } else {
            units.push(sentence.to_string());
        }
    }

    verify("unit processing", original, &units)?;
    Ok(units)
}

/// Split at sentence boundaries, keeping separators.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last = 0;

    for m in boundary().find_iter(text) {
        sentences.push(&text[last..m.end()]);
        last = m.end();
    }
    if last < text.len() {
        sentences.push(&text[last..]);
    }

    sentences
}

/// Divide one oversized sentence: semicolons, then commas, then slices.
fn split_oversized(sentence: &str, max: usize) -> Vec<&str> {
    warn!(
        len = sentence.chars().count(),
        max, "sentence longer than max_chunk_size"
    );

    for delimiter in [';', ','] {
        let pieces = split_keeping(sentence, delimiter);
        if pieces.iter().all(|p| p.chars().count() <= max) {
            return pieces;
        }
    }

    warn!(max, "forcing split by character count");
    force_split(sentence, max)
}

/// Split on `delimiter`, re-attaching it to every piece but the last.
fn split_keeping(text: &str, delimiter: char) -> Vec<&str> {
    text.split_inclusive(delimiter)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Slices of at most `max` chars, never cutting a grapheme cluster.
fn force_split(text: &str, max: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = 0;

    for (offset, grapheme) in text.grapheme_indices(true) {
        let width = grapheme.chars().count();
        if chars > 0 && chars + width > max {
            pieces.push(&text[start..offset]);
            start = offset;
            chars = 0;
        }
        chars += width;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

fn verify<S: AsRef<str>>(stage: &'static str, original: &str, pieces: &[S]) -> Result<()> {
    let rejoined: String = pieces.iter().map(|p| -> &str { p.as_ref() }).collect();
    if rejoined == original {
        return Ok(());
    }

    let (expected, actual) = (original.chars().count(), rejoined.chars().count());
    tracing::error!(stage, expected, actual, "content loss detected");
    Err(Error::ContentIntegrity {
        stage,
        expected,
        actual,
    })
}
