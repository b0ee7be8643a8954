//! Recovering a section outline from plain PDF text.
//!
//! PDF text extraction yields lines, not headings. This module guesses which
//! lines are headings with a small vote:
//!
//! | Signal                               | Example            |
//! |--------------------------------------|--------------------|
//! | shorter than 200 chars               |                    |
//! | ends with `.`, `:` or `?`            | `Scope:`           |
//! | contains an uppercase letter         | `Installation`     |
//! | not indented by four spaces          |                    |
//! | starts with a section number         | `2.1 Requirements` |
//!
//! Three or more signals make a heading. The vote is generous: most short
//! capitalised lines qualify, so body text is typically lowercase
//! continuation lines.
//!
//! Levels come from the numbering depth plus indentation:
//!
//! ```text
//! "Intro"          -> 1
//! "2 Setup"        -> 1
//! "2.1 Install"    -> 2
//! "  2.1.4 Flags"  -> 3 + 1 = 4
//! ```

use std::sync::OnceLock;

use regex::Regex;

use crate::{Attachment, SectionBody, SectionNode, SectionTree};

const MAX_HEADING_LEN: usize = 200;
const MAX_LEVEL: usize = 6;

fn numbering() -> &'static Regex {
    static NUMBERING: OnceLock<Regex> = OnceLock::new();
    NUMBERING.get_or_init(|| Regex::new(r"^[0-9.]+\s+").expect("numbering pattern is valid"))
}

/// Builds a [`SectionTree`] page by page.
///
/// ```rust
/// use strata::OutlineBuilder;
///
/// let mut builder = OutlineBuilder::new();
/// builder.add_page("preface text\n1 Overview\nthe system has\ntwo parts\n1.1 Parts\nnamely these", 0);
/// let tree = builder.finish();
///
/// assert_eq!(tree.default.unwrap().content, vec!["preface text"]);
/// assert_eq!(tree.sections[0].title, "1 Overview");
/// assert_eq!(tree.sections[1].level, 2);
/// assert_eq!(tree.sections[1].content, vec!["namely these"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutlineBuilder {
    default: SectionBody,
    sections: Vec<SectionNode>,
    pages: usize,
}

impl OutlineBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from page texts without images.
    #[must_use]
    pub fn from_pages<I, S>(pages: I) -> SectionTree
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = Self::new();
        for page in pages {
            builder.add_page(page.as_ref(), 0);
        }
        builder.finish()
    }

    /// Add one page of text and the number of images found on it.
    ///
    /// Images become `![Image](page_{p}_image_{i})` placeholders (0-based
    /// page) in whatever section is open at the end of the page.
    pub fn add_page(&mut self, text: &str, images: usize) -> &mut Self {
        for raw in text.lines() {
            let line = raw.trim_end();
            if line.trim_start().is_empty() {
                continue;
            }

            if is_heading(line) {
                self.sections
                    .push(SectionNode::new(line.trim_start(), heading_level(line)));
            } else {
                self.target_content().push(line.trim_start().to_string());
            }
        }

        for i in 0..images {
            let id = format!("page_{}_image_{i}", self.pages);
            self.target_content().push(format!("![Image]({id})"));
            let attachment = Attachment {
                id: id.clone().into(),
                content: id.into(),
            };
            match self.sections.last_mut() {
                Some(section) => section.images.push(attachment),
                None => self.default.images.push(attachment),
            }
        }

        self.pages += 1;
        self
    }

    fn target_content(&mut self) -> &mut Vec<String> {
        match self.sections.last_mut() {
            Some(section) => &mut section.content,
            None => &mut self.default.content,
        }
    }

    /// The finished tree. The default body is omitted when empty.
    #[must_use]
    pub fn finish(self) -> SectionTree {
        let tree = SectionTree::new(self.sections);
        if self.default.content.is_empty() && self.default.images.is_empty() {
            tree
        } else {
            tree.with_default(self.default)
        }
    }
}

/// Whether a line looks like a heading.
///
/// The line is judged with its leading indentation, so an indented line
/// loses the "not indented" vote.
///
/// ```rust
/// use strata::is_heading;
///
/// assert!(is_heading("3.2 Limits"));
/// assert!(!is_heading("continued from the previous page"));
/// ```
pub fn is_heading(line: &str) -> bool {
    let trimmed = line.trim();
    let signals = [
        line.chars().count() < MAX_HEADING_LEN,
        trimmed.ends_with(['.', ':', '?']),
        line.chars().any(char::is_uppercase),
        !line.starts_with("    "),
        numbering().is_match(line.trim_start()),
    ];
    signals.into_iter().filter(|&s| s).count() >= 3
}

/// Heading level: numbering depth plus half the indentation, in `1..=6`.
pub fn heading_level(line: &str) -> u32 {
    let body = line.trim_start();
    let mut level = 1;

    if numbering().is_match(body) {
        let number = body.split_whitespace().next().unwrap_or_default();
        level = number.matches('.').count() + 1;
    }

    let indent = line.chars().count() - body.chars().count();
    level += indent / 2;

    level.clamp(1, MAX_LEVEL) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_heading_levels() {
        assert_eq!(heading_level("Intro"), 1);
        assert_eq!(heading_level("2 Setup"), 1);
        assert_eq!(heading_level("2.1 Install"), 2);
        assert_eq!(heading_level("  2.1.4 Flags"), 4);
        assert_eq!(heading_level("1.2.3.4.5.6.7 Deep"), 6);
    }

    #[test]
    fn test_heading_votes() {
        assert!(is_heading("Scope:"));
        assert!(is_heading("1.2 requirements"));
        assert!(!is_heading("lowercase body text"));
        // Long, lowercase, no punctuation: one signal only.
        assert!(!is_heading(&format!("    {}", "x".repeat(250))));
    }

    #[test]
    fn test_indentation_is_judged_before_stripping() {
        // Four leading spaces cost the "not indented" vote.
        assert!(is_heading("see also:"));
        assert!(!is_heading("    see also:"));

        // Indentation adds to the level of a numbered heading.
        assert_eq!(heading_level("2.1 Install"), 2);
        assert_eq!(heading_level("    2.1 Install"), 4);

        let tree = OutlineBuilder::from_pages(["Intro\n    see also:\n    2.1 Install\nsteps"]);
        assert_eq!(tree.sections.len(), 2);
        assert_eq!(tree.sections[0].content, vec!["see also:"]);
        assert_eq!(tree.sections[1].title, "2.1 Install");
        assert_eq!(tree.sections[1].level, 4);
        assert_eq!(tree.sections[1].content, vec!["steps"]);
    }

    #[test]
    fn test_builder_routes_content() {
        let mut builder = OutlineBuilder::new();
        builder
            .add_page("before any heading\nIntroduction\nbody line one\n\n   \nbody line two", 1)
            .add_page("more body\nDetails:\ndetail text", 0);
        let tree = builder.finish();

        let default = tree.default.unwrap();
        assert_eq!(default.content, vec!["before any heading"]);

        assert_eq!(tree.sections.len(), 2);
        assert_eq!(tree.sections[0].title, "Introduction");
        assert_eq!(
            tree.sections[0].content,
            vec![
                "body line one",
                "body line two",
                "![Image](page_0_image_0)",
                "more body",
            ]
        );
        assert_eq!(tree.sections[0].images[0].id, "page_0_image_0");
        assert_eq!(tree.sections[1].content, vec!["detail text"]);
    }

    #[test]
    fn test_empty_default_omitted() {
        let tree = OutlineBuilder::from_pages(["Title\nsome text"]);
        assert!(tree.default.is_none());
        assert_eq!(tree.sections.len(), 1);
    }
}
