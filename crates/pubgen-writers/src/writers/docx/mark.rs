/*
 * mark.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Regenerable regions of an edited document.
//!
//! A region is bounded by two sentinel paragraphs. The start paragraph's
//! text begins with the section name; the end paragraph's text is the
//! section name followed by [`END_TAG`]. Everything strictly between them
//! is owned by the generator and replaced on every run, while the rest of
//! the document is left alone.

use super::document::{element_at, element_mut, find_paragraph, insert_at, starts_with_mark};
use crate::ooxml::wordml::{
    RunProps, append_run, first_run, hide_runs, new_paragraph, new_run, paragraph_style,
    paragraph_text, set_keep_with_next,
};
use once_cell::sync::Lazy;
use pubgen_xml::XmlElement;
use regex::Regex;
use std::collections::BTreeSet;

pub const END_TAG: &str = ".END-OF-GENERATED-TEXT";
pub const GENERATED_NOTE: &str = " GENERATED TEXT: DO NOT MODIFY";

static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]").unwrap());

/// Body positions of the two sentinels of a prepared region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionMark {
    start: usize,
    end: usize,
}

impl InsertionMark {
    /// Locate the region of `name` and empty it.
    ///
    /// A lone mark paragraph is turned into the end sentinel and a start
    /// sentinel is inserted before it. Returns `None` when the document
    /// holds no paragraph starting with `name`.
    pub fn prepare(body: &mut XmlElement, name: &str, visible: bool) -> Option<Self> {
        let end_text = format!("{}{}", name, END_TAG);
        let found = find_paragraph(body, 0, name)?;
        let found_is_end = element_at(body, found)
            .is_some_and(|p| starts_with_mark(&paragraph_text(p), &end_text));

        let mark = if found_is_end {
            insert_start_before(body, found, name);
            Self {
                start: found,
                end: found + 1,
            }
        } else if let Some(end) = find_paragraph(body, found + 1, &end_text) {
            let removed = body.children.drain(found + 1..end).count();
            tracing::debug!("Removed {} generated nodes of '{}'", removed, name);
            Self {
                start: found,
                end: found + 1,
            }
        } else {
            if let Some(p) = element_mut(body, found) {
                append_run(p, END_TAG);
            }
            insert_start_before(body, found, name);
            Self {
                start: found,
                end: found + 1,
            }
        };

        if !visible {
            for index in [mark.start, mark.end] {
                if let Some(p) = element_mut(body, index) {
                    hide_runs(p);
                }
            }
        }
        Some(mark)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Insert generated content just before the end sentinel and return
    /// its position.
    pub fn insert_before_end(&mut self, body: &mut XmlElement, element: XmlElement) -> usize {
        let index = self.end;
        insert_at(body, index, element);
        self.end += 1;
        index
    }

    /// Paragraph style of the end sentinel.
    pub fn style(&self, body: &XmlElement) -> Option<String> {
        element_at(body, self.end).and_then(paragraph_style)
    }

    /// Formatting of the end sentinel's first run, without its hidden flag.
    pub fn run_model(&self, body: &XmlElement) -> RunProps {
        element_at(body, self.end)
            .and_then(first_run)
            .map(RunProps::from_run)
            .unwrap_or_default()
    }

    /// Keep the start sentinel on the page of the content that follows.
    pub fn finish(&self, body: &mut XmlElement) {
        if let Some(p) = element_mut(body, self.start) {
            set_keep_with_next(p);
        }
    }
}

fn insert_start_before(body: &mut XmlElement, index: usize, name: &str) {
    let (style, props) = match element_at(body, index) {
        Some(p) => (
            paragraph_style(p),
            first_run(p).map(RunProps::from_run).unwrap_or_default(),
        ),
        None => (None, RunProps::default()),
    };
    let start = new_paragraph(style.as_deref())
        .with_child(new_run(name, &props))
        .with_child(new_run(GENERATED_NOTE, &props));
    insert_at(body, index, start);
}

/// Bracketed citation keys found outside the generated region of `mark`,
/// sorted and de-duplicated.
///
/// `[a]` and `[a, b]` both cite; the text between the sentinels is skipped
/// so previously generated entries do not cite themselves.
pub fn cited_keys(body: &XmlElement, mark: &str) -> Vec<String> {
    let end_text = format!("{}{}", mark, END_TAG);
    let mut keys = BTreeSet::new();
    // Keys seen since the start sentinel; kept only if no end sentinel follows.
    let mut region: Option<BTreeSet<String>> = None;
    for element in body.elements() {
        let text = paragraph_text(element);
        if element.is("w:p") {
            if starts_with_mark(&text, &end_text) {
                region = None;
                continue;
            }
            if starts_with_mark(&text, mark) {
                if let Some(pending) = region.take() {
                    keys.extend(pending);
                }
                region = Some(BTreeSet::new());
                continue;
            }
        }
        let found = bracketed_keys(&text);
        match region.as_mut() {
            Some(pending) => pending.extend(found),
            None => keys.extend(found),
        }
    }
    if let Some(pending) = region {
        keys.extend(pending);
    }
    keys.into_iter().collect()
}

fn bracketed_keys(text: &str) -> Vec<String> {
    CITATION
        .captures_iter(text)
        .flat_map(|caps| {
            caps[1]
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty() && !key.contains(char::is_whitespace))
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::wordml::text_paragraph;

    fn body_of(texts: &[&str]) -> XmlElement {
        let mut body = XmlElement::new("w:body");
        for text in texts {
            body.push_element(text_paragraph(text, Some("Normal"), &RunProps::default()));
        }
        body
    }

    fn texts(body: &XmlElement) -> Vec<String> {
        body.elements().map(paragraph_text).collect()
    }

    #[test]
    fn test_first_preparation_creates_both_marks() {
        let mut body = body_of(&["intro", "#list", "outro"]);
        let mark = InsertionMark::prepare(&mut body, "#list", true).unwrap();
        assert_eq!((mark.start(), mark.end()), (1, 2));
        assert_eq!(
            texts(&body),
            vec![
                "intro".to_string(),
                format!("#list{}", GENERATED_NOTE),
                format!("#list{}", END_TAG),
                "outro".to_string(),
            ]
        );
        assert_eq!(mark.style(&body).as_deref(), Some("Normal"));
    }

    #[test]
    fn test_preparation_empties_existing_region() {
        let mut body = body_of(&["#list", "#list.END-OF-GENERATED-TEXT", "after"]);
        let mut mark = InsertionMark::prepare(&mut body, "#list", true).unwrap();
        mark.insert_before_end(&mut body, text_paragraph("old 1", None, &RunProps::default()));
        mark.insert_before_end(&mut body, text_paragraph("old 2", None, &RunProps::default()));
        assert_eq!(body.elements().count(), 5);

        let mark = InsertionMark::prepare(&mut body, "#list", true).unwrap();
        assert_eq!((mark.start(), mark.end()), (0, 1));
        assert_eq!(
            texts(&body),
            vec!["#list", "#list.END-OF-GENERATED-TEXT", "after"]
        );
    }

    #[test]
    fn test_missing_mark() {
        let mut body = body_of(&["nothing here"]);
        assert!(InsertionMark::prepare(&mut body, "#list", false).is_none());
        assert_eq!(texts(&body), vec!["nothing here"]);
    }

    #[test]
    fn test_marks_are_hidden_unless_visible() {
        let mut body = body_of(&["#list"]);
        let mark = InsertionMark::prepare(&mut body, "#list", false).unwrap();
        for index in [mark.start(), mark.end()] {
            let p = element_at(&body, index).unwrap();
            for run in p.elements_named("w:r") {
                assert!(run.child("w:rPr").unwrap().child("w:vanish").is_some());
            }
        }
        // The run model never copies the hidden flag
        assert!(!mark.run_model(&body).hidden);
    }

    #[test]
    fn test_cited_keys_skip_generated_region() {
        let body = body_of(&[
            "As shown in [B2] and [A1, C3].",
            "#bib GENERATED TEXT: DO NOT MODIFY",
            "[1] [Z9] Someone. Old entry, 2001. ",
            "#bib.END-OF-GENERATED-TEXT",
            "See [A1] again, and [not a key].",
        ]);
        assert_eq!(cited_keys(&body, "#bib"), vec!["A1", "B2", "C3"]);
    }

    #[test]
    fn test_longer_mark_is_not_a_match() {
        let mut body = body_of(&["#bibtexlist", "Text."]);
        assert_eq!(InsertionMark::prepare(&mut body, "#bib", false), None);
        assert_eq!(cited_keys(&body_of(&["#bibtexlist", "[A1]"]), "#bib"), vec!["A1"]);
    }

    #[test]
    fn test_cited_keys_after_unfilled_mark() {
        let body = body_of(&["Intro [A1].", "#bib", "Later [B2]."]);
        assert_eq!(cited_keys(&body, "#bib"), vec!["A1", "B2"]);
    }
}
