/*
 * record.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Bibliography entries and their derived views.

use pubgen_writers::{Citable, CitationOptions, Fragment, KeyStyle};
use std::collections::BTreeMap;
use std::fmt;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const TERSE_MONTHS: [&str; 12] = [
    "Jan.", "Feb.", "Mar.", "Apr.", "May", "Jun.", "Jul.", "Aug.", "Sep.", "Oct.", "Nov.", "Dec.",
];

/// The `@kind` of an entry, which decides how its venue is composed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Article,
    InProceedings,
    InBook,
    InCollection,
    Book,
    PhdThesis,
    MastersThesis,
    TechReport,
    Misc,
    Other(String),
}

impl EntryKind {
    /// Map a (case-insensitive) BibTeX entry type to a kind.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "article" => EntryKind::Article,
            "inproceedings" | "conference" => EntryKind::InProceedings,
            "inbook" => EntryKind::InBook,
            "incollection" => EntryKind::InCollection,
            "book" => EntryKind::Book,
            "phdthesis" => EntryKind::PhdThesis,
            "masterthesis" | "mastersthesis" => EntryKind::MastersThesis,
            "techreport" => EntryKind::TechReport,
            "misc" => EntryKind::Misc,
            _ => EntryKind::Other(name),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntryKind::Article => "article",
            EntryKind::InProceedings => "inproceedings",
            EntryKind::InBook => "inbook",
            EntryKind::InCollection => "incollection",
            EntryKind::Book => "book",
            EntryKind::PhdThesis => "phdthesis",
            EntryKind::MastersThesis => "mastersthesis",
            EntryKind::TechReport => "techreport",
            EntryKind::Misc => "misc",
            EntryKind::Other(name) => name,
        }
    }

    pub fn is_journal(&self) -> bool {
        *self == EntryKind::Article
    }

    /// Reports and other material published outside the usual venues.
    pub fn is_outreach(&self) -> bool {
        *self == EntryKind::TechReport
    }

    pub fn is_conference(&self) -> bool {
        *self == EntryKind::InProceedings
    }

    pub fn is_book_chapter(&self) -> bool {
        matches!(self, EntryKind::InBook | EntryKind::InCollection)
    }

    pub fn is_book(&self) -> bool {
        *self == EntryKind::Book
    }

    pub fn is_thesis(&self) -> bool {
        matches!(self, EntryKind::PhdThesis | EntryKind::MastersThesis)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a month (1-12), with a trailing space; empty for anything else.
pub fn month_name(month: u32, terse: bool) -> String {
    let names = if terse { &TERSE_MONTHS } else { &MONTHS };
    match month {
        1..=12 => format!("{} ", names[month as usize - 1]),
        _ => String::new(),
    }
}

/// Parse a month given as a number or an English name or abbreviation.
fn parse_month(text: &str) -> u32 {
    let text = text.trim();
    if let Ok(n) = text.parse::<u32>() {
        return if (1..=12).contains(&n) { n } else { 0 };
    }
    let prefix: String = text.chars().take(3).collect::<String>().to_lowercase();
    MONTHS
        .iter()
        .position(|name| name[..3].to_lowercase() == prefix)
        .map_or(0, |index| index as u32 + 1)
}

/// `"Surname, Given"` becomes `"Given Surname"`; other forms are kept.
fn reorder_name(author: &str) -> String {
    let mut parts = author.split(',');
    match (parts.next(), parts.next()) {
        (Some(surname), Some(given)) if !given.trim().is_empty() => {
            format!("{} {}", given.trim(), surname.trim())
        }
        _ => author.trim().to_string(),
    }
}

/// Initials for every name but the last: `"Jean-Marc Jezequel"` becomes
/// `"J.-M. Jezequel"`.
fn abbreviate_name(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let Some((surname, given)) = words.split_last() else {
        return String::new();
    };
    let mut out: Vec<String> = given
        .iter()
        .map(|word| {
            word.split('-')
                .filter_map(|part| part.chars().next())
                .map(|c| format!("{}.", c.to_uppercase()))
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect();
    out.push(surname.to_string());
    out.join(" ")
}

/// One bibliography entry: a key, a kind and its raw fields.
#[derive(Debug, Clone, PartialEq)]
pub struct BibEntry {
    key: String,
    kind: EntryKind,
    fields: BTreeMap<String, String>,
}

impl BibEntry {
    pub fn new(kind: EntryKind, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            fields: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// Append `value` to the field, creating it if needed.
    ///
    /// Field names are case-insensitive. Wrapped values arrive in several
    /// pieces, so repeated additions concatenate.
    pub fn add_field(&mut self, name: &str, value: &str) {
        self.fields
            .entry(name.to_lowercase())
            .or_default()
            .push_str(value);
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn text(&self, name: &str) -> &str {
        self.field(name).unwrap_or_default()
    }

    /// The first of `names` holding a non-empty value.
    fn first_of(&self, names: &[&str]) -> &str {
        names
            .iter()
            .map(|name| self.text(name))
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The year as written, empty when absent.
    pub fn year(&self) -> &str {
        self.text("year")
    }

    pub fn numeric_year(&self) -> Option<i32> {
        self.year().parse().ok()
    }

    /// The month (1-12), 0 when absent or unreadable.
    pub fn month(&self) -> u32 {
        self.field("month").map_or(0, parse_month)
    }

    pub fn authors(&self) -> &str {
        self.text("author")
    }

    pub fn title(&self) -> &str {
        self.text("title")
    }

    /// The publisher, or the organization when there is none.
    pub fn publisher(&self) -> &str {
        self.first_of(&["publisher", "organization"])
    }

    /// The page range with doubled dashes and en-dashes made single.
    pub fn pages(&self) -> Option<String> {
        self.field("pages")
            .filter(|p| !p.trim().is_empty())
            .map(|p| p.trim().replace("--", "-").replace('\u{2013}', "-"))
    }

    /// Where the entry can be read online.
    pub fn link(&self) -> Option<String> {
        if let Some(url) = self.field("url").filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }
        self.field("doi")
            .filter(|d| !d.is_empty())
            .map(|doi| format!("https://doi.org/{}", doi))
    }

    /// Where the entry was published, composed according to its kind.
    pub fn venue(&self) -> String {
        if self.kind.is_journal() || self.kind.is_outreach() {
            let journal = if self.kind.is_outreach() {
                self.first_of(&["journal", "institution"])
            } else {
                self.text("journal")
            };
            let mut volume = self.text("volume").to_string();
            let number = self.first_of(&["number", "issue"]);
            if !number.is_empty() {
                volume.push_str(&format!("({})", number));
            }
            return if volume.is_empty() {
                journal.to_string()
            } else {
                format!("{}, {}", journal, volume)
            };
        }
        let booktitle = self.text("booktitle");
        if booktitle.is_empty() {
            String::new()
        } else if self.kind.is_conference() {
            booktitle.to_string()
        } else if self.kind.is_book_chapter() {
            format!("In {}", booktitle)
        } else {
            String::new()
        }
    }

    /// The author list, ending with a period and a space.
    ///
    /// Terse lists use initials and stop after `max_terse` names with
    /// "et al". Full lists separate the last name with "and".
    pub fn formatted_authors(&self, terse: bool, max_terse: usize) -> String {
        let raw = self.authors().split_whitespace().collect::<Vec<_>>().join(" ");
        if raw.is_empty() {
            return String::new();
        }
        let authors: Vec<String> = raw.split(" and ").map(reorder_name).collect();
        let count = authors.len();

        if terse {
            let shown = count.min(max_terse.max(1));
            let mut result = authors[..shown]
                .iter()
                .map(|a| abbreviate_name(a))
                .collect::<Vec<_>>()
                .join(", ");
            if shown < count {
                result.push_str(" et al");
            }
            return format!("{}. ", result);
        }

        let mut result = authors[0].clone();
        for (n, author) in authors.iter().enumerate().skip(1) {
            result.push_str(if n < count - 1 { ", " } else { " and " });
            result.push_str(author);
        }
        format!("{}. ", result)
    }

    /// The text shown in brackets for this entry.
    fn citation_label<'a>(&'a self, style: &'a KeyStyle) -> &'a str {
        match style {
            KeyStyle::Key => &self.key,
            KeyStyle::Field(name) => self
                .field(name)
                .filter(|value| !value.is_empty())
                .unwrap_or(&self.key),
        }
    }
}

impl Citable for BibEntry {
    fn citation_key(&self) -> &str {
        &self.key
    }

    fn fragments(&self, options: &CitationOptions) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        if let Some(style) = &options.key_style {
            fragments.push(Fragment::key(self.citation_label(style)).with_href(self.link()));
        }

        let authors = self.formatted_authors(options.terse, options.max_terse_authors);
        if !authors.is_empty() {
            fragments.push(Fragment::authors(authors));
        }
        if !self.title().is_empty() {
            fragments.push(Fragment::title(self.title()));
        }

        let mut venue = self.venue();
        if !venue.is_empty() {
            if let Some(pages) = self.pages() {
                venue.push_str(&format!(", pages {}", pages));
            }
            fragments.push(Fragment::venue(format!("{}, ", venue)));
        }
        let publisher = self.publisher();
        if !publisher.is_empty() {
            fragments.push(Fragment::plain(format!("{}, ", publisher)));
        }

        let month = if options.show_month {
            month_name(self.month(), options.terse)
        } else {
            String::new()
        };
        if !month.is_empty() || !self.year().is_empty() {
            fragments.push(Fragment::plain(format!("{}{}. ", month, self.year())));
        }
        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubgen_writers::{FragmentTag, render_entry};

    fn article() -> BibEntry {
        let mut entry = BibEntry::new(EntryKind::Article, "J20");
        entry.add_field("author", "Jezequel, J-M");
        entry.add_field("title", "Testing Publication Generator");
        entry.add_field("journal", "IXXX");
        entry.add_field("year", "2020");
        entry
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EntryKind::from_name("ARTICLE"), EntryKind::Article);
        assert_eq!(EntryKind::from_name("conference"), EntryKind::InProceedings);
        assert_eq!(EntryKind::from_name("masterthesis"), EntryKind::MastersThesis);
        assert_eq!(EntryKind::from_name("unpublished").as_str(), "unpublished");
        assert!(EntryKind::InCollection.is_book_chapter());
        assert!(EntryKind::PhdThesis.is_thesis());
    }

    #[test]
    fn test_fields_concatenate() {
        let mut entry = BibEntry::new(EntryKind::Misc, "k");
        entry.add_field("Title", "A long");
        entry.add_field("title", " title");
        assert_eq!(entry.title(), "A long title");
        assert_eq!(entry.year(), "");
        assert_eq!(entry.month(), 0);
    }

    #[test]
    fn test_plain_rendering_without_key() {
        let options = CitationOptions {
            key_style: None,
            ..CitationOptions::default()
        };
        let text = render_entry(&article(), &options);
        assert_eq!(
            text, "J-M Jezequel. Testing Publication Generator, IXXX, 2020. ",
            "Got: {}",
            text
        );
    }

    #[test]
    fn test_key_fragment_and_style() {
        let mut entry = article();
        entry.add_field("doi", "10.1000/xyz");
        let fragments = entry.fragments(&CitationOptions::default());
        assert_eq!(fragments[0].tag, FragmentTag::Key);
        assert_eq!(fragments[0].text, "J20");
        assert_eq!(fragments[0].href.as_deref(), Some("https://doi.org/10.1000/xyz"));

        let options = CitationOptions {
            key_style: Some(KeyStyle::Field("doi".to_string())),
            ..CitationOptions::default()
        };
        assert_eq!(entry.fragments(&options)[0].text, "10.1000/xyz");
        let options = CitationOptions {
            key_style: Some(KeyStyle::Field("hal".to_string())),
            ..CitationOptions::default()
        };
        assert_eq!(entry.fragments(&options)[0].text, "J20");
    }

    #[test]
    fn test_full_author_list() {
        let mut entry = BibEntry::new(EntryKind::Article, "k");
        entry.add_field("author", "Doe, John and Jane Roe and Smith,   Ann");
        assert_eq!(
            entry.formatted_authors(false, 6),
            "John Doe, Jane Roe and Ann Smith. "
        );
    }

    #[test]
    fn test_terse_author_list() {
        let mut entry = BibEntry::new(EntryKind::Article, "k");
        entry.add_field(
            "author",
            "Jezequel, Jean-Marc and Benoit Combemale and Barais, Olivier",
        );
        assert_eq!(
            entry.formatted_authors(true, 2),
            "J.-M. Jezequel, B. Combemale et al. "
        );
        assert_eq!(
            entry.formatted_authors(true, 6),
            "J.-M. Jezequel, B. Combemale, O. Barais. "
        );
    }

    #[test]
    fn test_venue_by_kind() {
        let mut journal = BibEntry::new(EntryKind::Article, "a");
        journal.add_field("journal", "SoSyM");
        journal.add_field("volume", "12");
        journal.add_field("issue", "3");
        assert_eq!(journal.venue(), "SoSyM, 12(3)");

        let mut conference = BibEntry::new(EntryKind::InProceedings, "c");
        conference.add_field("booktitle", "MODELS");
        assert_eq!(conference.venue(), "MODELS");

        let mut chapter = BibEntry::new(EntryKind::InBook, "b");
        chapter.add_field("booktitle", "Handbook");
        assert_eq!(chapter.venue(), "In Handbook");

        let mut thesis = BibEntry::new(EntryKind::PhdThesis, "t");
        thesis.add_field("booktitle", "ignored");
        assert_eq!(thesis.venue(), "");

        let mut report = BibEntry::new(EntryKind::TechReport, "r");
        report.add_field("institution", "Inria");
        report.add_field("number", "RR-42");
        assert_eq!(report.venue(), "Inria, (RR-42)");
    }

    #[test]
    fn test_pages_publisher_and_month() {
        let mut entry = BibEntry::new(EntryKind::InProceedings, "c");
        entry.add_field("author", "Ann Smith");
        entry.add_field("title", "Models");
        entry.add_field("booktitle", "MODELS");
        entry.add_field("pages", "10--20");
        entry.add_field("organization", "ACM");
        entry.add_field("year", "2019");
        entry.add_field("month", "sep");

        let options = CitationOptions {
            key_style: None,
            show_month: true,
            ..CitationOptions::default()
        };
        assert_eq!(
            render_entry(&entry, &options),
            "Ann Smith. Models, MODELS, pages 10-20, ACM, September 2019. "
        );
        let terse = CitationOptions {
            terse: true,
            ..options
        };
        assert!(render_entry(&entry, &terse).ends_with("Sep. 2019. "));
    }

    #[test]
    fn test_month_parsing() {
        assert_eq!(parse_month("3"), 3);
        assert_eq!(parse_month("December"), 12);
        assert_eq!(parse_month("13"), 0);
        assert_eq!(parse_month("spring"), 0);
        assert_eq!(month_name(2, false), "February ");
        assert_eq!(month_name(0, true), "");
    }
}
