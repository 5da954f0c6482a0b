/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Line-oriented BibTeX scanner.
//!
//! An entry starts on a line beginning with `@kind{key`. The lines that
//! follow hold `name = value` assignments, several per line if separated by
//! commas, until the next `@` line. A line without an assignment continues
//! the previous field. Lines starting with `%` are comments.

use crate::bibliography::Bibliography;
use crate::error::{ParseError, Result};
use crate::record::{BibEntry, EntryKind};
use std::path::Path;

/// Entry types whose content is not a reference.
const IGNORED_KINDS: [&str; 3] = ["comment", "preamble", "string"];

/// Strip BibTeX grouping and escapes from a field value.
pub fn clean_bib_entry(text: &str) -> String {
    let cleaned = text
        .replace('\\', "")
        .replace('{', "")
        .replace("},", "")
        .replace('}', "");
    let cleaned = cleaned.trim().trim_end_matches(',').trim_end();
    match cleaned.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.trim().to_string(),
        None => cleaned.to_string(),
    }
}

/// Strip quotes, braces and commas from a year.
pub fn clean_year_entry(text: &str) -> String {
    text.replace(['"', '{', ',', '}'], "").trim().to_string()
}

fn clean_value(field: &str, value: &str) -> String {
    if field == "year" {
        clean_year_entry(value)
    } else {
        clean_bib_entry(value)
    }
}

/// Brace and quote nesting, carried across lines so that a wrapped value
/// is not split at its inner commas.
#[derive(Debug, Default, Clone, Copy)]
struct Nesting {
    depth: u32,
    quoted: bool,
}

impl Nesting {
    fn is_top_level(self) -> bool {
        self.depth == 0 && !self.quoted
    }

    fn advance(&mut self, c: char) {
        match c {
            '{' => self.depth += 1,
            '}' => self.depth = self.depth.saturating_sub(1),
            '"' if self.depth == 0 => self.quoted = !self.quoted,
            _ => {}
        }
    }
}

/// One comma-separated piece of a line.
struct Segment<'a> {
    text: &'a str,
    /// Started inside a value opened on an earlier line.
    continued: bool,
}

/// Split at top-level commas, updating `nesting` as the line is consumed.
fn segments<'a>(line: &'a str, nesting: &mut Nesting) -> Vec<Segment<'a>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut continued = !nesting.is_top_level();
    for (index, c) in line.char_indices() {
        if c == ',' && nesting.is_top_level() {
            out.push(Segment {
                text: &line[start..index],
                continued,
            });
            start = index + 1;
            continued = false;
        } else {
            nesting.advance(c);
        }
    }
    out.push(Segment {
        text: &line[start..],
        continued,
    });
    out
}

/// Position of the first `=` outside any braces or quotes.
fn assignment(segment: &str) -> Option<usize> {
    let mut nesting = Nesting::default();
    for (index, c) in segment.char_indices() {
        if c == '=' && nesting.is_top_level() {
            return Some(index);
        }
        nesting.advance(c);
    }
    None
}

#[derive(Debug)]
enum State {
    Idle,
    /// Inside `@comment`, `@preamble` or `@string`.
    Ignoring,
    Entry {
        entry: BibEntry,
        field: Option<String>,
    },
}

struct Scanner<'a> {
    file: &'a Path,
    state: State,
    nesting: Nesting,
    entries: Bibliography,
}

impl<'a> Scanner<'a> {
    fn new(file: &'a Path) -> Self {
        Self {
            file,
            state: State::Idle,
            nesting: Nesting::default(),
            entries: Bibliography::new(),
        }
    }

    fn error(&self, line: usize, content: &str, reason: &str) -> ParseError {
        ParseError::syntax(self.file, line, content, reason)
    }

    fn flush(&mut self) {
        if let State::Entry { entry, .. } = std::mem::replace(&mut self.state, State::Idle) {
            if self.entries.contains(entry.key()) {
                tracing::warn!(
                    "Duplicate entry '{}' in {}, keeping the last one",
                    entry.key(),
                    self.file.display()
                );
            }
            self.entries.insert(entry);
        }
    }

    fn scan_line(&mut self, number: usize, line: &str) -> Result<()> {
        if line.is_empty() || line.starts_with('%') {
            return Ok(());
        }
        if let Some(header) = line.strip_prefix('@') {
            return self.start_entry(number, line, header);
        }
        match self.state {
            State::Ignoring => Ok(()),
            State::Idle => Err(self.error(number, line, "text outside of an entry")),
            State::Entry { .. } => self.scan_fields(number, line, line),
        }
    }

    fn start_entry(&mut self, number: usize, line: &str, header: &str) -> Result<()> {
        self.flush();
        self.nesting = Nesting::default();
        let Some(open) = header.find('{') else {
            return Err(self.error(number, line, "missing '{' after the entry type"));
        };
        let kind = header[..open].trim().to_lowercase();
        if IGNORED_KINDS.contains(&kind.as_str()) {
            self.state = State::Ignoring;
            return Ok(());
        }

        let rest = &header[open + 1..];
        let (key, fields) = match rest.find(',') {
            Some(comma) => (&rest[..comma], &rest[comma + 1..]),
            None => (rest.trim_end().trim_end_matches('}'), ""),
        };
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(self.error(number, line, "missing citation key"));
        }
        tracing::debug!("Entry '{}' ({}) at line {}", key, kind, number);
        self.state = State::Entry {
            entry: BibEntry::new(EntryKind::from_name(&kind), key),
            field: None,
        };
        self.scan_fields(number, line, fields)
    }

    fn scan_fields(&mut self, number: usize, line: &str, text: &str) -> Result<()> {
        for segment in segments(text, &mut self.nesting) {
            let piece = segment.text.trim();
            if piece.is_empty() {
                continue;
            }
            let split = if segment.continued {
                None
            } else {
                assignment(piece)
            };
            let State::Entry { entry, field } = &mut self.state else {
                return Ok(());
            };
            match split {
                Some(eq) => {
                    let name = piece[..eq].trim().to_lowercase();
                    if name.is_empty() {
                        return Err(self.error(number, line, "missing field name before '='"));
                    }
                    entry.add_field(&name, &clean_value(&name, &piece[eq + 1..]));
                    *field = Some(name);
                }
                None => {
                    let more = clean_bib_entry(piece);
                    if more.is_empty() {
                        continue;
                    }
                    match field.as_deref() {
                        Some("year") => entry.add_field("year", &clean_year_entry(piece)),
                        Some(name) => entry.add_field(name, &format!(" {}", more)),
                        None => {
                            return Err(self.error(
                                number,
                                line,
                                "missing '=' and no field to continue",
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Bibliography {
        self.flush();
        self.entries
    }
}

/// Scan BibTeX source text. `file` only names the source in errors.
pub fn parse_str(source: &str, file: &Path) -> Result<Bibliography> {
    let mut scanner = Scanner::new(file);
    for (index, line) in source.lines().enumerate() {
        scanner.scan_line(index + 1, line.trim())?;
    }
    let entries = scanner.finish();
    tracing::debug!("Read {} entries from {}", entries.len(), file.display());
    Ok(entries)
}

/// Read and scan a BibTeX file.
pub fn parse_file(path: &Path) -> Result<Bibliography> {
    let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    parse_str(&source, path)
}
