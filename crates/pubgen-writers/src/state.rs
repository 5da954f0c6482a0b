/*
 * state.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Lifecycle and line numbering shared by every backend.
//!
//! A writer moves through `closed -> opened -> section open -> opened ->
//! ... -> closed`. [`SectionState`] enforces those transitions and owns
//! the per-kind running line numbers, so backends only render.

use crate::error::{Result, WriterError};
use crate::fragment::CitationOptions;
use crate::options::SectionOptions;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The kind of content a section holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Text,
    Table,
    Bibliography,
    List,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Text,
        SectionKind::Table,
        SectionKind::Bibliography,
        SectionKind::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Text => "text",
            SectionKind::Table => "table",
            SectionKind::Bibliography => "bibliography",
            SectionKind::List => "list",
        }
    }

    /// Titles of these kinds do not consume a line number.
    pub fn titles_are_unnumbered(self) -> bool {
        matches!(self, SectionKind::Bibliography | SectionKind::List)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown section kind '{}'", s))
    }
}

/// Where a writer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Opened,
    SectionOpen,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Closed => f.write_str("closed"),
            Phase::Opened => f.write_str("open with no section"),
            Phase::SectionOpen => f.write_str("inside a section"),
        }
    }
}

/// Lifecycle state and running line numbers of one writer.
#[derive(Debug, Clone)]
pub struct SectionState {
    supported: Vec<SectionKind>,
    numbered_default: bool,
    /// `None` marks a kind whose lines are not numbered.
    counters: BTreeMap<SectionKind, Option<u32>>,
    phase: Phase,
    target: String,
    section: Option<String>,
    kind: Option<SectionKind>,
    citation: CitationOptions,
}

impl SectionState {
    pub fn new(numbered: bool, supported: &[SectionKind]) -> Self {
        Self {
            supported: supported.to_vec(),
            numbered_default: numbered,
            counters: BTreeMap::new(),
            phase: Phase::Closed,
            target: String::new(),
            section: None,
            kind: None,
            citation: CitationOptions::default(),
        }
    }

    pub fn supported_kinds(&self) -> &[SectionKind] {
        &self.supported
    }

    pub fn supports(&self, kind: SectionKind) -> bool {
        self.supported.contains(&kind)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Base name of the current target.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn section_name(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// The kind the current section is rendered as, `None` when skipped.
    pub fn kind(&self) -> Option<SectionKind> {
        self.kind
    }

    /// How entries of the current section are rendered.
    pub fn citation(&self) -> &CitationOptions {
        &self.citation
    }

    pub fn open(&mut self, target: &str) -> Result<()> {
        self.expect(Phase::Closed, "open a target")?;
        self.target = target.to_string();
        self.reset_line_numbers();
        self.phase = Phase::Opened;
        Ok(())
    }

    /// Enter a section, returning the kind it will be rendered as.
    ///
    /// An unsupported kind falls back to text; when text is unsupported
    /// too the section is skipped and `None` is returned.
    pub fn open_section(
        &mut self,
        name: &str,
        kind: SectionKind,
        options: &SectionOptions,
    ) -> Result<Option<SectionKind>> {
        self.expect(Phase::Opened, "open a section")?;
        self.phase = Phase::SectionOpen;
        self.section = Some(name.to_string());
        self.citation = options.citation.clone();

        let effective = if self.supports(kind) {
            Some(kind)
        } else if self.supports(SectionKind::Text) {
            tracing::warn!(
                "Section '{}': {} sections are not supported, writing it as text",
                name,
                kind
            );
            Some(SectionKind::Text)
        } else {
            tracing::warn!(
                "Section '{}': neither {} nor text sections are supported, skipping it",
                name,
                kind
            );
            None
        };
        self.kind = effective;

        if let Some(kind) = effective {
            let counter = self.counters.entry(kind).or_insert(None);
            if options.reset_count {
                *counter = Some(0);
            } else if !options.numbered {
                *counter = None;
            } else if counter.is_none() {
                *counter = Some(0);
            }
        }
        Ok(effective)
    }

    pub fn close_section(&mut self) -> Result<()> {
        self.expect(Phase::SectionOpen, "close a section")?;
        self.phase = Phase::Opened;
        self.section = None;
        self.kind = None;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        self.expect(Phase::Opened, "close the target")?;
        self.phase = Phase::Closed;
        Ok(())
    }

    /// Fail unless a section is open.
    pub fn require_section(&self, operation: &'static str) -> Result<()> {
        self.expect(Phase::SectionOpen, operation)
    }

    fn expect(&self, phase: Phase, operation: &'static str) -> Result<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(WriterError::InvalidState {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Restore every kind to its initial numbering.
    pub fn reset_line_numbers(&mut self) {
        let initial = self.numbered_default.then_some(0);
        self.counters = SectionKind::ALL
            .into_iter()
            .map(|kind| (kind, initial))
            .collect();
    }

    /// Set the running number of the current kind.
    pub fn set_line_number(&mut self, value: Option<u32>) {
        if let Some(kind) = self.kind {
            self.counters.insert(kind, value);
        }
    }

    pub fn current_line(&self) -> Option<u32> {
        self.kind
            .and_then(|kind| self.counters.get(&kind).copied().flatten())
    }

    pub fn is_numbered(&self) -> bool {
        self.current_line().is_some()
    }

    /// The `[n] ` prefix of the current line, empty when unnumbered.
    pub fn line_prefix(&self) -> String {
        match self.current_line() {
            Some(n) => format!("[{}] ", n),
            None => String::new(),
        }
    }

    /// Advance to the next line.
    pub fn start_new_line(&mut self) {
        if let Some(kind) = self.kind
            && let Some(Some(n)) = self.counters.get_mut(&kind)
        {
            *n += 1;
        }
    }

    fn rollback_line(&mut self) {
        if let Some(kind) = self.kind
            && let Some(Some(n)) = self.counters.get_mut(&kind)
        {
            *n = n.saturating_sub(1);
        }
    }

    /// Account for a title line. Titles advance the number like any line.
    pub fn start_title(&mut self) {
        self.start_new_line();
    }

    /// Finish a title line, giving its number back for kinds whose titles
    /// are not counted.
    pub fn finish_title(&mut self) {
        if self.kind.is_some_and(SectionKind::titles_are_unnumbered) {
            self.rollback_line();
        }
    }
}
