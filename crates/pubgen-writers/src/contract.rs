/*
 * contract.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The writer contract shared by every backend.

use crate::error::Result;
use crate::fragment::{Citable, Fragment};
use crate::options::{LineOptions, SectionOptions, TitleOptions};
use crate::state::SectionKind;
use crate::value::Value;
use std::path::Path;

/// One logical line handed to [`Writer::write_line`].
#[derive(Clone, Copy)]
pub enum Line<'a> {
    /// A row of values: table cells, or words of a text line.
    Values(&'a [Value]),
    /// A bibliography entry, rendered through its fragments.
    Citation(&'a dyn Citable),
}

/// A sink for structured sections.
///
/// Calls follow `open`, then any number of `open_section` ... `close_section`
/// blocks, then `close`. Out-of-order calls fail with
/// [`crate::WriterError::InvalidState`]. Content written into a section of
/// a kind the backend cannot render falls back to text, or is dropped with
/// a warning when text is not supported either.
pub trait Writer {
    /// The section kinds this backend renders natively.
    fn supported_kinds(&self) -> &[SectionKind];

    fn supports(&self, kind: SectionKind) -> bool {
        self.supported_kinds().contains(&kind)
    }

    /// Bind the writer to a target document and reset numbering.
    fn open(&mut self, target: &Path) -> Result<()>;

    fn open_section(
        &mut self,
        name: &str,
        kind: SectionKind,
        options: &SectionOptions,
    ) -> Result<()>;

    /// Write a title line. Table sections treat it as the header row.
    fn write_title(&mut self, title: &[Value], options: &TitleOptions) -> Result<()>;

    /// Write one line, starting a new line first.
    fn write_line(&mut self, line: Line<'_>, options: &LineOptions) -> Result<()>;

    /// Add a fragment to the current line.
    fn append(&mut self, fragment: &Fragment, options: &LineOptions) -> Result<()>;

    /// Terminate the current line and begin a new one.
    fn start_new_line(&mut self) -> Result<()>;

    fn close_section(&mut self) -> Result<()>;

    /// Flush and persist everything written since `open`.
    fn close(&mut self) -> Result<()>;

    fn write_values(&mut self, values: &[Value]) -> Result<()> {
        self.write_line(Line::Values(values), &LineOptions::default())
    }

    fn write_citation(&mut self, citable: &dyn Citable) -> Result<()> {
        self.write_line(Line::Citation(citable), &LineOptions::default())
    }

    fn write_heading(&mut self, text: &str, level: usize) -> Result<()> {
        self.write_title(&[Value::from(text)], &TitleOptions::level(level))
    }
}
