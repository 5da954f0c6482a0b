/*
 * skip.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! A writer that accepts everything and writes nothing.

use crate::contract::{Line, Writer};
use crate::error::Result;
use crate::fragment::Fragment;
use crate::options::{LineOptions, SectionOptions, TitleOptions};
use crate::state::{SectionKind, SectionState};
use crate::value::Value;
use std::path::Path;

/// Still enforces the lifecycle, so misuse is caught even when nothing is
/// written.
pub struct SkipWriter {
    state: SectionState,
}

impl SkipWriter {
    pub fn new() -> Self {
        Self {
            state: SectionState::new(false, &SectionKind::ALL),
        }
    }
}

impl Default for SkipWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for SkipWriter {
    fn supported_kinds(&self) -> &[SectionKind] {
        self.state.supported_kinds()
    }

    fn open(&mut self, target: &Path) -> Result<()> {
        self.state.open(&crate::target::basename(target))
    }

    fn open_section(
        &mut self,
        name: &str,
        kind: SectionKind,
        options: &SectionOptions,
    ) -> Result<()> {
        self.state.open_section(name, kind, options).map(|_| ())
    }

    fn write_title(&mut self, _title: &[Value], _options: &TitleOptions) -> Result<()> {
        self.state.require_section("write a title")
    }

    fn write_line(&mut self, _line: Line<'_>, _options: &LineOptions) -> Result<()> {
        self.state.require_section("write a line")
    }

    fn append(&mut self, _fragment: &Fragment, _options: &LineOptions) -> Result<()> {
        self.state.require_section("append")
    }

    fn start_new_line(&mut self) -> Result<()> {
        self.state.require_section("start a new line")
    }

    fn close_section(&mut self) -> Result<()> {
        self.state.close_section()
    }

    fn close(&mut self) -> Result<()> {
        self.state.close()
    }
}
