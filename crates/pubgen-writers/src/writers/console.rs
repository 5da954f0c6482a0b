/*
 * console.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Plain rendering to a stream, stdout by default.

use crate::contract::{Line, Writer};
use crate::error::Result;
use crate::fragment::{Fragment, render_plain};
use crate::options::{LineOptions, SectionOptions, TitleOptions};
use crate::state::{SectionKind, SectionState};
use crate::target::basename;
use crate::value::{Value, join_values};
use std::io::{self, Write};
use std::path::Path;

pub struct ConsoleWriter<W: Write = io::Stdout> {
    state: SectionState,
    sink: W,
}

impl ConsoleWriter {
    pub fn stdout(numbered: bool) -> Self {
        Self::with_sink(numbered, io::stdout())
    }
}

impl<W: Write> ConsoleWriter<W> {
    pub fn with_sink(numbered: bool, sink: W) -> Self {
        Self {
            state: SectionState::new(numbered, &SectionKind::ALL),
            sink,
        }
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    fn separator(&self) -> &'static str {
        if self.state.kind() == Some(SectionKind::Table) {
            "\t"
        } else {
            " "
        }
    }

    fn line_text(&self, line: Line<'_>) -> String {
        match line {
            Line::Values(values) => join_values(values, self.separator()),
            Line::Citation(citable) => citable
                .fragments(self.state.citation())
                .iter()
                .map(render_plain)
                .collect::<String>()
                .trim_end()
                .to_string(),
        }
    }
}

impl<W: Write> Writer for ConsoleWriter<W> {
    fn supported_kinds(&self) -> &[SectionKind] {
        self.state.supported_kinds()
    }

    fn open(&mut self, target: &Path) -> Result<()> {
        self.state.open(&basename(target))
    }

    fn open_section(
        &mut self,
        name: &str,
        kind: SectionKind,
        options: &SectionOptions,
    ) -> Result<()> {
        self.state.open_section(name, kind, options)?;
        Ok(())
    }

    fn write_title(&mut self, title: &[Value], _options: &TitleOptions) -> Result<()> {
        self.state.require_section("write a title")?;
        self.state.start_title();
        let text = join_values(title, self.separator());
        writeln!(self.sink, "{}", text)?;
        self.state.finish_title();
        Ok(())
    }

    fn write_line(&mut self, line: Line<'_>, _options: &LineOptions) -> Result<()> {
        self.state.require_section("write a line")?;
        self.state.start_new_line();
        let text = self.line_text(line);
        writeln!(self.sink, "{}{}", self.state.line_prefix(), text)?;
        Ok(())
    }

    fn append(&mut self, fragment: &Fragment, _options: &LineOptions) -> Result<()> {
        self.state.require_section("append")?;
        write!(self.sink, "{}", render_plain(fragment))?;
        Ok(())
    }

    fn start_new_line(&mut self) -> Result<()> {
        self.state.require_section("start a new line")?;
        self.state.start_new_line();
        write!(self.sink, "\n{}", self.state.line_prefix())?;
        Ok(())
    }

    fn close_section(&mut self) -> Result<()> {
        self.state.close_section()?;
        self.sink.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.close()?;
        self.sink.flush()?;
        Ok(())
    }
}
