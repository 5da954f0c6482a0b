/*
 * text.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Delimited text output: `.txt` and `.csv`.

use crate::config::WriterConfig;
use crate::contract::{Line, Writer};
use crate::error::{Result, WriterError};
use crate::fragment::{Fragment, render_plain};
use crate::options::{LineOptions, SectionOptions, TitleOptions};
use crate::state::{Phase, SectionKind, SectionState};
use crate::target::OutputTarget;
use crate::value::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// File lifecycle shared by the text-based backends.
///
/// One file per section, or a single file for the whole target when
/// writing multi-section output.
pub(crate) struct TextOutput {
    pub(crate) target: OutputTarget,
    out: Option<BufWriter<File>>,
}

impl TextOutput {
    pub(crate) fn new(target: OutputTarget) -> Self {
        Self { target, out: None }
    }

    pub(crate) fn open(&mut self, path: &Path) -> Result<()> {
        self.target.open(path);
        if self.target.multi_sheet() {
            let filename = self.target.filename();
            self.create(&filename)?;
        }
        Ok(())
    }

    pub(crate) fn open_section(&mut self, name: &str) -> Result<()> {
        if !self.target.multi_sheet() {
            let filename = self.target.section_filename(name);
            self.create(&filename)?;
        }
        Ok(())
    }

    fn create(&mut self, filename: &Path) -> Result<()> {
        self.target.ensure_output_dir()?;
        tracing::debug!("Writing {}", filename.display());
        self.out = Some(BufWriter::new(File::create(filename)?));
        Ok(())
    }

    pub(crate) fn write_raw(&mut self, text: &str) -> Result<()> {
        let out = self.out.as_mut().ok_or(WriterError::InvalidState {
            operation: "write text",
            phase: Phase::Opened,
        })?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }

    pub(crate) fn close_section(&mut self) -> Result<()> {
        if !self.target.multi_sheet() {
            self.finish()?;
        }
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        self.finish()
    }
}

/// How a value is turned into a field.
pub type QuoteFn = fn(&Value, &str) -> String;

fn quote_plain(value: &Value, _separator: &str) -> String {
    value.to_string()
}

/// Quote fields containing the separator, a quote or a line break.
fn quote_csv(value: &Value, separator: &str) -> String {
    let text = value.to_string();
    if text.contains(separator) || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

/// Writes sections as separator-joined lines.
pub struct TextWriter {
    state: SectionState,
    output: TextOutput,
    separator: String,
    quote: QuoteFn,
}

impl TextWriter {
    pub fn new(
        config: &WriterConfig,
        supported: &[SectionKind],
        separator: &str,
        extension: &str,
        quote: QuoteFn,
    ) -> Self {
        Self {
            state: SectionState::new(config.numbered, supported),
            output: TextOutput::new(OutputTarget::new(config, extension).without_editing()),
            separator: config
                .separator
                .clone()
                .unwrap_or_else(|| separator.to_string()),
            quote,
        }
    }

    /// Space-separated `.txt` output for every section kind.
    pub fn plain(config: &WriterConfig) -> Self {
        Self::new(config, &SectionKind::ALL, " ", ".txt", quote_plain)
    }

    /// Semicolon-separated `.csv` tables.
    pub fn csv(config: &WriterConfig) -> Self {
        Self::new(config, &[SectionKind::Table], ";", ".csv", quote_csv)
    }

    fn join(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| (self.quote)(v, &self.separator))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    fn line_text(&self, line: Line<'_>) -> String {
        let kind = self.state.kind();
        match line {
            Line::Values(values) => {
                let text = self.join(values);
                match kind {
                    Some(SectionKind::List) => format!("- {}", text),
                    _ => text,
                }
            }
            Line::Citation(citable) => {
                let fragments = citable.fragments(self.state.citation());
                if kind == Some(SectionKind::Table) {
                    let cells: Vec<Value> = fragments
                        .iter()
                        .map(|f| Value::from(f.bare_text()))
                        .collect();
                    self.join(&cells)
                } else {
                    fragments
                        .iter()
                        .map(render_plain)
                        .collect::<String>()
                        .trim_end()
                        .to_string()
                }
            }
        }
    }

    fn prefix(&self) -> String {
        if self.state.kind() == Some(SectionKind::Table) {
            String::new()
        } else {
            self.state.line_prefix()
        }
    }
}

impl Writer for TextWriter {
    fn supported_kinds(&self) -> &[SectionKind] {
        self.state.supported_kinds()
    }

    fn open(&mut self, target: &Path) -> Result<()> {
        self.state.open(&crate::target::basename(target))?;
        self.output.open(target)
    }

    fn open_section(
        &mut self,
        name: &str,
        kind: SectionKind,
        options: &SectionOptions,
    ) -> Result<()> {
        if self.state.open_section(name, kind, options)?.is_some() {
            self.output.open_section(name)?;
        }
        Ok(())
    }

    fn write_title(&mut self, title: &[Value], _options: &TitleOptions) -> Result<()> {
        self.state.require_section("write a title")?;
        if self.state.kind().is_none() {
            return Ok(());
        }
        self.state.start_title();
        let text = self.join(title);
        self.output.write_raw(&format!("{}\n", text))?;
        self.state.finish_title();
        Ok(())
    }

    fn write_line(&mut self, line: Line<'_>, _options: &LineOptions) -> Result<()> {
        self.state.require_section("write a line")?;
        if self.state.kind().is_none() {
            return Ok(());
        }
        self.state.start_new_line();
        let text = format!("{}{}\n", self.prefix(), self.line_text(line));
        self.output.write_raw(&text)
    }

    fn append(&mut self, fragment: &Fragment, _options: &LineOptions) -> Result<()> {
        self.state.require_section("append")?;
        if self.state.kind().is_none() {
            return Ok(());
        }
        let text = render_plain(fragment);
        self.output.write_raw(&text)
    }

    fn start_new_line(&mut self) -> Result<()> {
        self.state.require_section("start a new line")?;
        if self.state.kind().is_none() {
            return Ok(());
        }
        self.state.start_new_line();
        let text = format!("\n{}", self.prefix());
        self.output.write_raw(&text)
    }

    fn close_section(&mut self) -> Result<()> {
        let written = self.state.kind().is_some();
        self.state.close_section()?;
        if written {
            self.output.close_section()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.close()?;
        self.output.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SectionOptions, values};

    #[test]
    fn test_csv_quoting() {
        assert_eq!(quote_csv(&Value::from("a;b"), ";"), "\"a;b\"");
        assert_eq!(quote_csv(&Value::from("say \"hi\""), ";"), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_csv(&Value::Int(3), ";"), "3");
    }

    #[test]
    fn test_multi_sheet_writes_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = WriterConfig::default()
            .with_output_dir(dir.path())
            .with_multi_sheet(true);
        let mut writer = TextWriter::plain(&config);
        writer.open(Path::new("doc.docx")).unwrap();
        for name in ["one", "two"] {
            writer
                .open_section(name, SectionKind::Text, &SectionOptions::numbered())
                .unwrap();
            writer.write_values(&values![name, "line"]).unwrap();
            writer.close_section().unwrap();
        }
        writer.close().unwrap();

        let text = std::fs::read_to_string(dir.path().join("doc.txt")).unwrap();
        assert_eq!(text, "[1] one line\n[2] two line\n");
        assert!(!dir.path().join("doc-one.txt").exists());
    }

    #[test]
    fn test_csv_skips_non_table_sections() {
        let dir = tempfile::tempdir().unwrap();
        let config = WriterConfig::default().with_output_dir(dir.path());
        let mut writer = TextWriter::csv(&config);
        writer.open(Path::new("doc")).unwrap();
        writer
            .open_section("notes", SectionKind::Text, &SectionOptions::default())
            .unwrap();
        writer.write_values(&values!["ignored"]).unwrap();
        writer.close_section().unwrap();
        writer.close().unwrap();
        assert!(!dir.path().join("doc-notes.csv").exists());
    }
}
