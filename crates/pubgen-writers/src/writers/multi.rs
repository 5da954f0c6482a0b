/*
 * multi.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Fan one stream of calls out to several writers.

use crate::contract::{Line, Writer};
use crate::error::Result;
use crate::fragment::Fragment;
use crate::options::{LineOptions, SectionOptions, TitleOptions};
use crate::state::SectionKind;
use crate::value::Value;
use std::path::Path;

/// Forwards every call to each inner writer in order.
///
/// Each inner writer applies its own kind fallback, so a section can be a
/// table in one output and text in another.
#[derive(Default)]
pub struct MultiWriter {
    writers: Vec<Box<dyn Writer>>,
    supported: Vec<SectionKind>,
}

impl MultiWriter {
    pub fn new(writers: Vec<Box<dyn Writer>>) -> Self {
        let mut multi = Self::default();
        for writer in writers {
            multi.add(writer);
        }
        multi
    }

    pub fn add(&mut self, writer: Box<dyn Writer>) {
        for kind in writer.supported_kinds() {
            if !self.supported.contains(kind) {
                self.supported.push(*kind);
            }
        }
        self.supported.sort();
        self.writers.push(writer);
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    fn each(&mut self, mut f: impl FnMut(&mut dyn Writer) -> Result<()>) -> Result<()> {
        for writer in &mut self.writers {
            f(writer.as_mut())?;
        }
        Ok(())
    }
}

impl Writer for MultiWriter {
    fn supported_kinds(&self) -> &[SectionKind] {
        &self.supported
    }

    fn open(&mut self, target: &Path) -> Result<()> {
        self.each(|w| w.open(target))
    }

    fn open_section(
        &mut self,
        name: &str,
        kind: SectionKind,
        options: &SectionOptions,
    ) -> Result<()> {
        self.each(|w| w.open_section(name, kind, options))
    }

    fn write_title(&mut self, title: &[Value], options: &TitleOptions) -> Result<()> {
        self.each(|w| w.write_title(title, options))
    }

    fn write_line(&mut self, line: Line<'_>, options: &LineOptions) -> Result<()> {
        self.each(|w| w.write_line(line, options))
    }

    fn append(&mut self, fragment: &Fragment, options: &LineOptions) -> Result<()> {
        self.each(|w| w.append(fragment, options))
    }

    fn start_new_line(&mut self) -> Result<()> {
        self.each(|w| w.start_new_line())
    }

    fn close_section(&mut self) -> Result<()> {
        self.each(|w| w.close_section())
    }

    fn close(&mut self) -> Result<()> {
        self.each(|w| w.close())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;
    use crate::writers::skip::SkipWriter;
    use crate::writers::text::TextWriter;
    use crate::WriterConfig;

    #[test]
    fn test_supported_kinds_are_the_union() {
        let config = WriterConfig::default();
        let multi = MultiWriter::new(vec![
            Box::new(TextWriter::csv(&config)),
            Box::new(SkipWriter::new()),
        ]);
        assert_eq!(multi.len(), 2);
        assert_eq!(multi.supported_kinds(), &SectionKind::ALL);
    }

    #[test]
    fn test_calls_are_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let config = WriterConfig::default().with_output_dir(dir.path());
        let mut multi = MultiWriter::new(vec![
            Box::new(TextWriter::csv(&config)),
            Box::new(TextWriter::plain(&config)),
        ]);
        multi.open(Path::new("out")).unwrap();
        multi
            .open_section("T", SectionKind::Table, &SectionOptions::default())
            .unwrap();
        multi.write_values(&values!["a", 1]).unwrap();
        multi.close_section().unwrap();
        multi.close().unwrap();

        let csv = std::fs::read_to_string(dir.path().join("out-T.csv")).unwrap();
        let txt = std::fs::read_to_string(dir.path().join("out-T.txt")).unwrap();
        assert_eq!(csv, "a;1\n");
        assert_eq!(txt, "a 1\n");
    }
}
