/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Word-processing output.
//!
//! Fresh documents receive a level 3 heading per section followed by its
//! content. In edit mode the section name designates a region of an
//! existing document: text-like sections are regenerated between the
//! sentinels of an [`InsertionMark`], and table sections replace the table
//! whose first cell starts with the section name, borrowing its layout.

pub mod document;
pub mod mark;

use self::document::{
    WordDocument, append_to_body, element_mut, find_table, insert_at, remove_at,
};
use self::mark::{InsertionMark, cited_keys};
use crate::config::WriterConfig;
use crate::contract::{Line, Writer};
use crate::error::{Result, WriterError};
use crate::fragment::{CitationOptions, Fragment, FragmentTag};
use crate::ooxml::wordml::{
    RunProps, cell_paragraph_style, cell_width, new_hyperlink, new_paragraph, new_run,
    set_alignment, set_paragraph_style, table_cell, text_paragraph,
};
use crate::options::{LineOptions, SectionOptions, TitleOptions};
use crate::state::{SectionKind, SectionState};
use crate::target::{OutputTarget, basename};
use crate::value::{Value, join_values};
use pubgen_xml::{XmlChild, XmlElement};
use std::path::Path;

const SECTION_HEADING: &str = "Heading3";
const TABLE_WIDTH: usize = 9000;

fn heading_style(level: usize) -> String {
    match level {
        0 => "Title".to_string(),
        n => format!("Heading{}", n.min(9)),
    }
}

fn document(slot: &mut Option<WordDocument>) -> Result<&mut WordDocument> {
    if slot.is_none() {
        *slot = Some(WordDocument::fresh()?);
    }
    slot.as_mut()
        .ok_or_else(|| WriterError::InvalidDocument("no document".to_string()))
}

fn styled(model: &RunProps, options: &LineOptions) -> RunProps {
    RunProps {
        bold: model.bold || options.bold,
        italic: model.italic || options.italic,
        ..model.clone()
    }
}

/// Text, list and bibliography sections: one paragraph per line.
#[derive(Debug)]
struct Flow {
    kind: SectionKind,
    mark: Option<InsertionMark>,
    current: Option<usize>,
    style: Option<String>,
    model: RunProps,
}

impl Flow {
    fn new(kind: SectionKind, mark: Option<InsertionMark>, doc: &WordDocument) -> Result<Self> {
        let (style, model) = match &mark {
            Some(mark) => {
                let body = doc.body()?;
                (mark.style(body), mark.run_model(body))
            }
            None => (None, RunProps::default()),
        };
        Ok(Self {
            kind,
            mark,
            current: None,
            style,
            model,
        })
    }

    fn place(&mut self, doc: &mut WordDocument, paragraph: XmlElement) -> Result<()> {
        let body = doc.body_mut()?;
        let index = match &mut self.mark {
            Some(mark) => mark.insert_before_end(body, paragraph),
            None => append_to_body(body, paragraph),
        };
        self.current = Some(index);
        Ok(())
    }

    fn start_paragraph(&mut self, doc: &mut WordDocument) -> Result<()> {
        let paragraph = new_paragraph(self.style.as_deref());
        self.place(doc, paragraph)
    }

    fn push_run(
        &mut self,
        doc: &mut WordDocument,
        text: &str,
        props: &RunProps,
        href: Option<&str>,
    ) -> Result<()> {
        let run = match href {
            Some(url) => {
                let id = doc.add_hyperlink(url);
                new_hyperlink(&id, text, props)
            }
            None => new_run(text, props),
        };
        if self.current.is_none() {
            self.start_paragraph(doc)?;
        }
        let body = doc.body_mut()?;
        if let Some(p) = self.current.and_then(|index| element_mut(body, index)) {
            p.push_element(run);
        }
        Ok(())
    }

    fn write_title(
        &mut self,
        doc: &mut WordDocument,
        text: &str,
        options: &TitleOptions,
        edit: bool,
    ) -> Result<()> {
        if edit {
            // Headings cannot go inside a region, use a bold line instead
            self.start_paragraph(doc)?;
            let mut props = styled(&self.model, &options.style);
            props.bold = true;
            self.push_run(doc, text, &props, options.style.href.as_deref())
        } else {
            let heading = text_paragraph(
                text,
                Some(&heading_style(options.level)),
                &styled(&self.model, &options.style),
            );
            self.place(doc, heading)
        }
    }

    fn write_line(
        &mut self,
        doc: &mut WordDocument,
        line: Line<'_>,
        prefix: Option<&str>,
        citation: &CitationOptions,
        options: &LineOptions,
    ) -> Result<()> {
        self.start_paragraph(doc)?;
        let props = styled(&self.model, options);
        if let Some(prefix) = prefix {
            self.push_run(doc, prefix, &props, None)?;
        }
        if self.kind == SectionKind::List {
            self.push_run(doc, "- ", &props, None)?;
        }
        match line {
            Line::Values(values) => {
                for (index, value) in values.iter().enumerate() {
                    let text = if index == 0 {
                        value.to_string()
                    } else {
                        format!(" {}", value)
                    };
                    self.push_run(doc, &text, &props, options.href.as_deref())?;
                }
            }
            Line::Citation(citable) => {
                for fragment in citable.fragments(citation) {
                    self.write_fragment(doc, &fragment, options)?;
                }
            }
        }
        Ok(())
    }

    fn write_fragment(
        &mut self,
        doc: &mut WordDocument,
        fragment: &Fragment,
        options: &LineOptions,
    ) -> Result<()> {
        let props = styled(&self.model, options);
        let href = fragment.href.as_deref().or(options.href.as_deref());
        match fragment.tag {
            FragmentTag::Key => {
                self.push_run(doc, &format!("[{}] ", fragment.text), &props, href)
            }
            FragmentTag::Title => {
                self.push_run(doc, &format!("{}. ", fragment.text.trim_end()), &props, href)
            }
            FragmentTag::Venue => {
                let italic = RunProps {
                    italic: true,
                    ..props.clone()
                };
                self.push_run(doc, fragment.bare_text(), &italic, href)?;
                self.push_run(doc, ", ", &props, None)
            }
            FragmentTag::Authors | FragmentTag::Plain => {
                self.push_run(doc, &fragment.text, &props, href)
            }
        }
    }

    fn finish(&self, doc: &mut WordDocument) -> Result<()> {
        if let Some(mark) = &self.mark {
            mark.finish(doc.body_mut()?);
        }
        Ok(())
    }
}

/// Table sections: one row per line, the title being the header row.
#[derive(Debug)]
struct TableSection {
    name: String,
    /// Position and copy of the table being replaced.
    old: Option<(usize, XmlElement)>,
    table: Option<usize>,
    width: usize,
    rows: usize,
    col: usize,
    overflow_reported: bool,
}

impl TableSection {
    fn new(name: &str, old: Option<(usize, XmlElement)>) -> Self {
        Self {
            name: name.to_string(),
            old,
            table: None,
            width: 0,
            rows: 0,
            col: 0,
            overflow_reported: false,
        }
    }

    fn old_table(&self) -> Option<&XmlElement> {
        self.old.as_ref().map(|(_, tbl)| tbl)
    }

    fn ensure_table(&mut self, doc: &mut WordDocument, width: usize) -> Result<()> {
        if self.table.is_some() {
            return Ok(());
        }
        self.width = width.max(1);
        let tbl = new_table(self.width, self.old_table());
        let body = doc.body_mut()?;
        let index = match &self.old {
            Some((old, _)) => {
                insert_at(body, old + 1, tbl);
                old + 1
            }
            None => append_to_body(body, tbl),
        };
        self.table = Some(index);
        Ok(())
    }

    fn start_row(&mut self, doc: &mut WordDocument) -> Result<()> {
        let width = self.width;
        let body = doc.body_mut()?;
        if let Some(tbl) = self.table.and_then(|index| element_mut(body, index)) {
            tbl.push_element(new_row(width));
        }
        self.rows += 1;
        self.col = 0;
        Ok(())
    }

    fn write_row(&mut self, doc: &mut WordDocument, values: &[Value], props: &RunProps) -> Result<()> {
        self.ensure_table(doc, values.len())?;
        self.start_row(doc)?;
        for value in values {
            self.write_cell(doc, value, props)?;
        }
        Ok(())
    }

    fn append(&mut self, doc: &mut WordDocument, value: &Value, props: &RunProps) -> Result<()> {
        self.ensure_table(doc, 1)?;
        if self.rows == 0 || self.col >= self.width {
            self.start_row(doc)?;
        }
        self.write_cell(doc, value, props)
    }

    fn write_cell(&mut self, doc: &mut WordDocument, value: &Value, props: &RunProps) -> Result<()> {
        let (row, col) = (self.rows.saturating_sub(1), self.col);
        if col >= self.width {
            if !self.overflow_reported {
                tracing::warn!(
                    "Table '{}' has {} columns, dropping extra values of row {}",
                    self.name,
                    self.width,
                    row + 1
                );
                self.overflow_reported = true;
            }
            return Ok(());
        }
        self.col += 1;

        let width = self
            .old_table()
            .and_then(|old| model_cell(old, row, col))
            .and_then(cell_width)
            .cloned();
        let style = self
            .old_table()
            .and_then(|old| table_cell(old, 0, 0))
            .and_then(cell_paragraph_style);

        let body = doc.body_mut()?;
        let Some(cell) = self
            .table
            .and_then(|index| element_mut(body, index))
            .and_then(|tbl| tbl.elements_named_mut("w:tr").nth(row))
            .and_then(|tr| tr.elements_named_mut("w:tc").nth(col))
        else {
            return Ok(());
        };
        if let Some(width) = width {
            let tc_pr = cell.first_child_or_insert("w:tcPr");
            tc_pr.remove_children("w:tcW");
            tc_pr.children.insert(0, XmlChild::Element(width));
        }
        let p = cell.child_or_append("w:p");
        if let Some(style) = style {
            set_paragraph_style(p, &style);
        }
        if row == 0 && col == 0 {
            let hidden = RunProps {
                hidden: true,
                ..RunProps::default()
            };
            p.push_element(new_run(&self.name, &hidden));
        }
        if row > 0 && value.is_numeric() {
            set_alignment(p, "right");
        }
        p.push_element(new_run(&value.to_string(), props));
        Ok(())
    }

    /// Drop the replaced table once its successor exists.
    fn finish(&mut self, doc: &mut WordDocument) -> Result<()> {
        if self.table.is_some()
            && let Some((old, _)) = self.old.take()
        {
            remove_at(doc.body_mut()?, old);
        }
        Ok(())
    }
}

/// The cell of the old table whose layout a new cell borrows: the same
/// position, or one from the first row.
fn model_cell(old: &XmlElement, row: usize, col: usize) -> Option<&XmlElement> {
    table_cell(old, row, col).or_else(|| {
        if col == 0 {
            table_cell(old, 0, 0)
        } else {
            table_cell(old, 0, 1).or_else(|| table_cell(old, 0, 0))
        }
    })
}

fn new_table(width: usize, old: Option<&XmlElement>) -> XmlElement {
    let properties = old
        .and_then(|tbl| tbl.child("w:tblPr"))
        .cloned()
        .unwrap_or_else(|| {
            XmlElement::new("w:tblPr")
                .with_child(XmlElement::new("w:tblStyle").with_attribute("w:val", "TableGrid"))
                .with_child(
                    XmlElement::new("w:tblW")
                        .with_attribute("w:w", "0")
                        .with_attribute("w:type", "auto"),
                )
        });
    let grid = old
        .and_then(|tbl| tbl.child("w:tblGrid"))
        .filter(|grid| grid.elements_named("w:gridCol").count() == width)
        .cloned()
        .unwrap_or_else(|| {
            let mut grid = XmlElement::new("w:tblGrid");
            for _ in 0..width {
                grid.push_element(
                    XmlElement::new("w:gridCol").with_attribute("w:w", (TABLE_WIDTH / width).to_string()),
                );
            }
            grid
        });
    XmlElement::new("w:tbl").with_child(properties).with_child(grid)
}

fn new_row(width: usize) -> XmlElement {
    let mut row = XmlElement::new("w:tr");
    for _ in 0..width {
        row.push_element(
            XmlElement::new("w:tc")
                .with_child(
                    XmlElement::new("w:tcPr").with_child(
                        XmlElement::new("w:tcW")
                            .with_attribute("w:w", "0")
                            .with_attribute("w:type", "auto"),
                    ),
                )
                .with_child(XmlElement::new("w:p")),
        );
    }
    row
}

#[derive(Debug)]
enum Section {
    Skip,
    Flow(Flow),
    Table(TableSection),
}

/// Writes sections into a word-processing document.
pub struct DocxWriter {
    state: SectionState,
    target: OutputTarget,
    visible_marks: bool,
    document: Option<WordDocument>,
    section: Section,
    touched: bool,
}

impl DocxWriter {
    pub fn new(config: &WriterConfig) -> Self {
        Self {
            state: SectionState::new(config.numbered, &SectionKind::ALL),
            target: OutputTarget::new(config, ".docx"),
            visible_marks: config.visible_marks,
            document: None,
            section: Section::Skip,
            touched: false,
        }
    }

    /// Citation keys cited by the open document outside the region of
    /// `mark`.
    pub fn cited_keys(&self, mark: &str) -> Result<Vec<String>> {
        match &self.document {
            Some(doc) => Ok(cited_keys(doc.body()?, mark)),
            None => Ok(Vec::new()),
        }
    }

    fn open_edited(&mut self, name: &str, kind: SectionKind) -> Result<Section> {
        let source = self
            .target
            .source()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let doc = document(&mut self.document)?;
        if kind == SectionKind::Table {
            let body = doc.body()?;
            let Some(index) = find_table(body, name) else {
                tracing::warn!("Cannot find table mark '{}' in document {}", name, source);
                return Ok(Section::Skip);
            };
            let old = body.children.get(index).and_then(|c| match c {
                XmlChild::Element(e) => Some(e.clone()),
                XmlChild::Text(_) => None,
            });
            return Ok(match old {
                Some(old) => Section::Table(TableSection::new(name, Some((index, old)))),
                None => Section::Skip,
            });
        }
        match InsertionMark::prepare(doc.body_mut()?, name, self.visible_marks) {
            Some(mark) => Ok(Section::Flow(Flow::new(kind, Some(mark), doc)?)),
            None => {
                tracing::warn!("Cannot find mark '{}' in document {}", name, source);
                Ok(Section::Skip)
            }
        }
    }

    fn open_fresh(&mut self, name: &str, kind: SectionKind) -> Result<Section> {
        let doc = document(&mut self.document)?;
        append_to_body(
            doc.body_mut()?,
            text_paragraph(name, Some(SECTION_HEADING), &RunProps::default()),
        );
        Ok(match kind {
            SectionKind::Table => Section::Table(TableSection::new(name, None)),
            kind => Section::Flow(Flow::new(kind, None, doc)?),
        })
    }

    fn line_cells(&self, line: Line<'_>) -> Vec<Value> {
        match line {
            Line::Values(values) => values.to_vec(),
            Line::Citation(citable) => citable
                .fragments(self.state.citation())
                .iter()
                .map(|f| Value::from(f.bare_text()))
                .collect(),
        }
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(mut doc) = self.document.take() {
            self.target.ensure_output_dir()?;
            doc.save(path)?;
            tracing::info!("Wrote {}", path.display());
        }
        Ok(())
    }
}

impl Writer for DocxWriter {
    fn supported_kinds(&self) -> &[SectionKind] {
        self.state.supported_kinds()
    }

    fn open(&mut self, target: &Path) -> Result<()> {
        self.state.open(&basename(target))?;
        self.target.open(target);
        self.section = Section::Skip;
        self.touched = false;
        self.document = Some(if self.target.edit_mode() {
            WordDocument::open(target)?
        } else {
            WordDocument::fresh()?
        });
        Ok(())
    }

    fn open_section(
        &mut self,
        name: &str,
        kind: SectionKind,
        options: &SectionOptions,
    ) -> Result<()> {
        self.section = Section::Skip;
        let Some(kind) = self.state.open_section(name, kind, options)? else {
            return Ok(());
        };
        self.section = if self.target.edit_mode() {
            self.open_edited(name, kind)?
        } else {
            self.open_fresh(name, kind)?
        };
        if !matches!(self.section, Section::Skip) {
            self.touched = true;
        }
        Ok(())
    }

    fn write_title(&mut self, title: &[Value], options: &TitleOptions) -> Result<()> {
        self.state.require_section("write a title")?;
        self.state.start_title();
        let edit = self.target.edit_mode();
        let doc = document(&mut self.document)?;
        match &mut self.section {
            Section::Skip => {}
            Section::Flow(flow) => flow.write_title(doc, &join_values(title, " "), options, edit)?,
            Section::Table(table) => {
                let mut props = styled(&RunProps::default(), &options.style);
                props.bold = props.bold || !edit;
                table.write_row(doc, title, &props)?;
            }
        }
        self.state.finish_title();
        Ok(())
    }

    fn write_line(&mut self, line: Line<'_>, options: &LineOptions) -> Result<()> {
        self.state.require_section("write a line")?;
        self.state.start_new_line();
        let prefix = self.state.is_numbered().then(|| self.state.line_prefix());
        let citation = self.state.citation().clone();
        let cells = match self.section {
            Section::Table(_) => self.line_cells(line),
            _ => Vec::new(),
        };
        let doc = document(&mut self.document)?;
        match &mut self.section {
            Section::Skip => {}
            Section::Flow(flow) => {
                flow.write_line(doc, line, prefix.as_deref(), &citation, options)?
            }
            Section::Table(table) => {
                table.write_row(doc, &cells, &styled(&RunProps::default(), options))?
            }
        }
        Ok(())
    }

    fn append(&mut self, fragment: &Fragment, options: &LineOptions) -> Result<()> {
        self.state.require_section("append")?;
        let doc = document(&mut self.document)?;
        match &mut self.section {
            Section::Skip => {}
            Section::Flow(flow) => flow.write_fragment(doc, fragment, options)?,
            Section::Table(table) => table.append(
                doc,
                &Value::from(fragment.bare_text()),
                &styled(&RunProps::default(), options),
            )?,
        }
        Ok(())
    }

    fn start_new_line(&mut self) -> Result<()> {
        self.state.require_section("start a new line")?;
        self.state.start_new_line();
        let doc = document(&mut self.document)?;
        match &mut self.section {
            Section::Skip => {}
            Section::Flow(flow) => flow.start_paragraph(doc)?,
            Section::Table(table) => {
                table.ensure_table(doc, 1)?;
                table.start_row(doc)?;
            }
        }
        Ok(())
    }

    fn close_section(&mut self) -> Result<()> {
        self.state.require_section("close a section")?;
        let name = self.state.section_name().unwrap_or_default().to_string();
        let section = std::mem::replace(&mut self.section, Section::Skip);
        let written = !matches!(section, Section::Skip);
        if let Some(doc) = self.document.as_mut() {
            match section {
                Section::Skip => {}
                Section::Flow(flow) => flow.finish(doc)?,
                Section::Table(mut table) => table.finish(doc)?,
            }
        }
        self.state.close_section()?;
        if written && self.target.file_per_section() {
            let filename = self.target.section_filename(&name);
            self.save(&filename)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.close()?;
        if self.target.file_per_section() {
            self.document = None;
            return Ok(());
        }
        if self.target.edit_mode() && !self.touched {
            tracing::info!("No region of {} was regenerated, leaving it as is", self.target.base());
            self.document = None;
            return Ok(());
        }
        let filename = self.target.filename();
        self.save(&filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::wordml::paragraph_text;
    use crate::values;

    fn body_texts(path: &Path) -> Vec<String> {
        let doc = WordDocument::open(path).unwrap();
        doc.body()
            .unwrap()
            .elements()
            .filter(|e| !e.is("w:sectPr"))
            .map(paragraph_text)
            .collect()
    }

    #[test]
    fn test_heading_styles() {
        assert_eq!(heading_style(0), "Title");
        assert_eq!(heading_style(2), "Heading2");
        assert_eq!(heading_style(12), "Heading9");
    }

    #[test]
    fn test_fresh_multi_section_document() {
        let dir = tempfile::tempdir().unwrap();
        let config = WriterConfig::default()
            .with_output_dir(dir.path())
            .with_multi_sheet(true)
            .with_numbered(true);
        let mut w = DocxWriter::new(&config);
        w.open(Path::new("report.docx")).unwrap();
        w.open_section("Notes", SectionKind::Text, &SectionOptions::numbered())
            .unwrap();
        w.write_heading("Intro", 1).unwrap();
        w.write_values(&values!["first", 1]).unwrap();
        w.close_section().unwrap();
        w.open_section("Items", SectionKind::List, &SectionOptions::default())
            .unwrap();
        w.write_values(&values!["apple"]).unwrap();
        w.close_section().unwrap();
        w.close().unwrap();

        let texts = body_texts(&dir.path().join("report.docx"));
        assert_eq!(
            texts,
            vec!["Notes", "Intro", "[2] first 1", "Items", "- apple"],
            "Got: {:?}",
            texts
        );
    }

    #[test]
    fn test_fresh_table_carries_hidden_mark() {
        let dir = tempfile::tempdir().unwrap();
        let config = WriterConfig::default().with_output_dir(dir.path());
        let mut w = DocxWriter::new(&config);
        w.open(Path::new("t.docx")).unwrap();
        w.open_section("#prices", SectionKind::Table, &SectionOptions::default())
            .unwrap();
        w.write_title(&values!["Item", "Price"], &TitleOptions::default())
            .unwrap();
        w.write_values(&values!["tea", 2.5, "extra"]).unwrap();
        w.close_section().unwrap();
        w.close().unwrap();

        let doc = WordDocument::open(&dir.path().join("t-prices.docx")).unwrap();
        let body = doc.body().unwrap();
        let tbl = body.child("w:tbl").unwrap();
        assert_eq!(
            crate::ooxml::wordml::table_mark_text(tbl).as_deref(),
            Some("#pricesItem")
        );
        let price = table_cell(tbl, 1, 1).unwrap();
        assert_eq!(paragraph_text(price), "2.5");
        let jc = price.child("w:p").unwrap().child("w:pPr").unwrap().child("w:jc");
        assert_eq!(jc.and_then(|j| j.get_attribute("w:val")), Some("right"));
        // Two columns only
        assert_eq!(tbl.elements_named("w:tr").nth(1).unwrap().elements_named("w:tc").count(), 2);
    }
}
