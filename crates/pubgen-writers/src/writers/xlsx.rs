/*
 * xlsx.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Workbook output, one worksheet per section.
//!
//! Fresh workbooks are built from a minimal package. In edit mode each
//! section is written into the existing sheet of the same name: rows are
//! addressed by position, locked cells are left untouched, and insert mode
//! pushes rows down while inheriting the style and formulas of the row
//! above.

use crate::config::WriterConfig;
use crate::contract::{Line, Writer};
use crate::error::{Result, WriterError};
use crate::fragment::Fragment;
use crate::ooxml::package::{
    CONTENT_TYPES, Package, Relationships, add_content_type_override, content_types_xml,
    relationships_xml, remove_content_type_override, resolve_target,
};
use crate::ooxml::sheetml::{
    CellStyles, cell_formula, cell_mut, cell_style, clear_cell, date_serial, datetime_serial,
    find_cell, find_row, row_mut, sheet_data, shift_rows_down, translate_formula,
};
use crate::options::{LineOptions, SectionOptions, TitleOptions};
use crate::state::{SectionKind, SectionState};
use crate::target::{OutputTarget, basename};
use crate::value::Value;
use pubgen_xml::{XmlDocument, XmlElement};
use std::path::Path;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const WORKSHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const STYLES_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const WORKBOOK_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const WORKSHEET_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const STYLES_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";

const STYLES_XML: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd hh:mm:ss"/></numFmts><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// `cellXfs` indices of the fresh-workbook styles.
const DATE_STYLE: u32 = 1;
const DATETIME_STYLE: u32 = 2;
const BOLD_STYLE: u32 = 3;

const MAX_SHEET_NAME: usize = 31;

/// Replace the characters sheet names cannot hold and truncate.
pub fn sheet_name(name: &str) -> String {
    name.chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect()
}

#[derive(Debug)]
struct Sheet {
    name: String,
    part: String,
    doc: Option<XmlDocument>,
}

/// An open workbook package.
#[derive(Debug)]
struct Workbook {
    package: Package,
    part: String,
    workbook: XmlDocument,
    rels: Relationships,
    styles: CellStyles,
    sheets: Vec<Sheet>,
}

impl Workbook {
    fn fresh() -> Result<Self> {
        let content_types = content_types_xml(&[
            ("xl/workbook.xml", WORKBOOK_TYPE),
            ("xl/styles.xml", STYLES_TYPE),
        ]);
        let root_rels = relationships_xml(&[("rId1", OFFICE_DOCUMENT_REL, "xl/workbook.xml")]);
        let workbook_rels = relationships_xml(&[("rId1", STYLES_REL, "styles.xml")]);
        let workbook = format!(
            "<workbook xmlns=\"{}\" xmlns:r=\"{}\"><sheets/></workbook>",
            MAIN_NS, REL_NS
        );
        let package = Package::from_parts(&[
            (CONTENT_TYPES, &content_types),
            ("_rels/.rels", &root_rels),
            ("xl/workbook.xml", &workbook),
            ("xl/_rels/workbook.xml.rels", &workbook_rels),
            ("xl/styles.xml", STYLES_XML),
        ]);
        Self::from_package(package)
    }

    fn open(path: &Path) -> Result<Self> {
        Self::from_package(Package::open(path)?)
    }

    fn from_package(package: Package) -> Result<Self> {
        let root_rels = Relationships::load(&package, "")?;
        let part = root_rels
            .target_of_type(OFFICE_DOCUMENT_REL)
            .map(|t| resolve_target("", t))
            .filter(|p| package.has_part(p))
            .unwrap_or_else(|| "xl/workbook.xml".to_string());
        let workbook = package.xml_part(&part)?;
        let rels = Relationships::load(&package, &part)?;

        let styles_part = resolve_target(&part, "styles.xml");
        let styles = if package.has_part(&styles_part) {
            CellStyles::from_styles(&package.xml_part(&styles_part)?)
        } else {
            CellStyles::default()
        };

        let sheets = workbook
            .root
            .child("sheets")
            .map(|sheets| {
                sheets
                    .elements_named("sheet")
                    .filter_map(|sheet| {
                        let name = sheet.get_attribute("name")?;
                        let target = rels.target(sheet.get_attribute("r:id")?)?;
                        Some(Sheet {
                            name: name.to_string(),
                            part: resolve_target(&part, target),
                            doc: None,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            package,
            part,
            workbook,
            rels,
            styles,
            sheets,
        })
    }

    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    fn unique_name(&self, name: &str) -> String {
        let base = sheet_name(name);
        if self.sheet_index(&base).is_none() {
            return base;
        }
        let unique = (1..)
            .map(|n: u32| {
                let suffix = n.to_string();
                let keep = MAX_SHEET_NAME.saturating_sub(suffix.len());
                format!("{}{}", base.chars().take(keep).collect::<String>(), suffix)
            })
            .find(|candidate| self.sheet_index(candidate).is_none());
        unique.unwrap_or(base)
    }

    fn add_sheet(&mut self, name: &str) -> Result<usize> {
        let name = self.unique_name(name);
        let number = (1..)
            .find(|n| {
                let part = format!("xl/worksheets/sheet{}.xml", n);
                !self.package.has_part(&part) && !self.sheets.iter().any(|s| s.part == part)
            })
            .unwrap_or(1);
        let part = format!("xl/worksheets/sheet{}.xml", number);
        let rel_id = self.rels.add(
            WORKSHEET_REL,
            &format!("worksheets/sheet{}.xml", number),
            false,
        );
        let sheet_id = self
            .workbook
            .root
            .child("sheets")
            .map(|s| {
                s.elements_named("sheet")
                    .filter_map(|e| e.get_attribute("sheetId"))
                    .filter_map(|id| id.parse::<u32>().ok())
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
            + 1;
        self.workbook.root.child_or_append("sheets").push_element(
            XmlElement::new("sheet")
                .with_attribute("name", name.as_str())
                .with_attribute("sheetId", sheet_id.to_string())
                .with_attribute("r:id", rel_id),
        );
        add_content_type_override(&mut self.package, &part, WORKSHEET_TYPE)?;

        let worksheet = XmlElement::new("worksheet")
            .with_attribute("xmlns", MAIN_NS)
            .with_attribute("xmlns:r", REL_NS)
            .with_child(XmlElement::new("sheetData"));
        tracing::debug!("Adding sheet '{}' as {}", name, part);
        self.sheets.push(Sheet {
            name,
            part,
            doc: Some(XmlDocument::new(worksheet)),
        });
        Ok(self.sheets.len() - 1)
    }

    /// The worksheet element of a sheet, with the workbook's lock flags.
    fn worksheet(&mut self, index: usize) -> Result<(&CellStyles, &mut XmlElement)> {
        let sheet = self
            .sheets
            .get_mut(index)
            .ok_or_else(|| WriterError::InvalidDocument(format!("no sheet #{}", index)))?;
        if sheet.doc.is_none() {
            sheet.doc = Some(self.package.xml_part(&sheet.part)?);
        }
        match sheet.doc.as_mut() {
            Some(doc) => Ok((&self.styles, &mut doc.root)),
            None => Err(WriterError::MissingPart(sheet.part.clone())),
        }
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        if self.sheets.is_empty() {
            self.add_sheet("Sheet1")?;
        }
        let mut edited = false;
        for sheet in &mut self.sheets {
            if let Some(doc) = sheet.doc.as_mut() {
                // Row positions may have moved
                doc.root.remove_children("dimension");
                self.package.set_xml_part(&sheet.part, doc)?;
                edited = true;
            }
        }
        if edited {
            drop_calc_chain(&mut self.package, &mut self.rels, &self.part)?;
        }
        self.package.set_xml_part(&self.part, &self.workbook)?;
        self.rels.save(&mut self.package)?;
        self.package.save(path)
    }
}

/// Cached calculation order goes stale once rows move.
fn drop_calc_chain(package: &mut Package, rels: &mut Relationships, workbook: &str) -> Result<()> {
    let part = resolve_target(workbook, "calcChain.xml");
    if package.remove_part(&part) {
        rels.remove_target("calcChain.xml");
        remove_content_type_override(package, &part)?;
    }
    Ok(())
}

fn set_cell_value(cell: &mut XmlElement, value: &Value, fresh: bool) {
    clear_cell(cell);
    let number = |cell: &mut XmlElement, text: String| {
        cell.push_element(XmlElement::new("v").with_text(text));
    };
    match value {
        Value::Null => {}
        Value::Str(s) => inline_string(cell, s),
        Value::Int(i) => number(cell, i.to_string()),
        Value::Float(x) if x.is_finite() => number(cell, x.to_string()),
        Value::Float(x) => inline_string(cell, &x.to_string()),
        Value::Bool(b) => {
            cell.set_attribute("t", "b");
            number(cell, if *b { "1" } else { "0" }.to_string());
        }
        Value::Date(d) => {
            number(cell, date_serial(*d).to_string());
            if fresh {
                cell.set_attribute("s", DATE_STYLE.to_string());
            }
        }
        Value::DateTime(dt) => {
            number(cell, datetime_serial(*dt).to_string());
            if fresh {
                cell.set_attribute("s", DATETIME_STYLE.to_string());
            }
        }
    }
}

fn inline_string(cell: &mut XmlElement, text: &str) {
    cell.set_attribute("t", "inlineStr");
    let mut t = XmlElement::new("t").with_text(text);
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.set_attribute("xml:space", "preserve");
    }
    cell.push_element(XmlElement::new("is").with_child(t));
}

/// Writes each table or bibliography section into a worksheet.
pub struct XlsxWriter {
    state: SectionState,
    target: OutputTarget,
    book: Option<Workbook>,
    sheet: Option<usize>,
    row: u32,
    col: u32,
}

impl XlsxWriter {
    pub fn new(config: &WriterConfig) -> Self {
        Self {
            state: SectionState::new(
                config.numbered,
                &[SectionKind::Table, SectionKind::Bibliography],
            ),
            target: OutputTarget::new(config, ".xlsx"),
            book: None,
            sheet: None,
            row: 0,
            col: 0,
        }
    }

    fn book(&mut self) -> Result<&mut Workbook> {
        if self.book.is_none() {
            self.book = Some(Workbook::fresh()?);
        }
        self.book
            .as_mut()
            .ok_or_else(|| WriterError::InvalidDocument("no workbook".to_string()))
    }

    fn write_cells(&mut self, values: &[Value], style: Option<u32>, insert: bool) -> Result<()> {
        let Some(index) = self.sheet else {
            return Ok(());
        };
        let edit = self.target.edit_mode();
        let row = self.row;
        let book = self.book()?;
        let (styles, worksheet) = book.worksheet(index)?;
        let data = sheet_data(worksheet);
        if insert && edit {
            shift_rows_down(data, row);
        }
        for (offset, value) in values.iter().enumerate() {
            let col = offset as u32 + 1;
            write_cell(data, styles, row, col, value, style, insert && edit, edit)?;
        }
        self.col = values.len() as u32;
        Ok(())
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
}

#[allow(clippy::too_many_arguments)]
fn write_cell(
    data: &mut XmlElement,
    styles: &CellStyles,
    row: u32,
    col: u32,
    value: &Value,
    style: Option<u32>,
    inherit: bool,
    edit: bool,
) -> Result<()> {
    let above = if inherit && row > 1 {
        find_row(data, row - 1)
            .and_then(|r| find_cell(r, col))
            .map(|c| (cell_style(c), cell_formula(c)))
    } else {
        None
    };

    let cell = cell_mut(row_mut(data, row)?, row, col)?;
    if let Some((Some(s), _)) = &above {
        cell.set_attribute("s", s.to_string());
    }
    if edit && styles.is_locked(cell_style(cell)) {
        tracing::debug!("Skipping locked cell at row {} column {}", row, col);
        return Ok(());
    }
    if value.is_blank() {
        if let Some((_, Some(formula))) = above {
            clear_cell(cell);
            cell.push_element(XmlElement::new("f").with_text(translate_formula(&formula, 1, 0)));
        }
        return Ok(());
    }
    set_cell_value(cell, value, !edit);
    if let Some(style) = style
        && !edit
    {
        cell.set_attribute("s", style.to_string());
    }
    Ok(())
}

impl Writer for XlsxWriter {
    fn supported_kinds(&self) -> &[SectionKind] {
        self.state.supported_kinds()
    }

    fn open(&mut self, target: &Path) -> Result<()> {
        self.state.open(&basename(target))?;
        self.target.open(target);
        self.book = Some(if self.target.edit_mode() {
            Workbook::open(target)?
        } else {
            Workbook::fresh()?
        });
        Ok(())
    }

    fn open_section(
        &mut self,
        name: &str,
        kind: SectionKind,
        options: &SectionOptions,
    ) -> Result<()> {
        self.sheet = None;
        self.row = 0;
        self.col = 0;
        if self.state.open_section(name, kind, options)?.is_none() {
            return Ok(());
        }
        if self.target.edit_mode() {
            let wanted = sheet_name(name);
            let book = self.book()?;
            self.sheet = book.sheet_index(&wanted);
            if self.sheet.is_none() {
                tracing::warn!("Cannot find sheet '{}' in workbook, skipping section", wanted);
            }
        } else {
            let index = self.book()?.add_sheet(name)?;
            self.sheet = Some(index);
        }
        Ok(())
    }

    fn write_title(&mut self, title: &[Value], options: &TitleOptions) -> Result<()> {
        self.state.require_section("write a title")?;
        if self.sheet.is_none() {
            return Ok(());
        }
        self.state.start_title();
        self.row += 1;
        if !self.target.edit_mode() || options.always {
            self.write_cells(title, Some(BOLD_STYLE), false)?;
        }
        self.state.finish_title();
        Ok(())
    }

    fn write_line(&mut self, line: Line<'_>, options: &LineOptions) -> Result<()> {
        self.state.require_section("write a line")?;
        if self.sheet.is_none() {
            return Ok(());
        }
        self.state.start_new_line();
        self.row += 1;
        let cells = self.line_cells(line);
        self.write_cells(&cells, None, options.insert_mode)
    }

    fn append(&mut self, fragment: &Fragment, _options: &LineOptions) -> Result<()> {
        self.state.require_section("append")?;
        let Some(index) = self.sheet else {
            return Ok(());
        };
        if self.row == 0 {
            self.row = 1;
        }
        self.col += 1;
        let (row, col, edit) = (self.row, self.col, self.target.edit_mode());
        let book = self.book()?;
        let (styles, worksheet) = book.worksheet(index)?;
        let value = Value::from(fragment.bare_text());
        write_cell(sheet_data(worksheet), styles, row, col, &value, None, false, edit)
    }

    fn start_new_line(&mut self) -> Result<()> {
        self.state.require_section("start a new line")?;
        self.state.start_new_line();
        self.row += 1;
        self.col = 0;
        Ok(())
    }

    fn close_section(&mut self) -> Result<()> {
        let name = self.state.section_name().unwrap_or_default().to_string();
        self.state.close_section()?;
        if self.target.file_per_section() && self.sheet.is_some() {
            let filename = self.target.section_filename(&name);
            if let Some(mut book) = self.book.take() {
                self.target.ensure_output_dir()?;
                book.save(&filename)?;
                tracing::info!("Wrote {}", filename.display());
            }
        }
        self.sheet = None;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.close()?;
        if let Some(mut book) = self.book.take()
            && !self.target.file_per_section()
        {
            let filename = self.target.filename();
            self.target.ensure_output_dir()?;
            book.save(&filename)?;
            tracing::info!("Wrote {}", filename.display());
        }
        Ok(())
    }
}

/// Read the cell values of one sheet, row by row.
///
/// Rows and cells are placed by position, so gaps come back as
/// [`Value::Null`].
pub fn read_sheet(path: &Path, name: &str) -> Result<Vec<Vec<Value>>> {
    let mut book = Workbook::open(path)?;
    let index = book
        .sheet_index(name)
        .ok_or_else(|| WriterError::InvalidDocument(format!("no sheet named '{}'", name)))?;
    let shared = shared_strings(&book.package, &book.part)?;
    let (_, worksheet) = book.worksheet(index)?;
    let mut rows = Vec::new();
    let Some(data) = worksheet.child("sheetData") else {
        return Ok(rows);
    };
    for row in data.elements_named("row") {
        let Some(r) = row.get_attribute("r").and_then(|r| r.parse::<usize>().ok()) else {
            continue;
        };
        while rows.len() < r {
            rows.push(Vec::new());
        }
        let cells = &mut rows[r - 1];
        for cell in row.elements_named("c") {
            let Some((_, col)) = cell.get_attribute("r").and_then(crate::ooxml::sheetml::parse_cell_ref)
            else {
                continue;
            };
            let col = col as usize;
            while cells.len() < col {
                cells.push(Value::Null);
            }
            cells[col - 1] = cell_value(cell, &shared);
        }
    }
    Ok(rows)
}

fn shared_strings(package: &Package, workbook: &str) -> Result<Vec<String>> {
    let part = resolve_target(workbook, "sharedStrings.xml");
    if !package.has_part(&part) {
        return Ok(Vec::new());
    }
    let doc = package.xml_part(&part)?;
    Ok(doc
        .root
        .elements_named("si")
        .map(|si| si.descendant_text("t"))
        .collect())
}

fn cell_value(cell: &XmlElement, shared: &[String]) -> Value {
    let raw = cell.child("v").map(XmlElement::text);
    match cell.get_attribute("t") {
        Some("inlineStr") => Value::Str(cell.child("is").map(|is| is.descendant_text("t")).unwrap_or_default()),
        Some("s") => raw
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(|i| shared.get(i).cloned())
            .map_or(Value::Null, Value::Str),
        Some("str") => raw.map_or(Value::Null, Value::Str),
        Some("b") => Value::Bool(raw.as_deref() == Some("1")),
        _ => match raw {
            Some(v) => v
                .parse::<i64>()
                .map(Value::Int)
                .or_else(|_| v.parse::<f64>().map(Value::Float))
                .unwrap_or(Value::Str(v)),
            None => Value::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;

    #[test]
    fn test_sheet_name() {
        assert_eq!(sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn test_unique_sheet_names() {
        let mut book = Workbook::fresh().unwrap();
        book.add_sheet("Data").unwrap();
        book.add_sheet("Data").unwrap();
        let names: Vec<_> = book.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Data", "Data1"]);
        let parts: Vec<_> = book.sheets.iter().map(|s| s.part.as_str()).collect();
        assert_eq!(parts, vec!["xl/worksheets/sheet1.xml", "xl/worksheets/sheet2.xml"]);
    }

    #[test]
    fn test_fresh_workbook_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = WriterConfig::default()
            .with_output_dir(dir.path())
            .with_multi_sheet(true);
        let mut writer = XlsxWriter::new(&config);
        writer.open(Path::new("book.xlsx")).unwrap();
        writer
            .open_section("Test Table", SectionKind::Table, &SectionOptions::default())
            .unwrap();
        writer
            .write_title(&values!["Name", "Count"], &TitleOptions::default())
            .unwrap();
        writer.write_values(&values!["foo", 42]).unwrap();
        writer.write_values(&values!["bar", 2.5]).unwrap();
        writer.close_section().unwrap();
        writer.close().unwrap();

        let rows = read_sheet(&dir.path().join("book.xlsx"), "Test Table").unwrap();
        assert_eq!(
            rows,
            vec![
                values!["Name", "Count"],
                values!["foo", 42],
                values!["bar", 2.5],
            ]
        );
    }

    fn locked_and_open_styles() -> CellStyles {
        let doc = pubgen_xml::parse(
            br#"<styleSheet><cellXfs count="2"><xf/><xf><protection locked="0"/></xf></cellXfs></styleSheet>"#,
        )
        .unwrap();
        CellStyles::from_styles(&doc)
    }

    fn formula_row(style: &str) -> XmlElement {
        XmlElement::new("sheetData").with_child(
            XmlElement::new("row").with_attribute("r", "1").with_child(
                XmlElement::new("c")
                    .with_attribute("r", "A1")
                    .with_attribute("s", style)
                    .with_child(XmlElement::new("f").with_text("B1*2")),
            ),
        )
    }

    #[test]
    fn test_inherited_formula_respects_lock() {
        let styles = locked_and_open_styles();

        let mut data = formula_row("0");
        write_cell(&mut data, &styles, 2, 1, &Value::from(""), None, true, true).unwrap();
        let cell = find_row(&data, 2).and_then(|r| find_cell(r, 1)).unwrap();
        assert_eq!(cell_formula(cell), None);

        let mut data = formula_row("1");
        write_cell(&mut data, &styles, 2, 1, &Value::from(""), None, true, true).unwrap();
        let cell = find_row(&data, 2).and_then(|r| find_cell(r, 1)).unwrap();
        assert_eq!(cell_formula(cell).as_deref(), Some("B2*2"));
    }

    #[test]
    fn test_cell_value_types() {
        let cell = XmlElement::new("c")
            .with_attribute("t", "b")
            .with_child(XmlElement::new("v").with_text("1"));
        assert_eq!(cell_value(&cell, &[]), Value::Bool(true));
        let cell = XmlElement::new("c")
            .with_attribute("t", "s")
            .with_child(XmlElement::new("v").with_text("1"));
        assert_eq!(
            cell_value(&cell, &["a".to_string(), "b".to_string()]),
            Value::from("b")
        );
    }
}
