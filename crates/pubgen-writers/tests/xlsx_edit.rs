/*
 * xlsx_edit.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Writing into an existing workbook: locked cells and row insertion.

use pubgen_writers::ooxml::package::{CONTENT_TYPES, Package, content_types_xml, relationships_xml};
use pubgen_writers::ooxml::sheetml::{cell_formula, find_cell, find_row};
use pubgen_writers::writers::xlsx::read_sheet;
use pubgen_writers::{
    Line, LineOptions, SectionKind, SectionOptions, TitleOptions, Value, Writer, WriterConfig,
    WriterRegistry, values, with_section, with_target,
};
use std::path::{Path, PathBuf};

const WORKBOOK: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Budget" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

// Style 0 is locked like every default style, style 1 is unlocked.
const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0" applyProtection="1"><protection locked="0"/></xf></cellXfs></styleSheet>"#;

const SHEET: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:C3"/><sheetData><row r="1"><c r="A1" s="0" t="inlineStr"><is><t>Item</t></is></c><c r="B1" s="0" t="inlineStr"><is><t>Cost</t></is></c></row><row r="2"><c r="A2" s="1" t="inlineStr"><is><t>old</t></is></c><c r="B2" s="1"><v>10</v></c><c r="C2" s="1"><f>B2*2</f></c></row><row r="3"><c r="A3" s="0" t="inlineStr"><is><t>Total</t></is></c><c r="B3" s="0"><f>SUM(B2:B2)</f></c></row></sheetData></worksheet>"#;

const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const WORKSHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const STYLES_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

fn template(dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join("budget.xlsx");
    let content_types = content_types_xml(&[
        (
            "xl/workbook.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
        ),
        (
            "xl/worksheets/sheet1.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
        ),
    ]);
    let root_rels = relationships_xml(&[("rId1", OFFICE_DOCUMENT_REL, "xl/workbook.xml")]);
    let workbook_rels = relationships_xml(&[
        ("rId1", WORKSHEET_REL, "worksheets/sheet1.xml"),
        ("rId2", STYLES_REL, "styles.xml"),
    ]);
    Package::from_parts(&[
        (CONTENT_TYPES, &content_types),
        ("_rels/.rels", &root_rels),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", &workbook_rels),
        ("xl/styles.xml", STYLES),
        ("xl/worksheets/sheet1.xml", SHEET),
    ])
    .save(&path)
    .unwrap();
    path
}

fn edit_budget(source: &Path, out: &Path) {
    let config = WriterConfig::default().with_output_dir(out);
    let mut writer = WriterRegistry::with_defaults()
        .create("xlsx-edit", &config)
        .unwrap();
    with_target(writer.as_mut(), source, |w| {
        with_section(w, "Budget", SectionKind::Table, &SectionOptions::default(), |w| {
            w.write_title(&values!["Name", "Price"], &TitleOptions::default().always())?;
            w.write_line(Line::Values(&values!["tea", 3, ""]), &LineOptions::default())?;
            w.write_line(Line::Values(&values!["milk", 4, ""]), &LineOptions::inserting())
        })
    })
    .unwrap();
}

#[test]
fn test_edit_respects_locks_and_inserts_rows() {
    let dir = tempfile::tempdir().unwrap();
    let source = template(&dir.path().join("src"));
    let out = dir.path().join("out");
    edit_budget(&source, &out);

    let rows = read_sheet(&out.join("budget.xlsx"), "Budget").unwrap();
    assert_eq!(
        rows,
        vec![
            // Locked header left alone
            vec![Value::from("Item"), Value::from("Cost")],
            vec![Value::from("tea"), Value::Int(3), Value::Null],
            vec![Value::from("milk"), Value::Int(4), Value::Null],
            vec![Value::from("Total"), Value::Null],
        ],
        "Got: {:?}",
        rows
    );
}

#[test]
fn test_inserted_row_inherits_formulas() {
    let dir = tempfile::tempdir().unwrap();
    let source = template(&dir.path().join("src"));
    let out = dir.path().join("out");
    edit_budget(&source, &out);

    let package = Package::open(&out.join("budget.xlsx")).unwrap();
    let sheet = package.xml_part("xl/worksheets/sheet1.xml").unwrap();
    let data = sheet.root.child("sheetData").unwrap();

    let kept = find_row(data, 2).and_then(|r| find_cell(r, 3)).and_then(cell_formula);
    assert_eq!(kept.as_deref(), Some("B2*2"));
    let inherited = find_row(data, 3).and_then(|r| find_cell(r, 3)).and_then(cell_formula);
    assert_eq!(inherited.as_deref(), Some("B3*2"), "Got: {:?}", inherited);
    let style = find_row(data, 3)
        .and_then(|r| find_cell(r, 1))
        .and_then(|c| c.get_attribute("s"));
    assert_eq!(style, Some("1"));
    // Stale dimensions are dropped
    assert!(sheet.root.child("dimension").is_none());
}

#[test]
fn test_missing_workbook_is_written_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    edit_budget(&dir.path().join("absent.xlsx"), &out);

    let rows = read_sheet(&out.join("absent.xlsx"), "Budget").unwrap();
    assert_eq!(rows[0], vec![Value::from("Name"), Value::from("Price")]);
    assert_eq!(rows[2], vec![Value::from("milk"), Value::Int(4), Value::Null]);
}
