/*
 * sheetml.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! SpreadsheetML helpers: cell references, formulas, styles and rows.

use crate::error::{Result, WriterError};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use pubgen_xml::{XmlChild, XmlDocument, XmlElement};
use regex::{Captures, Regex};

/// A1-style references, optionally absolute. A reference followed by `(`
/// is a function name, not a cell.
static CELL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)([A-Z]{1,3})(\$?)([0-9]+)(\(?)").unwrap());

/// `3` -> `C`, `28` -> `AB`. Columns are 1-based.
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        c.is_ascii_uppercase()
            .then(|| acc * 26 + (c as u32 - 'A' as u32 + 1))
    })
}

pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", column_letters(col), row)
}

/// `"B12"` -> `(12, 2)`.
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let digits = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, number) = reference.split_at(digits);
    Some((number.parse().ok()?, column_number(letters)?))
}

/// Shift the relative references of a formula by the given offsets.
/// Absolute parts (`$A`, `$1`) and function names stay put.
pub fn translate_formula(formula: &str, row_delta: i64, col_delta: i64) -> String {
    // References inside string literals are left alone
    let mut out = String::with_capacity(formula.len());
    for (index, piece) in formula.split('"').enumerate() {
        if index > 0 {
            out.push('"');
        }
        if index % 2 == 1 {
            out.push_str(piece);
        } else {
            out.push_str(&shift_references(piece, row_delta, col_delta));
        }
    }
    out
}

fn shift_references(text: &str, row_delta: i64, col_delta: i64) -> String {
    CELL_REF
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = &caps[0];
            if !caps[5].is_empty() {
                return whole.to_string();
            }
            let (col_abs, letters, row_abs, digits) = (&caps[1], &caps[2], &caps[3], &caps[4]);
            let (Some(col), Ok(row)) = (column_number(letters), digits.parse::<i64>()) else {
                return whole.to_string();
            };
            let col = if col_abs.is_empty() {
                i64::from(col) + col_delta
            } else {
                i64::from(col)
            };
            let row = if row_abs.is_empty() { row + row_delta } else { row };
            if col < 1 || row < 1 {
                return whole.to_string();
            }
            format!(
                "{}{}{}{}",
                col_abs,
                column_letters(col as u32),
                row_abs,
                row
            )
        })
        .into_owned()
}

/// Serial day number as stored by spreadsheets (1900 date system).
pub fn date_serial(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    (date - epoch).num_days() as f64
}

pub fn datetime_serial(dt: NaiveDateTime) -> f64 {
    let seconds = f64::from(dt.num_seconds_from_midnight());
    date_serial(dt.date()) + seconds / 86_400.0
}

/// Per-style lock flags read from `xl/styles.xml`.
///
/// Cells are locked unless their `cellXfs` entry carries
/// `<protection locked="0"/>`.
#[derive(Debug, Clone, Default)]
pub struct CellStyles {
    locked: Vec<bool>,
}

impl CellStyles {
    pub fn from_styles(doc: &XmlDocument) -> Self {
        let locked = doc
            .root
            .child("cellXfs")
            .map(|xfs| {
                xfs.elements_named("xf")
                    .map(|xf| {
                        xf.child("protection")
                            .and_then(|p| p.get_attribute("locked"))
                            .is_none_or(|v| v != "0" && v != "false")
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { locked }
    }

    pub fn is_locked(&self, style: Option<u32>) -> bool {
        let index = style.unwrap_or(0) as usize;
        self.locked.get(index).copied().unwrap_or(true)
    }
}

fn row_number(row: &XmlElement) -> Option<u32> {
    row.get_attribute("r").and_then(|r| r.parse().ok())
}

fn cell_column(cell: &XmlElement) -> Option<u32> {
    cell.get_attribute("r")
        .and_then(parse_cell_ref)
        .map(|(_, col)| col)
}

/// The `sheetData` of a worksheet, created if missing.
pub fn sheet_data(worksheet: &mut XmlElement) -> &mut XmlElement {
    worksheet.child_or_append("sheetData")
}

pub fn find_row(sheet_data: &XmlElement, row: u32) -> Option<&XmlElement> {
    sheet_data
        .elements_named("row")
        .find(|r| row_number(r) == Some(row))
}

/// The row element numbered `row`, inserted in order if missing.
pub fn row_mut(sheet_data: &mut XmlElement, row: u32) -> Result<&mut XmlElement> {
    let mut insert_at = sheet_data.children.len();
    let mut found = None;
    for (index, child) in sheet_data.children.iter().enumerate() {
        if let XmlChild::Element(e) = child
            && e.is("row")
        {
            match row_number(e) {
                Some(r) if r == row => {
                    found = Some(index);
                    break;
                }
                Some(r) if r > row => {
                    insert_at = index;
                    break;
                }
                _ => {}
            }
        }
    }
    let index = match found {
        Some(index) => index,
        None => {
            let element = XmlElement::new("row").with_attribute("r", row.to_string());
            sheet_data.children.insert(insert_at, XmlChild::Element(element));
            insert_at
        }
    };
    match sheet_data.children.get_mut(index) {
        Some(XmlChild::Element(e)) => Ok(e),
        _ => Err(WriterError::InvalidDocument(format!("row {} is not an element", row))),
    }
}

pub fn find_cell(row: &XmlElement, col: u32) -> Option<&XmlElement> {
    row.elements_named("c").find(|c| cell_column(c) == Some(col))
}

/// The cell of `row_el` in column `col`, inserted in order if missing.
pub fn cell_mut(row_el: &mut XmlElement, row: u32, col: u32) -> Result<&mut XmlElement> {
    let mut insert_at = row_el.children.len();
    let mut found = None;
    for (index, child) in row_el.children.iter().enumerate() {
        if let XmlChild::Element(e) = child
            && e.is("c")
        {
            match cell_column(e) {
                Some(c) if c == col => {
                    found = Some(index);
                    break;
                }
                Some(c) if c > col => {
                    insert_at = index;
                    break;
                }
                _ => {}
            }
        }
    }
    let index = match found {
        Some(index) => index,
        None => {
            let element = XmlElement::new("c").with_attribute("r", cell_ref(row, col));
            row_el.children.insert(insert_at, XmlChild::Element(element));
            insert_at
        }
    };
    match row_el.children.get_mut(index) {
        Some(XmlChild::Element(e)) => Ok(e),
        _ => Err(WriterError::InvalidDocument(format!(
            "cell {} is not an element",
            cell_ref(row, col)
        ))),
    }
}

/// Move every row at or below `at` down by one.
pub fn shift_rows_down(sheet_data: &mut XmlElement, at: u32) {
    for row in sheet_data.elements_named_mut("row") {
        let Some(r) = row_number(row) else {
            continue;
        };
        if r < at {
            continue;
        }
        row.set_attribute("r", (r + 1).to_string());
        for cell in row.elements_named_mut("c") {
            if let Some(col) = cell_column(cell) {
                cell.set_attribute("r", cell_ref(r + 1, col));
            }
        }
    }
}

pub fn cell_style(cell: &XmlElement) -> Option<u32> {
    cell.get_attribute("s").and_then(|s| s.parse().ok())
}

pub fn cell_formula(cell: &XmlElement) -> Option<String> {
    cell.child("f").map(XmlElement::text).filter(|f| !f.is_empty())
}

/// Drop the value and type of a cell, keeping its style.
pub fn clear_cell(cell: &mut XmlElement) {
    cell.remove_attribute("t");
    cell.children.clear();
}
