/*
 * tex_reader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Read back the rows of a `tabular` written by [`super::tex::TexWriter`].

use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, BufRead};

static FLOAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+\.[0-9]+$").unwrap());
static INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").unwrap());
static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());
static ISO_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}[ T][0-9]{2}:[0-9]{2}:[0-9]{2}$").unwrap()
});
static DMY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}/[0-9]{2}/([0-9]{2}|[0-9]{4})$").unwrap());

/// Guess the type of one cell. Anything that does not parse stays a
/// string.
pub fn guess_value(text: &str) -> Value {
    if FLOAT.is_match(text) {
        if let Ok(x) = text.parse::<f64>() {
            return Value::Float(x);
        }
    } else if INT.is_match(text) {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Int(i);
        }
    } else if ISO_DATETIME.is_match(text) {
        let normalized = text.replacen('T', " ", 1);
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S") {
            return Value::DateTime(dt);
        }
    } else if ISO_DATE.is_match(text) {
        if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Value::Date(d);
        }
    } else if DMY_DATE.is_match(text) {
        let format = if text.len() == 10 { "%d/%m/%Y" } else { "%d/%m/%y" };
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return Value::Date(d);
        }
    } else if text == "true" || text == "false" {
        return Value::Bool(text == "true");
    }
    Value::Str(text.to_string())
}

/// Split one row into cells, undoing the writer's escaping.
pub fn parse_row(line: &str) -> Vec<Value> {
    let line = line.trim_end();
    let line = line.strip_suffix("\\hline").unwrap_or(line).trim_end();
    let line = line.strip_suffix("\\\\").unwrap_or(line);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '&' => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells.iter().map(|cell| guess_value(cell.trim())).collect()
}

/// Iterates over the rows of the first `tabular` environment of a source.
pub struct TexTableReader<R> {
    lines: io::Lines<R>,
    inside: bool,
    done: bool,
}

impl<R: BufRead> TexTableReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            inside: false,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for TexTableReader<R> {
    type Item = io::Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            if !self.inside {
                self.inside = line.contains("\\begin{tabular}");
                continue;
            }
            if line.contains("\\end{tabular}") {
                self.done = true;
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            return Some(Ok(parse_row(&line)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_value() {
        assert_eq!(guess_value("42"), Value::Int(42));
        assert_eq!(guess_value("-1"), Value::Int(-1));
        assert_eq!(guess_value("-0.14"), Value::Float(-0.14));
        assert_eq!(guess_value("true"), Value::Bool(true));
        assert_eq!(guess_value("false"), Value::Bool(false));
        assert_eq!(guess_value(""), Value::Str(String::new()));
        assert_eq!(
            guess_value("2020-01-01"),
            Value::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        );
        assert_eq!(
            guess_value("31/12/99"),
            Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap())
        );
        assert_eq!(guess_value("2020-13-45"), Value::Str("2020-13-45".to_string()));
        assert_eq!(guess_value("1-2"), Value::Str("1-2".to_string()));
    }

    #[test]
    fn test_parse_row_unescapes() {
        let row = parse_row("Line 2 & \\%èé\\&à\\_\\$ & 666666666666 & -0.14\\\\\\hline");
        assert_eq!(
            row,
            vec![
                Value::from("Line 2"),
                Value::from("%èé&à_$"),
                Value::Int(666666666666),
                Value::Float(-0.14),
            ]
        );
    }

    #[test]
    fn test_reader_stops_at_end_of_table() {
        let source = "\\label{x}\\begin{tabular}{|l|r|}\\hline\nA & 1\\\\\\hline\n\\end{tabular}\nB & 2\\\\\\hline\n";
        let rows: Vec<_> = TexTableReader::new(source.as_bytes())
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(rows, vec![vec![Value::from("A"), Value::Int(1)]]);
    }
}
