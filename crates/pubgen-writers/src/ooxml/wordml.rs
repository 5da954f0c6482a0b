/*
 * wordml.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! WordprocessingML element helpers.

use pubgen_xml::{XmlChild, XmlElement};

pub const HYPERLINK_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Schema order of `w:pPr` children.
const PPR_ORDER: &[&str] = &[
    "w:pStyle",
    "w:keepNext",
    "w:keepLines",
    "w:pageBreakBefore",
    "w:framePr",
    "w:widowControl",
    "w:numPr",
    "w:suppressLineNumbers",
    "w:pBdr",
    "w:shd",
    "w:tabs",
    "w:suppressAutoHyphens",
    "w:kinsoku",
    "w:wordWrap",
    "w:overflowPunct",
    "w:topLinePunct",
    "w:autoSpaceDE",
    "w:autoSpaceDN",
    "w:bidi",
    "w:adjustRightInd",
    "w:snapToGrid",
    "w:spacing",
    "w:ind",
    "w:contextualSpacing",
    "w:mirrorIndents",
    "w:suppressOverlap",
    "w:jc",
    "w:textDirection",
    "w:textAlignment",
    "w:textboxTightWrap",
    "w:outlineLvl",
    "w:divId",
    "w:cnfStyle",
    "w:rPr",
    "w:sectPr",
    "w:pPrChange",
];

/// Schema order of `w:rPr` children.
const RPR_ORDER: &[&str] = &[
    "w:rStyle",
    "w:rFonts",
    "w:b",
    "w:bCs",
    "w:i",
    "w:iCs",
    "w:caps",
    "w:smallCaps",
    "w:strike",
    "w:dstrike",
    "w:outline",
    "w:shadow",
    "w:emboss",
    "w:imprint",
    "w:noProof",
    "w:snapToGrid",
    "w:vanish",
    "w:webHidden",
    "w:color",
    "w:spacing",
    "w:w",
    "w:kern",
    "w:position",
    "w:sz",
    "w:szCs",
    "w:highlight",
    "w:u",
    "w:effect",
    "w:bdr",
    "w:shd",
    "w:fitText",
    "w:vertAlign",
    "w:rtl",
    "w:cs",
    "w:em",
    "w:lang",
    "w:eastAsianLayout",
    "w:specVanish",
    "w:oMath",
];

fn order_of(child: &XmlChild, order: &[&str]) -> usize {
    match child {
        XmlChild::Element(e) => order
            .iter()
            .position(|name| e.is(name))
            .unwrap_or(usize::MAX),
        XmlChild::Text(_) => usize::MAX,
    }
}

/// Replace the property `element` of `parent`, keeping schema order.
fn set_property(parent: &mut XmlElement, element: XmlElement, order: &[&str]) {
    let qname = element.qualified_name();
    parent.remove_children(&qname);
    let rank = order
        .iter()
        .position(|name| *name == qname)
        .unwrap_or(usize::MAX);
    let at = parent
        .children
        .iter()
        .position(|c| order_of(c, order) > rank)
        .unwrap_or(parent.children.len());
    parent.children.insert(at, XmlChild::Element(element));
}

fn val(qname: &str, value: &str) -> XmlElement {
    XmlElement::new(qname).with_attribute("w:val", value)
}

/// Run formatting copied from one run onto new ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunProps {
    pub style: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub hidden: bool,
    pub color: Option<String>,
    pub underline: Option<String>,
}

/// On/off properties are on unless `w:val` says otherwise.
fn toggle_on(rpr: &XmlElement, qname: &str) -> bool {
    rpr.child(qname)
        .is_some_and(|e| !matches!(e.get_attribute("w:val"), Some("0" | "false" | "off")))
}

fn attribute_of(rpr: &XmlElement, qname: &str) -> Option<String> {
    rpr.child(qname)
        .and_then(|e| e.get_attribute("w:val"))
        .map(str::to_string)
}

impl RunProps {
    /// Formatting of `run`, without its hidden flag.
    pub fn from_run(run: &XmlElement) -> Self {
        let Some(rpr) = run.child("w:rPr") else {
            return Self::default();
        };
        Self {
            style: attribute_of(rpr, "w:rStyle"),
            bold: toggle_on(rpr, "w:b"),
            italic: toggle_on(rpr, "w:i"),
            hidden: false,
            color: attribute_of(rpr, "w:color"),
            underline: attribute_of(rpr, "w:u"),
        }
    }

    pub fn to_element(&self) -> Option<XmlElement> {
        let mut rpr = XmlElement::new("w:rPr");
        if let Some(style) = &self.style {
            rpr.push_element(val("w:rStyle", style));
        }
        if self.bold {
            rpr.push_element(XmlElement::new("w:b"));
        }
        if self.italic {
            rpr.push_element(XmlElement::new("w:i"));
        }
        if self.hidden {
            rpr.push_element(XmlElement::new("w:vanish"));
        }
        if let Some(color) = &self.color {
            rpr.push_element(val("w:color", color));
        }
        if let Some(underline) = &self.underline {
            rpr.push_element(val("w:u", underline));
        }
        (!rpr.is_empty()).then_some(rpr)
    }
}

pub fn new_run(text: &str, props: &RunProps) -> XmlElement {
    let mut run = XmlElement::new("w:r");
    if let Some(rpr) = props.to_element() {
        run.push_element(rpr);
    }
    let mut t = XmlElement::new("w:t").with_text(text);
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.set_attribute("xml:space", "preserve");
    }
    run.push_element(t);
    run
}

/// A `w:hyperlink` wrapping one run, styled as a link.
pub fn new_hyperlink(rel_id: &str, text: &str, props: &RunProps) -> XmlElement {
    let props = RunProps {
        style: Some("Hyperlink".to_string()),
        color: Some("0563C1".to_string()),
        underline: Some("single".to_string()),
        ..props.clone()
    };
    XmlElement::new("w:hyperlink")
        .with_attribute("r:id", rel_id)
        .with_child(new_run(text, &props))
}

pub fn new_paragraph(style: Option<&str>) -> XmlElement {
    let mut p = XmlElement::new("w:p");
    if let Some(style) = style {
        set_paragraph_style(&mut p, style);
    }
    p
}

/// A paragraph holding a single run.
pub fn text_paragraph(text: &str, style: Option<&str>, props: &RunProps) -> XmlElement {
    new_paragraph(style).with_child(new_run(text, props))
}

/// Text of a paragraph, or of any element containing runs.
pub fn paragraph_text(p: &XmlElement) -> String {
    p.descendant_text("w:t")
}

pub fn paragraph_style(p: &XmlElement) -> Option<String> {
    p.child("w:pPr")
        .and_then(|ppr| ppr.child("w:pStyle"))
        .and_then(|s| s.get_attribute("w:val"))
        .map(str::to_string)
}

pub fn set_paragraph_style(p: &mut XmlElement, style: &str) {
    let ppr = p.first_child_or_insert("w:pPr");
    set_property(ppr, val("w:pStyle", style), PPR_ORDER);
}

pub fn set_keep_with_next(p: &mut XmlElement) {
    let ppr = p.first_child_or_insert("w:pPr");
    set_property(ppr, XmlElement::new("w:keepNext"), PPR_ORDER);
}

pub fn set_alignment(p: &mut XmlElement, alignment: &str) {
    let ppr = p.first_child_or_insert("w:pPr");
    set_property(ppr, val("w:jc", alignment), PPR_ORDER);
}

/// First run of a paragraph, looking inside hyperlinks too.
pub fn first_run(p: &XmlElement) -> Option<&XmlElement> {
    p.elements().find_map(|e| {
        if e.is("w:r") {
            Some(e)
        } else if e.is("w:hyperlink") {
            e.child("w:r")
        } else {
            None
        }
    })
}

/// Mark every run below `element` as hidden text.
pub fn hide_runs(element: &mut XmlElement) {
    element.for_each_descendant_mut(&mut |e| {
        if e.is("w:r") {
            let rpr = e.first_child_or_insert("w:rPr");
            set_property(rpr, XmlElement::new("w:vanish"), RPR_ORDER);
        }
    });
}

/// Append a plain run, keeping the formatting of the paragraph's last run.
pub fn append_run(p: &mut XmlElement, text: &str) {
    let props = p
        .elements_named("w:r")
        .last()
        .map(|r| {
            let mut props = RunProps::from_run(r);
            props.hidden = r.child("w:rPr").is_some_and(|rpr| toggle_on(rpr, "w:vanish"));
            props
        })
        .unwrap_or_default();
    p.push_element(new_run(text, &props));
}

/// Rows of a `w:tbl`.
pub fn table_rows(tbl: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    tbl.elements_named("w:tr")
}

pub fn table_cell(tbl: &XmlElement, row: usize, col: usize) -> Option<&XmlElement> {
    table_rows(tbl).nth(row)?.elements_named("w:tc").nth(col)
}

/// Text of the first cell of the first row.
pub fn table_mark_text(tbl: &XmlElement) -> Option<String> {
    table_cell(tbl, 0, 0).map(paragraph_text)
}

/// Width element of a cell, if any.
pub fn cell_width(cell: &XmlElement) -> Option<&XmlElement> {
    cell.child("w:tcPr").and_then(|pr| pr.child("w:tcW"))
}

/// Style of the first paragraph of a cell.
pub fn cell_paragraph_style(cell: &XmlElement) -> Option<String> {
    cell.child("w:p").and_then(paragraph_style)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(e: &XmlElement) -> Vec<String> {
        e.elements().map(|c| c.qualified_name()).collect()
    }

    #[test]
    fn test_properties_keep_schema_order() {
        let mut p = new_paragraph(None);
        set_alignment(&mut p, "right");
        set_keep_with_next(&mut p);
        set_paragraph_style(&mut p, "Heading3");
        let ppr = p.child("w:pPr").unwrap();
        assert_eq!(names(ppr), vec!["w:pStyle", "w:keepNext", "w:jc"]);
        set_paragraph_style(&mut p, "Normal");
        assert_eq!(paragraph_style(&p).as_deref(), Some("Normal"));
        assert_eq!(p.child("w:pPr").unwrap().elements().count(), 3);
    }

    #[test]
    fn test_hide_runs_inserts_vanish_in_order() {
        let props = RunProps {
            bold: true,
            color: Some("FF0000".to_string()),
            ..RunProps::default()
        };
        let mut p = text_paragraph("mark", None, &props);
        hide_runs(&mut p);
        let rpr = p.child("w:r").unwrap().child("w:rPr").unwrap();
        assert_eq!(names(rpr), vec!["w:b", "w:vanish", "w:color"]);
    }

    #[test]
    fn test_run_props_round_trip() {
        let props = RunProps {
            style: Some("Strong".to_string()),
            bold: true,
            italic: false,
            hidden: false,
            color: Some("00FF00".to_string()),
            underline: Some("single".to_string()),
        };
        let run = new_run("x", &props);
        assert_eq!(RunProps::from_run(&run), props);
    }

    #[test]
    fn test_toggle_off_value() {
        let run = XmlElement::new("w:r").with_child(
            XmlElement::new("w:rPr").with_child(XmlElement::new("w:b").with_attribute("w:val", "0")),
        );
        assert!(!RunProps::from_run(&run).bold);
    }

    #[test]
    fn test_whitespace_is_preserved() {
        let run = new_run(" GENERATED", &RunProps::default());
        let t = run.child("w:t").unwrap();
        assert_eq!(t.get_attribute("xml:space"), Some("preserve"));
        assert_eq!(paragraph_text(&run), " GENERATED");
    }

    #[test]
    fn test_append_run_keeps_hidden_flag() {
        let mut p = text_paragraph("name", None, &RunProps::default());
        hide_runs(&mut p);
        append_run(&mut p, ".END");
        assert_eq!(paragraph_text(&p), "name.END");
        let last = p.elements_named("w:r").last().unwrap();
        assert!(last.child("w:rPr").unwrap().child("w:vanish").is_some());
    }
}
