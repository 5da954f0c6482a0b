/*
 * document.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The main part of a word-processing package and positional access to
//! its body.

use crate::error::{Result, WriterError};
use crate::ooxml::package::{
    CONTENT_TYPES, Package, Relationships, content_types_xml, relationships_xml, resolve_target,
};
use super::mark::END_TAG;
use crate::ooxml::wordml::{HYPERLINK_REL, paragraph_text, table_mark_text};
use pubgen_xml::{XmlChild, XmlDocument, XmlElement};
use std::path::Path;

const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const STYLES_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const DOCUMENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const STYLES_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";

const DOCUMENT_XML: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body><w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

const STYLES_XML: &str = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:rPr><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="48"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="200"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="200"/><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:sz w:val="24"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading4"><w:name w:val="heading 4"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:outlineLvl w:val="3"/></w:pPr><w:rPr><w:b/><w:i/></w:rPr></w:style><w:style w:type="character" w:styleId="Hyperlink"><w:name w:val="Hyperlink"/><w:rPr><w:color w:val="0563C1"/><w:u w:val="single"/></w:rPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/></w:tblBorders></w:tblPr></w:style></w:styles>"#;

/// An open word-processing package.
#[derive(Debug)]
pub struct WordDocument {
    package: Package,
    part: String,
    doc: XmlDocument,
    rels: Relationships,
}

impl WordDocument {
    /// An empty document with the heading, table and hyperlink styles.
    pub fn fresh() -> Result<Self> {
        let content_types = content_types_xml(&[
            ("word/document.xml", DOCUMENT_TYPE),
            ("word/styles.xml", STYLES_TYPE),
        ]);
        let root_rels = relationships_xml(&[("rId1", OFFICE_DOCUMENT_REL, "word/document.xml")]);
        let document_rels = relationships_xml(&[("rId1", STYLES_REL, "styles.xml")]);
        let package = Package::from_parts(&[
            (CONTENT_TYPES, &content_types),
            ("_rels/.rels", &root_rels),
            ("word/document.xml", DOCUMENT_XML),
            ("word/_rels/document.xml.rels", &document_rels),
            ("word/styles.xml", STYLES_XML),
        ]);
        Self::from_package(package)
    }

    pub fn open(path: &Path) -> Result<Self> {
        Self::from_package(Package::open(path)?)
    }

    fn from_package(package: Package) -> Result<Self> {
        let root_rels = Relationships::load(&package, "")?;
        let part = root_rels
            .target_of_type(OFFICE_DOCUMENT_REL)
            .map(|t| resolve_target("", t))
            .filter(|p| package.has_part(p))
            .unwrap_or_else(|| "word/document.xml".to_string());
        let doc = package.xml_part(&part)?;
        if doc.root.child("w:body").is_none() {
            return Err(WriterError::InvalidDocument(format!("{} has no body", part)));
        }
        let rels = Relationships::load(&package, &part)?;
        Ok(Self {
            package,
            part,
            doc,
            rels,
        })
    }

    pub fn body(&self) -> Result<&XmlElement> {
        self.doc
            .root
            .child("w:body")
            .ok_or_else(|| WriterError::InvalidDocument(format!("{} has no body", self.part)))
    }

    pub fn body_mut(&mut self) -> Result<&mut XmlElement> {
        let part = &self.part;
        self.doc
            .root
            .child_mut("w:body")
            .ok_or_else(|| WriterError::InvalidDocument(format!("{} has no body", part)))
    }

    /// Register an external link target and return its relationship id.
    pub fn add_hyperlink(&mut self, url: &str) -> String {
        self.rels.add(HYPERLINK_REL, url, true)
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.package.set_xml_part(&self.part, &self.doc)?;
        self.rels.save(&mut self.package)?;
        self.package.save(path)
    }
}

pub(crate) fn element_at(body: &XmlElement, index: usize) -> Option<&XmlElement> {
    match body.children.get(index) {
        Some(XmlChild::Element(e)) => Some(e),
        _ => None,
    }
}

pub(crate) fn element_mut(body: &mut XmlElement, index: usize) -> Option<&mut XmlElement> {
    match body.children.get_mut(index) {
        Some(XmlChild::Element(e)) => Some(e),
        _ => None,
    }
}

/// Whether paragraph text starts with `mark` as a whole word: the mark is
/// followed by nothing, whitespace or [`END_TAG`]. `#bib` does not match
/// `#bibtexlist`.
pub(crate) fn starts_with_mark(text: &str, mark: &str) -> bool {
    text.strip_prefix(mark).is_some_and(|rest| {
        rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with(END_TAG)
    })
}

/// Position of the first body paragraph at or after `from` whose text
/// starts with `mark`, as [`starts_with_mark`] decides.
pub(crate) fn find_paragraph(body: &XmlElement, from: usize, mark: &str) -> Option<usize> {
    body.children
        .iter()
        .enumerate()
        .skip(from)
        .find_map(|(index, child)| match child {
            XmlChild::Element(e) if e.is("w:p") && starts_with_mark(&paragraph_text(e), mark) => {
                Some(index)
            }
            _ => None,
        })
}

/// Position of the first body table whose first cell starts with `prefix`.
/// The hidden mark run is directly followed by the header text, so this is
/// a plain prefix match.
pub(crate) fn find_table(body: &XmlElement, prefix: &str) -> Option<usize> {
    body.children
        .iter()
        .position(|child| match child {
            XmlChild::Element(e) if e.is("w:tbl") => {
                table_mark_text(e).is_some_and(|text| text.starts_with(prefix))
            }
            _ => false,
        })
}

/// Where appended content goes: before the final section properties.
pub(crate) fn content_end(body: &XmlElement) -> usize {
    body.children
        .iter()
        .rposition(|c| matches!(c, XmlChild::Element(e) if e.is("w:sectPr")))
        .unwrap_or(body.children.len())
}

pub(crate) fn insert_at(body: &mut XmlElement, index: usize, element: XmlElement) {
    let index = index.min(body.children.len());
    body.children.insert(index, XmlChild::Element(element));
}

/// Append to the body and return the new element's position.
pub(crate) fn append_to_body(body: &mut XmlElement, element: XmlElement) -> usize {
    let index = content_end(body);
    insert_at(body, index, element);
    index
}

pub(crate) fn remove_at(body: &mut XmlElement, index: usize) -> Option<XmlElement> {
    if index >= body.children.len() {
        return None;
    }
    match body.children.remove(index) {
        XmlChild::Element(e) => Some(e),
        XmlChild::Text(_) => None,
    }
}
