/*
 * package.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Office Open XML packages: zip containers of XML parts.

use crate::error::{Result, WriterError};
use pubgen_xml::{XmlDocument, XmlElement, parse};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES: &str = "[Content_Types].xml";

const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// The parts of a package, in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self> {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            parts.push((name, bytes));
        }
        tracing::debug!("Read {} parts from {}", parts.len(), path.display());
        Ok(Self { parts })
    }

    /// Build a package from literal parts.
    pub fn from_parts(parts: &[(&str, &str)]) -> Self {
        Self {
            parts: parts
                .iter()
                .map(|(name, content)| (name.to_string(), content.as_bytes().to_vec()))
                .collect(),
        }
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn xml_part(&self, name: &str) -> Result<XmlDocument> {
        let bytes = self
            .part(name)
            .ok_or_else(|| WriterError::MissingPart(name.to_string()))?;
        parse(bytes).map_err(|e| WriterError::xml(name, e))
    }

    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = bytes,
            None => self.parts.push((name.to_string(), bytes)),
        }
    }

    pub fn set_xml_part(&mut self, name: &str, doc: &XmlDocument) -> Result<()> {
        let bytes = doc.to_bytes().map_err(|e| WriterError::xml(name, e))?;
        self.set_part(name, bytes);
        Ok(())
    }

    pub fn remove_part(&mut self, name: &str) -> bool {
        let before = self.parts.len();
        self.parts.retain(|(n, _)| n != name);
        before != self.parts.len()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = ZipWriter::new(File::create(path)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // Consumers expect the content types first
        let ordered = self
            .parts
            .iter()
            .filter(|(n, _)| n == CONTENT_TYPES)
            .chain(self.parts.iter().filter(|(n, _)| n != CONTENT_TYPES));
        for (name, bytes) in ordered {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(bytes)?;
        }
        writer.finish()?;
        tracing::debug!("Saved {}", path.display());
        Ok(())
    }
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// The relationships of one part.
#[derive(Debug, Clone)]
pub struct Relationships {
    path: String,
    doc: XmlDocument,
}

impl Relationships {
    /// Load the relationships of `part`, or start an empty set.
    pub fn load(package: &Package, part: &str) -> Result<Self> {
        let path = rels_path_for(part);
        let doc = if package.has_part(&path) {
            package.xml_part(&path)?
        } else {
            XmlDocument::new(
                XmlElement::new("Relationships").with_attribute("xmlns", RELATIONSHIPS_NS),
            )
        };
        Ok(Self { path, doc })
    }

    /// Target of the relationship with the given id.
    pub fn target(&self, id: &str) -> Option<&str> {
        self.doc
            .root
            .elements_named("Relationship")
            .find(|r| r.get_attribute("Id") == Some(id))
            .and_then(|r| r.get_attribute("Target"))
    }

    /// Target of the first relationship of the given type.
    pub fn target_of_type(&self, rel_type: &str) -> Option<&str> {
        self.doc
            .root
            .elements_named("Relationship")
            .find(|r| r.get_attribute("Type") == Some(rel_type))
            .and_then(|r| r.get_attribute("Target"))
    }

    fn next_id(&self) -> String {
        let max = self
            .doc
            .root
            .elements_named("Relationship")
            .filter_map(|r| r.get_attribute("Id"))
            .filter_map(|id| id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// Add a relationship and return its id.
    pub fn add(&mut self, rel_type: &str, target: &str, external: bool) -> String {
        let id = self.next_id();
        let mut rel = XmlElement::new("Relationship")
            .with_attribute("Id", id.as_str())
            .with_attribute("Type", rel_type)
            .with_attribute("Target", target);
        if external {
            rel.set_attribute("TargetMode", "External");
        }
        self.doc.root.push_element(rel);
        id
    }

    /// Drop every relationship pointing at `target`.
    pub fn remove_target(&mut self, target: &str) {
        self.doc
            .root
            .children
            .retain(|c| !matches!(c, pubgen_xml::XmlChild::Element(e) if e.get_attribute("Target") == Some(target)));
    }

    pub fn save(&self, package: &mut Package) -> Result<()> {
        package.set_xml_part(&self.path, &self.doc)
    }
}

/// Register a part override in `[Content_Types].xml`.
pub fn add_content_type_override(
    package: &mut Package,
    part: &str,
    content_type: &str,
) -> Result<()> {
    let mut doc = package.xml_part(CONTENT_TYPES)?;
    let part_name = format!("/{}", part);
    let exists = doc
        .root
        .elements_named("Override")
        .any(|o| o.get_attribute("PartName") == Some(part_name.as_str()));
    if !exists {
        doc.root.push_element(
            XmlElement::new("Override")
                .with_attribute("PartName", part_name.as_str())
                .with_attribute("ContentType", content_type),
        );
    }
    package.set_xml_part(CONTENT_TYPES, &doc)
}

pub fn remove_content_type_override(package: &mut Package, part: &str) -> Result<()> {
    let mut doc = package.xml_part(CONTENT_TYPES)?;
    let part_name = format!("/{}", part);
    doc.root.children.retain(|c| {
        !matches!(c, pubgen_xml::XmlChild::Element(e)
            if e.is("Override") && e.get_attribute("PartName") == Some(part_name.as_str()))
    });
    package.set_xml_part(CONTENT_TYPES, &doc)
}

/// A minimal `[Content_Types].xml` with the given overrides.
pub fn content_types_xml(overrides: &[(&str, &str)]) -> String {
    let mut xml = format!(
        "<Types xmlns=\"{}\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
        CONTENT_TYPES_NS
    );
    for (part, content_type) in overrides {
        xml.push_str(&format!(
            "<Override PartName=\"/{}\" ContentType=\"{}\"/>",
            part, content_type
        ));
    }
    xml.push_str("</Types>");
    xml
}

/// A `.rels` part with the given `(id, type, target)` relationships.
pub fn relationships_xml(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = format!("<Relationships xmlns=\"{}\">", RELATIONSHIPS_NS);
    for (id, rel_type, target) in rels {
        xml.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"/>",
            id, rel_type, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_path_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(rels_path_for("root.xml"), "_rels/root.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/workbook.xml", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("xl/worksheets/sheet1.xml", "../styles.xml"), "xl/styles.xml");
    }

    #[test]
    fn test_relationship_ids_increase() {
        let package = Package::from_parts(&[(
            "word/_rels/document.xml.rels",
            &relationships_xml(&[("rId3", "t", "styles.xml")]),
        )]);
        let mut rels = Relationships::load(&package, "word/document.xml").unwrap();
        assert_eq!(rels.target("rId3"), Some("styles.xml"));
        let id = rels.add("hyperlink", "https://example.org", true);
        assert_eq!(id, "rId4");
        assert_eq!(rels.target("rId4"), Some("https://example.org"));
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.zip");
        let mut package = Package::from_parts(&[
            ("a/b.xml", "<b/>"),
            (CONTENT_TYPES, &content_types_xml(&[])),
        ]);
        add_content_type_override(&mut package, "a/b.xml", "application/test+xml").unwrap();
        package.save(&path).unwrap();

        let reopened = Package::open(&path).unwrap();
        assert_eq!(reopened.part("a/b.xml"), Some(&b"<b/>"[..]));
        let types = reopened.xml_part(CONTENT_TYPES).unwrap();
        assert_eq!(types.root.elements_named("Override").count(), 1);

        let mut package = reopened;
        remove_content_type_override(&mut package, "a/b.xml").unwrap();
        let types = package.xml_part(CONTENT_TYPES).unwrap();
        assert_eq!(types.root.elements_named("Override").count(), 0);
        assert!(package.remove_part("a/b.xml"));
        assert!(!package.has_part("a/b.xml"));
    }
}
