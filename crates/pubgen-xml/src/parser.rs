/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! XML parser that builds editable element trees.

use crate::types::split_qualified;
use crate::{Error, Result, XmlAttribute, XmlChild, XmlDocument, XmlElement};
use quick_xml::Reader;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};

/// Parse an XML part, producing an [`XmlDocument`].
///
/// # Example
///
/// ```rust
/// use pubgen_xml::parse;
///
/// let xml = parse(b"<root><child/></root>").unwrap();
/// assert_eq!(xml.root.name, "root");
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn parse(content: &[u8]) -> Result<XmlDocument> {
    let mut parser = XmlParser::new(content);
    parser.parse()
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Stack of elements being built.
    stack: Vec<XmlElement>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            reader,
            stack: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<XmlDocument> {
        let mut root: Option<XmlElement> = None;

        loop {
            let event_start = self.reader.buffer_position();

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = self.handle_start(&e)?;
                    self.stack.push(element);
                }
                Ok(Event::End(e)) => {
                    let element = self.handle_end(e)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Empty(e)) => {
                    let element = self.handle_start(&e)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Text(e)) => {
                    self.handle_text(e, event_start)?;
                }
                Ok(Event::CData(e)) => {
                    self.handle_cdata(e);
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {
                    // The writer emits its own declaration
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", node.qualified_name()),
            });
        }

        root.map(XmlDocument::new).ok_or(Error::EmptyDocument)
    }

    fn attach(&mut self, element: XmlElement, root: &mut Option<XmlElement>) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.push_element(element);
                Ok(())
            }
            None if root.is_some() => Err(Error::MultipleRoots),
            None => {
                *root = Some(element);
                Ok(())
            }
        }
    }

    fn handle_start(&self, e: &BytesStart<'_>) -> Result<XmlElement> {
        let full_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let (prefix, name) = split_qualified(&full_name);

        let mut attributes = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value().map_err(|err| Error::XmlSyntax {
                message: format!("Invalid attribute value: {}", err),
                position: Some(self.reader.buffer_position()),
            })?;
            attributes.push(XmlAttribute::new(&key, value.into_owned()));
        }

        Ok(XmlElement {
            name,
            prefix,
            attributes,
            children: Vec::new(),
        })
    }

    fn handle_end(&mut self, e: BytesEnd<'_>) -> Result<XmlElement> {
        let end_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

        let node = self
            .stack
            .pop()
            .ok_or_else(|| Error::UnexpectedEndTag(end_name.clone()))?;

        if node.qualified_name() != end_name {
            return Err(Error::MismatchedEndTag {
                expected: node.qualified_name(),
                found: end_name,
            });
        }

        Ok(node)
    }

    fn handle_text(&mut self, e: BytesText<'_>, event_start: u64) -> Result<()> {
        let text = e.unescape().map_err(|err| Error::XmlSyntax {
            message: format!("Invalid text content: {}", err),
            position: Some(event_start),
        })?;

        if let Some(node) = self.stack.last_mut() {
            // Indentation between elements carries no content
            if text.trim().is_empty() && !node.children.is_empty() {
                return Ok(());
            }
            node.children.push(XmlChild::Text(text.into_owned()));
        }
        Ok(())
    }

    fn handle_cdata(&mut self, e: BytesCData<'_>) {
        let text = String::from_utf8_lossy(e.as_ref()).to_string();
        if let Some(node) = self.stack.last_mut() {
            node.children.push(XmlChild::Text(text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_element() {
        let xml = parse(b"<root/>").unwrap();
        assert_eq!(xml.root.name, "root");
        assert!(xml.root.is_empty());
    }

    #[test]
    fn test_parse_nested_elements() {
        let xml = parse(b"<root><child/></root>").unwrap();
        let children: Vec<_> = xml.root.elements().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "child");
    }

    #[test]
    fn test_parse_prefixed_names_and_attributes() {
        let xml = parse(br#"<w:p w:rsidR="00A1"><w:pPr><w:jc w:val="right"/></w:pPr></w:p>"#)
            .unwrap();
        assert!(xml.root.is("w:p"));
        assert_eq!(xml.root.get_attribute("w:rsidR"), Some("00A1"));
        let jc = xml.root.child("w:pPr").and_then(|ppr| ppr.child("w:jc")).unwrap();
        assert_eq!(jc.get_attribute("w:val"), Some("right"));
    }

    #[test]
    fn test_parse_text_unescapes_entities() {
        let xml = parse(b"<t>a &amp; b &lt; c</t>").unwrap();
        assert_eq!(xml.root.text(), "a & b < c");
    }

    #[test]
    fn test_preserved_space_text_is_kept() {
        let xml = parse(br#"<w:t xml:space="preserve"> </w:t>"#).unwrap();
        assert_eq!(xml.root.text(), " ");
    }

    #[test]
    fn test_indentation_between_elements_is_dropped() {
        let xml = parse(b"<root>\n  <a/>\n  <b/>\n</root>").unwrap();
        let names: Vec<_> = xml.root.elements().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["a", "b"]);
        // Only the leading indentation survives, as it precedes any element
        assert_eq!(xml.root.children.len(), 3);
    }

    #[test]
    fn test_declaration_is_skipped() {
        let xml = parse(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><root/>"#)
            .unwrap();
        assert_eq!(xml.root.name, "root");
    }

    #[test]
    fn test_mismatched_end_tag() {
        let err = parse(b"<a><b></a>").unwrap_err();
        assert!(
            matches!(err, Error::MismatchedEndTag { .. } | Error::XmlSyntax { .. }),
            "Got: {}",
            err
        );
    }

    #[test]
    fn test_unclosed_element() {
        let err = parse(b"<a><b/>").unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { .. }), "Got: {}", err);
    }

    #[test]
    fn test_empty_document() {
        let err = parse(b"").unwrap_err();
        assert!(matches!(err, Error::EmptyDocument), "Got: {}", err);
    }

    #[test]
    fn test_multiple_roots() {
        let err = parse(b"<a/><b/>").unwrap_err();
        assert!(matches!(err, Error::MultipleRoots), "Got: {}", err);
    }
}
