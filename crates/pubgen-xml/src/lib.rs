/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Mutable XML element trees for office document parts.
//!
//! This crate wraps [`quick-xml`] to turn a part of an OOXML package
//! (`word/document.xml`, `xl/worksheets/sheet1.xml`, ...) into a tree of
//! [`XmlElement`]s that can be searched, edited in place and written back.
//!
//! Names are kept qualified: an element parsed from `<w:p>` has
//! `prefix == Some("w")` and `name == "p"`, and every lookup helper takes the
//! qualified form (`"w:p"`). Namespace declarations are ordinary attributes, so
//! a round trip reproduces them untouched.
//!
//! # Example
//!
//! ```rust
//! use pubgen_xml::{XmlElement, parse};
//!
//! let mut doc = parse(br#"<w:body><w:p><w:r><w:t>Hello</w:t></w:r></w:p></w:body>"#).unwrap();
//! assert_eq!(doc.root.descendant_text("w:t"), "Hello");
//!
//! doc.root.push_element(XmlElement::new("w:p"));
//! assert_eq!(doc.root.elements_named("w:p").count(), 2);
//!
//! let bytes = doc.to_bytes().unwrap();
//! assert!(String::from_utf8(bytes).unwrap().ends_with("<w:p/></w:body>"));
//! ```

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use parser::parse;
pub use types::{XmlAttribute, XmlChild, XmlDocument, XmlElement};
