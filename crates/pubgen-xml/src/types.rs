/*
 * types.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Core types for editable XML trees.

/// A parsed XML part.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// The root element of the document.
    pub root: XmlElement,
}

/// An XML element.
///
/// Children keep their document order, including text nodes, so that a
/// parsed part serializes back to an equivalent document.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// The local name of the element (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any (e.g., "w" in `<w:p>`).
    pub prefix: Option<String>,

    /// Attributes of this element, in source order.
    pub attributes: Vec<XmlAttribute>,

    /// Child content of this element.
    pub children: Vec<XmlChild>,
}

/// An XML attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    /// The local name of the attribute (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any.
    pub prefix: Option<String>,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

/// A single child of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlChild {
    /// A child element.
    Element(XmlElement),

    /// Text content (after unescaping XML entities).
    Text(String),
}

/// Split `w:p` into `(Some("w"), "p")`.
pub(crate) fn split_qualified(qname: &str) -> (Option<String>, String) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, qname.to_string()),
    }
}

fn matches_qualified(prefix: &Option<String>, name: &str, qname: &str) -> bool {
    match (prefix, qname.split_once(':')) {
        (Some(p), Some((qp, ql))) => p == qp && name == ql,
        (None, None) => name == qname,
        _ => false,
    }
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }
}

impl XmlAttribute {
    pub fn new(qname: &str, value: impl Into<String>) -> Self {
        let (prefix, name) = split_qualified(qname);
        Self {
            name,
            prefix,
            value: value.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name),
            None => self.name.clone(),
        }
    }

    pub fn is(&self, qname: &str) -> bool {
        matches_qualified(&self.prefix, &self.name, qname)
    }
}

impl XmlElement {
    /// Create an empty element from its qualified name.
    pub fn new(qname: &str) -> Self {
        let (prefix, name) = split_qualified(qname);
        Self {
            name,
            prefix,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`XmlElement::set_attribute`].
    pub fn with_attribute(mut self, qname: &str, value: impl Into<String>) -> Self {
        self.set_attribute(qname, value);
        self
    }

    /// Builder form of [`XmlElement::push_element`].
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.push_element(child);
        self
    }

    /// Builder form of [`XmlElement::push_text`].
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name),
            None => self.name.clone(),
        }
    }

    /// Check the qualified name of this element.
    pub fn is(&self, qname: &str) -> bool {
        matches_qualified(&self.prefix, &self.name, qname)
    }

    pub fn get_attribute(&self, qname: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.is(qname))
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, qname: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.is(qname)) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(XmlAttribute::new(qname, value)),
        }
    }

    pub fn remove_attribute(&mut self, qname: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.is(qname))?;
        Some(self.attributes.remove(pos).value)
    }

    pub fn push_element(&mut self, child: XmlElement) {
        self.children.push(XmlChild::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlChild::Text(text.into()));
    }

    /// Check if this element has no children at all.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterate over child elements, skipping text nodes.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlChild::Element(e) => Some(e),
            XmlChild::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlChild::Element(e) => Some(e),
            XmlChild::Text(_) => None,
        })
    }

    /// Iterate over child elements with the given qualified name.
    pub fn elements_named<'a>(&'a self, qname: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.is(qname))
    }

    pub fn elements_named_mut<'a>(
        &'a mut self,
        qname: &'a str,
    ) -> impl Iterator<Item = &'a mut XmlElement> {
        self.elements_mut().filter(move |e| e.is(qname))
    }

    /// First child element with the given qualified name.
    pub fn child(&self, qname: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(qname))
    }

    pub fn child_mut(&mut self, qname: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.is(qname))
    }

    /// Return the named child, inserting an empty one at the front if absent.
    ///
    /// Property elements (`w:pPr`, `w:rPr`, `w:tcPr`) must come first in
    /// their parent, hence the insertion point.
    pub fn first_child_or_insert(&mut self, qname: &str) -> &mut XmlElement {
        let pos = match self.children.iter().position(|c| is_element_named(c, qname)) {
            Some(pos) => pos,
            None => {
                self.children.insert(0, XmlChild::Element(XmlElement::new(qname)));
                0
            }
        };
        match &mut self.children[pos] {
            XmlChild::Element(e) => e,
            XmlChild::Text(_) => unreachable!("position matched an element"),
        }
    }

    /// Return the named child, appending an empty one if absent.
    pub fn child_or_append(&mut self, qname: &str) -> &mut XmlElement {
        let pos = match self.children.iter().position(|c| is_element_named(c, qname)) {
            Some(pos) => pos,
            None => {
                self.children.push(XmlChild::Element(XmlElement::new(qname)));
                self.children.len() - 1
            }
        };
        match &mut self.children[pos] {
            XmlChild::Element(e) => e,
            XmlChild::Text(_) => unreachable!("position matched an element"),
        }
    }

    /// Remove every direct child element with the given qualified name.
    pub fn remove_children(&mut self, qname: &str) {
        self.children.retain(|c| !is_element_named(c, qname));
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlChild::Text(t) => Some(t.as_str()),
                XmlChild::Element(_) => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlChild::Text(text.into())];
    }

    /// Concatenated text of all descendant elements named `qname`, in document order.
    pub fn descendant_text(&self, qname: &str) -> String {
        let mut out = String::new();
        self.collect_text(qname, &mut out);
        out
    }

    fn collect_text(&self, qname: &str, out: &mut String) {
        for child in self.elements() {
            if child.is(qname) {
                out.push_str(&child.text());
            } else {
                child.collect_text(qname, out);
            }
        }
    }

    /// Visit every descendant element, depth first.
    pub fn for_each_descendant_mut(&mut self, f: &mut dyn FnMut(&mut XmlElement)) {
        for child in self.elements_mut() {
            f(child);
            child.for_each_descendant_mut(f);
        }
    }
}

fn is_element_named(child: &XmlChild, qname: &str) -> bool {
    matches!(child, XmlChild::Element(e) if e.is(qname))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_names() {
        let el = XmlElement::new("w:p");
        assert_eq!(el.prefix.as_deref(), Some("w"));
        assert_eq!(el.name, "p");
        assert!(el.is("w:p"));
        assert!(!el.is("p"));
        assert!(!el.is("w:r"));
        assert_eq!(el.qualified_name(), "w:p");
    }

    #[test]
    fn test_set_attribute_replaces() {
        let mut el = XmlElement::new("c").with_attribute("r", "A1");
        el.set_attribute("r", "A2");
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.get_attribute("r"), Some("A2"));
        assert_eq!(el.remove_attribute("r").as_deref(), Some("A2"));
        assert_eq!(el.get_attribute("r"), None);
    }

    #[test]
    fn test_first_child_or_insert_goes_first() {
        let mut run = XmlElement::new("w:r").with_child(XmlElement::new("w:t").with_text("x"));
        run.first_child_or_insert("w:rPr")
            .push_element(XmlElement::new("w:b"));
        let names: Vec<_> = run.elements().map(|e| e.qualified_name()).collect();
        assert_eq!(names, vec!["w:rPr", "w:t"]);

        // Second call finds the existing child
        run.first_child_or_insert("w:rPr")
            .push_element(XmlElement::new("w:i"));
        assert_eq!(run.elements_named("w:rPr").count(), 1);
        assert_eq!(run.child("w:rPr").unwrap().elements().count(), 2);
    }

    #[test]
    fn test_descendant_text_skips_other_elements() {
        let p = XmlElement::new("w:p")
            .with_child(
                XmlElement::new("w:r")
                    .with_child(XmlElement::new("w:rPr").with_child(XmlElement::new("w:b")))
                    .with_child(XmlElement::new("w:t").with_text("Hello ")),
            )
            .with_child(
                XmlElement::new("w:hyperlink").with_child(
                    XmlElement::new("w:r").with_child(XmlElement::new("w:t").with_text("world")),
                ),
            );
        assert_eq!(p.descendant_text("w:t"), "Hello world");
    }

    #[test]
    fn test_remove_children() {
        let mut el = XmlElement::new("row")
            .with_child(XmlElement::new("c"))
            .with_text(" ")
            .with_child(XmlElement::new("c"))
            .with_child(XmlElement::new("extLst"));
        el.remove_children("c");
        assert_eq!(el.elements().count(), 1);
        assert_eq!(el.children.len(), 2);
    }
}
