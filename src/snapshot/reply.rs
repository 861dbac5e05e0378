//! Device reply documents
//!
//! Replies are small trees of named elements. They are parsed from the
//! device's XML, inspected for embedded errors and written back out in a
//! canonical form so that identical replies always produce identical bytes.

use std::fmt;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::common::{Error, Result};

/// A node inside an element: either a child element or a run of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A named element with ordered attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Append a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Append a text node
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Append an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Name without any namespace prefix (`xnm:error` -> `error`)
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Child elements, skipping text
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of this element's direct text children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// This element and all of its descendants in document order
    pub fn descendants_and_self(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Element>) {
        out.push(self);
        for child in self.child_elements() {
            child.collect_into(out);
        }
    }

    /// First descendant (excluding self) with the given local name
    pub fn find_descendant(&self, local_name: &str) -> Option<&Element> {
        self.descendants_and_self()
            .into_iter()
            .skip(1)
            .find(|e| e.local_name() == local_name)
    }

    /// Nesting depth; a leaf element has depth 1
    pub fn depth(&self) -> usize {
        1 + self.child_elements().map(Element::depth).max().unwrap_or(0)
    }

    /// Canonical serialized form
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_xml(out),
                Node::Text(t) => out.push_str(&escape(t.as_str())),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Parse an XML document into its root element
    ///
    /// Whitespace-only text is dropped. Declarations, comments and
    /// processing instructions are ignored.
    pub fn parse(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::ReplyParse("unexpected closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(text.unescape()?.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = data.into_inner();
                        parent
                            .children
                            .push(Node::Text(String::from_utf8_lossy(&raw).into_owned()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::ReplyParse(format!("unclosed element <{}>", open.name)));
        }
        root.ok_or_else(|| Error::ReplyParse("document has no root element".to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        element.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            attr.unescape_value()?.into_owned(),
        ));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::ReplyParse(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

/// Reply returned by a device session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A structured reply document
    Document(Element),
    /// Text output was requested but the device had nothing to return
    Absent,
}

impl Reply {
    /// Parse an XML reply
    pub fn from_xml(xml: &str) -> Result<Self> {
        Element::parse(xml).map(Reply::Document)
    }

    /// Wrap plain-text command output the way devices return it
    pub fn text_output(text: impl Into<String>) -> Self {
        Reply::Document(Element::new("output").with_text(text))
    }

    /// The reply document, if there is one
    pub fn document(&self) -> Option<&Element> {
        match self {
            Reply::Document(e) => Some(e),
            Reply::Absent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_self_closes_empty_elements() {
        let e = Element::new("a").with_child(Element::new("b"));
        assert_eq!(e.to_xml(), "<a><b/></a>");
    }

    #[test]
    fn test_serialize_escapes_text_and_attributes() {
        let e = Element::new("output")
            .with_attribute("note", "a\"b")
            .with_text("x < y & z");
        assert_eq!(
            e.to_xml(),
            "<output note=\"a&quot;b\">x &lt; y &amp; z</output>"
        );
    }

    #[test]
    fn test_parse_nested_document() {
        let xml = r#"<?xml version="1.0"?>
<rpc-reply xmlns:junos="http://xml.juniper.net/junos/">
  <software-information>
    <host-name>r1</host-name>
    <product-model junos:style="brief">mx960</product-model>
  </software-information>
</rpc-reply>"#;
        let root = Element::parse(xml).unwrap();
        assert_eq!(root.name, "rpc-reply");
        let model = root.find_descendant("product-model").unwrap();
        assert_eq!(model.text(), "mx960");
        assert_eq!(
            model.attributes,
            vec![("junos:style".to_string(), "brief".to_string())]
        );
        assert_eq!(root.depth(), 3);
    }

    #[test]
    fn test_parse_then_serialize_is_stable() {
        let xml = "<a x=\"1\"><b>t &amp; u</b><c/></a>";
        let root = Element::parse(xml).unwrap();
        assert_eq!(root.to_xml(), xml);
    }

    #[test]
    fn test_parse_rejects_unclosed_document() {
        assert!(Element::parse("<a><b></b>").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_document() {
        assert!(matches!(Element::parse("   "), Err(Error::ReplyParse(_))));
    }

    #[test]
    fn test_descendants_are_in_document_order() {
        let root = Element::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<&str> = root
            .descendants_and_self()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_local_name_strips_prefix() {
        assert_eq!(Element::new("xnm:error").local_name(), "error");
        assert_eq!(Element::new("rpc-error").local_name(), "rpc-error");
    }

    #[test]
    fn test_text_output_wraps_in_output_element() {
        let reply = Reply::text_output("Hostname: r1");
        assert_eq!(
            reply.document().unwrap().to_xml(),
            "<output>Hostname: r1</output>"
        );
    }
}
