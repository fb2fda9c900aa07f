//! A small element tree standing in for the browser document.
//!
//! Only what the page needs is modelled: elements with an optional id and
//! attributes, text nodes, lookup by id, text content, and HTML
//! serialization. Text is always stored verbatim and escaped on output, so
//! nothing placed in a text node is ever interpreted as markup.

use std::sync::Arc;

use tokio::sync::Mutex;

pub type SharedDocument = Arc<Mutex<Document>>;

const VOID_ELEMENTS: [&str; 4] = ["meta", "link", "br", "hr"];

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    tag: String,
    id: Option<String>,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.set_text_content(text);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.append_child(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn append_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    /// Replaces every child with a single text node (or nothing, for an empty
    /// string), the same way assigning `textContent` does.
    pub fn set_text_content(&mut self, text: &str) {
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Depth-first search including `self`.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.child_elements().find_map(|e| e.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        for child in self.children.iter_mut() {
            if let Node::Element(e) = child {
                if let Some(found) = e.find_by_id_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Descendants (not `self`) with the given tag, in document order.
    pub fn descendants_by_tag(&self, tag: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_by_tag(tag, &mut out);
        out
    }

    fn collect_by_tag<'a>(&'a self, tag: &str, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            if child.tag == tag {
                out.push(child);
            }
            child.collect_by_tag(tag, out);
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        if let Some(id) = &self.id {
            out.push_str(&format!(" id=\"{}\"", escape_attribute(id)));
        }
        for (name, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&self.tag.as_str()) {
            return;
        }
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(&escape_text(t)),
                Node::Element(e) => e.write_html(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<&Element> {
        self.root.find_by_id(id)
    }

    pub fn get_element_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.root.find_by_id_mut(id)
    }

    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn to_html(&self) -> String {
        format!("<!DOCTYPE html>\n{}\n", self.root.to_html())
    }
}

pub fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
