//! Owned XML element tree
//!
//! Source systems that speak XML (campus information system, MAB exports,
//! MARCXML from the registry) are parsed into this tree before conversion.
//! Namespaces are dropped; elements and attributes are addressed by local name.

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{ConvertError, ConvertResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> ConvertResult<Element> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => stack.push(Self::from_start(&start)?),
                Ok(Event::Empty(start)) => {
                    let element = Self::from_start(&start)?;
                    Self::attach(&mut stack, &mut root, element);
                }
                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        Self::attach(&mut stack, &mut root, element);
                    }
                }
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(xml_error)?;
                    if let Some(current) = stack.last_mut() {
                        current.push_text(&text);
                    }
                }
                Ok(Event::CData(data)) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    if let Some(current) = stack.last_mut() {
                        current.push_text(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(xml_error(e)),
            }
        }

        if !stack.is_empty() {
            return Err(ConvertError::Xml("unexpected end of document".into()));
        }
        root.ok_or_else(|| ConvertError::Xml("document has no root element".into()))
    }

    fn from_start(start: &BytesStart) -> ConvertResult<Element> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut element = Element::new(name);

        for attr in start.attributes() {
            let attr = attr.map_err(xml_error)?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(xml_error)?.into_owned();
            element.attributes.insert(key, value);
        }

        Ok(element)
    }

    fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => {
                if root.is_none() {
                    *root = Some(element);
                }
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Element text, empty when the element has none
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Depth-first search for the first descendant (or self) named `name`
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Depth-first search for an `attr` element with the given `key` attribute
    pub fn find_attr(&self, key: &str) -> Option<&Element> {
        if self.name == "attr" && self.attr("key") == Some(key) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_attr(key))
    }

    /// Key used for dispatch: `attr` elements are keyed by their `key`
    /// attribute, every other element by its local name
    pub fn dispatch_key(&self) -> &str {
        if self.name == "attr" {
            if let Some(key) = self.attr("key") {
                return key;
            }
        }
        &self.name
    }

    /// Children paired with their dispatch keys, in document order
    pub fn entries(&self) -> Vec<(&str, &Element)> {
        self.children.iter().map(|c| (c.dispatch_key(), c)).collect()
    }
}

fn xml_error(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::Xml(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const THESIS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bas:thesis xmlns:bas="http://www.campusonline.at/thesisservice/basetypes">
  <bas:attr key="ID">4711</bas:attr>
  <bas:attr key="VOLLTEXT">J</bas:attr>
  <bas:metaclass>
    <bas:name>AUTHOR</bas:name>
    <bas:metaobj><bas:attr key="FN">Ada</bas:attr></bas:metaobj>
  </bas:metaclass>
  <bas:attr key="ORGP">TU &amp; Co</bas:attr>
</bas:thesis>"#;

    #[test]
    fn test_parse_drops_namespaces() {
        let root = Element::parse(THESIS).unwrap();
        assert_eq!(root.name, "thesis");
        assert!(root.attributes.is_empty());
        assert_eq!(root.children.len(), 4);
    }

    #[test]
    fn test_dispatch_keys_in_document_order() {
        let root = Element::parse(THESIS).unwrap();
        let keys: Vec<&str> = root.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["ID", "VOLLTEXT", "metaclass", "ORGP"]);
    }

    #[test]
    fn test_find_attr_and_unescape() {
        let root = Element::parse(THESIS).unwrap();
        assert_eq!(root.find_attr("VOLLTEXT").map(Element::text), Some("J"));
        assert_eq!(root.find_attr("FN").map(Element::text), Some("Ada"));
        assert_eq!(root.find_attr("ORGP").map(Element::text), Some("TU & Co"));
        assert!(root.find_attr("SPBIS").is_none());
    }

    #[test]
    fn test_rejects_unbalanced_document() {
        assert!(Element::parse("<a><b></b>").is_err());
        assert!(Element::parse("").is_err());
    }
}
