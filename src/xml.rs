//! Owned, mutable element tree for the parts that get rewritten.
//!
//! Read-only projections work directly on `roxmltree` nodes. Anything that
//! has to be edited (slides, `presentation.xml`, relationship and content-type
//! parts) is lifted into [`Element`], edited, and written back with
//! `quick-xml`.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::Error;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub name: String,
    /// Namespace declarations made on this element; `None` is the default namespace.
    pub declarations: Vec<(Option<String>, String)>,
    /// Attributes by qualified name, in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

pub fn parse(text: &str) -> Result<Element, Error> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let doc = roxmltree::Document::parse(text)?;
    Ok(Element::from_node(doc.root_element(), None))
}

fn prefix_for<'a>(node: roxmltree::Node<'a, 'a>, uri: &str, attribute: bool) -> Option<String> {
    if uri == XML_NS {
        return Some("xml".to_string());
    }
    // Attributes never take the default namespace, so only a named binding will do.
    node.namespaces()
        .filter(|ns| ns.uri() == uri)
        .find(|ns| !attribute || ns.name().is_some())
        .and_then(|ns| ns.name())
        .map(str::to_string)
}

impl Element {
    pub fn new(namespace: &str, prefix: Option<&str>, name: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
            declarations: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A new element in the same namespace and with the same prefix as `self`.
    pub fn sibling(&self, name: &str) -> Self {
        Self {
            prefix: self.prefix.clone(),
            namespace: self.namespace.clone(),
            name: name.to_string(),
            declarations: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn from_node<'a>(node: roxmltree::Node<'a, 'a>, parent: Option<roxmltree::Node<'a, 'a>>) -> Self {
        let namespace = node.tag_name().namespace().map(str::to_string);
        let prefix = namespace
            .as_deref()
            .and_then(|uri| prefix_for(node, uri, false));

        let declarations = node
            .namespaces()
            .filter(|ns| ns.name() != Some("xml"))
            .filter(|ns| {
                parent.is_none_or(|p| {
                    !p.namespaces()
                        .any(|pns| pns.name() == ns.name() && pns.uri() == ns.uri())
                })
            })
            .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
            .collect();

        let attributes = node
            .attributes()
            .map(|attr| {
                let qname = match attr.namespace().and_then(|uri| prefix_for(node, uri, true)) {
                    Some(p) => format!("{p}:{}", attr.name()),
                    None => attr.name().to_string(),
                };
                (qname, attr.value().to_string())
            })
            .collect();

        let children = node
            .children()
            .filter_map(|child| {
                if child.is_element() {
                    Some(XmlNode::Element(Element::from_node(child, Some(node))))
                } else if child.is_text() {
                    child.text().map(|t| XmlNode::Text(t.to_string()))
                } else {
                    None
                }
            })
            .collect();

        Self {
            prefix,
            namespace,
            name: node.tag_name().name().to_string(),
            declarations,
            attributes,
            children,
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    pub fn attr(&self, qname: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == qname)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, qname: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == qname) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((qname.to_string(), value)),
        }
    }

    pub fn with_attr(mut self, qname: &str, value: impl Into<String>) -> Self {
        self.set_attr(qname, value);
        self
    }

    pub fn declare(&mut self, prefix: Option<&str>, uri: &str) {
        if !self
            .declarations
            .iter()
            .any(|(p, _)| p.as_deref() == prefix)
        {
            self.declarations
                .push((prefix.map(str::to_string), uri.to_string()));
        }
    }

    /// The prefix this element declares for `uri`, if any.
    pub fn declared_prefix(&self, uri: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, u)| p.is_some() && u == uri)
            .and_then(|(p, _)| p.as_deref())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(namespace, name))
    }

    pub fn child_mut(&mut self, namespace: &str, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.is(namespace, name))
    }

    /// Index into `children` of the first element matching.
    pub fn position(&self, namespace: &str, name: &str) -> Option<usize> {
        self.children.iter().position(|c| match c {
            XmlNode::Element(e) => e.is(namespace, name),
            XmlNode::Text(_) => false,
        })
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn insert(&mut self, index: usize, child: Element) {
        self.children.insert(index, XmlNode::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Concatenated direct text children.
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    pub fn to_xml(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        self.write_to(&mut writer)?;
        Ok(writer.into_inner().into_inner())
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        let qname = self.qualified_name();
        let mut start = BytesStart::new(qname.as_str());
        for (prefix, uri) in &self.declarations {
            let key = match prefix {
                Some(p) => format!("xmlns:{p}"),
                None => "xmlns".to_string(),
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_to(writer)?,
                XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(qname.as_str())))?;
        Ok(())
    }
}
