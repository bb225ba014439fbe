//! Typed view over a DrawingML text body.
//!
//! A paragraph's children fall into a small closed set of kinds; everything
//! that reads or rewrites text goes through [`TextNode`] instead of matching
//! tag names ad hoc.

use crate::xml::Element;

use super::{DML_NS, dml};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextNode {
    Paragraph,
    ParagraphProperties,
    Run,
    RunProperties,
    EndParagraphProperties,
    Other,
}

impl TextNode {
    pub fn classify(namespace: Option<&str>, name: &str) -> Self {
        if namespace != Some(DML_NS) {
            return TextNode::Other;
        }
        match name {
            "p" => TextNode::Paragraph,
            "pPr" => TextNode::ParagraphProperties,
            "r" => TextNode::Run,
            "rPr" => TextNode::RunProperties,
            "endParaRPr" => TextNode::EndParagraphProperties,
            _ => TextNode::Other,
        }
    }

    pub fn of_node(node: roxmltree::Node) -> Self {
        if !node.is_element() {
            return TextNode::Other;
        }
        Self::classify(node.tag_name().namespace(), node.tag_name().name())
    }

    pub fn of_element(el: &Element) -> Self {
        Self::classify(el.namespace.as_deref(), &el.name)
    }
}

/// Read-only `p:txBody`.
#[derive(Clone, Copy)]
pub struct TextBody<'a> {
    node: roxmltree::Node<'a, 'a>,
}

impl<'a> TextBody<'a> {
    pub fn new(node: roxmltree::Node<'a, 'a>) -> Self {
        Self { node }
    }

    pub fn body_properties(&self) -> Option<roxmltree::Node<'a, 'a>> {
        dml(self.node, "bodyPr")
    }

    /// `a:lstStyle/a:lvl1pPr`, the placeholder's own level-one defaults.
    pub fn level1_properties(&self) -> Option<roxmltree::Node<'a, 'a>> {
        dml(self.node, "lstStyle").and_then(|l| dml(l, "lvl1pPr"))
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = Paragraph<'a>> + use<'a> {
        self.node
            .children()
            .filter(|n| TextNode::of_node(*n) == TextNode::Paragraph)
            .map(|node| Paragraph { node })
    }
}

#[derive(Clone, Copy)]
pub struct Paragraph<'a> {
    node: roxmltree::Node<'a, 'a>,
}

impl<'a> Paragraph<'a> {
    fn first(&self, kind: TextNode) -> Option<roxmltree::Node<'a, 'a>> {
        self.node.children().find(|n| TextNode::of_node(*n) == kind)
    }

    pub fn properties(&self) -> Option<roxmltree::Node<'a, 'a>> {
        self.first(TextNode::ParagraphProperties)
    }

    pub fn default_run_properties(&self) -> Option<roxmltree::Node<'a, 'a>> {
        self.properties().and_then(|ppr| dml(ppr, "defRPr"))
    }

    pub fn end_properties(&self) -> Option<roxmltree::Node<'a, 'a>> {
        self.first(TextNode::EndParagraphProperties)
    }

    pub fn runs(&self) -> impl Iterator<Item = Run<'a>> + use<'a> {
        self.node
            .children()
            .filter(|n| TextNode::of_node(*n) == TextNode::Run)
            .map(|node| Run { node })
    }
}

#[derive(Clone, Copy)]
pub struct Run<'a> {
    node: roxmltree::Node<'a, 'a>,
}

impl<'a> Run<'a> {
    pub fn properties(&self) -> Option<roxmltree::Node<'a, 'a>> {
        self.node
            .children()
            .find(|n| TextNode::of_node(*n) == TextNode::RunProperties)
    }
}
