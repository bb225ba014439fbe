//! Slide instantiation and structure-preserving text replacement.
//!
//! A [`SlideBuilder`] owns a snapshot of the layout's placeholders and hands
//! back a finished slide tree, so the template layout is never aliased by
//! the slide being filled.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{LayoutRef, ResolutionPath, resolve_layout};
use crate::cascade::resolve_color;
use crate::error::Error;
use crate::model::{
    ContentKind, LayoutDescriptor, PlaceholderRole, Rgb, SlideContentSpec, SlotContent, ThemeInfo,
};
use crate::pptx::placeholder::{PlaceholderInfo, extract_override, placeholder_info};
use crate::pptx::shapes::{shape_tree, top_level_shapes};
use crate::pptx::text::TextNode;
use crate::pptx::theme::read_master_theme;
use crate::pptx::{DML_NS, PML_NS, Presentation};
use crate::xml::{self, Element, XmlNode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InjectOptions {
    /// Write a literal color onto new runs, but only where the placeholder
    /// itself authored one. Inherited colors are never stamped.
    pub stamp_explicit_colors: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotFailure {
    pub slot: u32,
    pub reason: String,
}

/// What happened to one slide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InjectionReport {
    pub slide_part: String,
    pub master_index: usize,
    pub local_index: usize,
    pub resolution: ResolutionPath,
    pub filled: Vec<u32>,
    /// Slot ids with no matching placeholder on the layout.
    pub skipped: Vec<u32>,
    pub failures: Vec<SlotFailure>,
}

fn placeholder_of(shape: &Element) -> Option<PlaceholderInfo> {
    let ph = shape
        .child(PML_NS, "nvSpPr")?
        .child(PML_NS, "nvPr")?
        .child(PML_NS, "ph")?;
    Some(PlaceholderInfo {
        ph_type: ph.attr("type").unwrap_or("obj").to_string(),
        idx: ph.attr("idx").and_then(|v| v.parse().ok()).unwrap_or(0),
    })
}

fn first_of(el: &Element, kind: TextNode) -> Option<&Element> {
    el.elements().find(|e| TextNode::of_element(e) == kind)
}

/// A copy of `para` holding only its paragraph and end-of-paragraph properties.
fn stripped_paragraph(para: &Element) -> Element {
    let mut stripped = para.clone();
    stripped.children = [TextNode::ParagraphProperties, TextNode::EndParagraphProperties]
        .into_iter()
        .filter_map(|kind| first_of(para, kind).cloned())
        .map(XmlNode::Element)
        .collect();
    stripped
}

fn new_run(para: &Element, text: &str, color: Option<Rgb>) -> Element {
    let mut run = para.sibling("r");
    if let Some(rgb) = color {
        let mut fill = para.sibling("solidFill");
        fill.push(para.sibling("srgbClr").with_attr("val", rgb.to_ooxml()));
        let mut rpr = para.sibling("rPr");
        rpr.push(fill);
        run.push(rpr);
    }
    let mut t = para.sibling("t");
    t.push_text(text);
    run.push(t);
    run
}

/// Replace a paragraph's content with one run, keeping `a:pPr` first and
/// `a:endParaRPr` last.
fn rewrite_paragraph(para: &mut Element, text: Option<&str>, color: Option<Rgb>) {
    let ppr = first_of(para, TextNode::ParagraphProperties).cloned();
    let end = first_of(para, TextNode::EndParagraphProperties).cloned();
    let run = text.map(|t| new_run(para, t, color));
    para.children.clear();
    para.children
        .extend([ppr, run, end].into_iter().flatten().map(XmlNode::Element));
}

fn paragraph_positions(body: &Element) -> Vec<usize> {
    body.children
        .iter()
        .enumerate()
        .filter_map(|(i, c)| match c {
            XmlNode::Element(e) if TextNode::of_element(e) == TextNode::Paragraph => Some(i),
            _ => None,
        })
        .collect()
}

/// Drop every paragraph after the first and return the first's position.
fn keep_first_paragraph(body: &mut Element, slot: u32) -> Result<usize, Error> {
    let positions = paragraph_positions(body);
    let Some(&first) = positions.first() else {
        return Err(Error::EmptyTextBody { slot });
    };
    for &i in positions[1..].iter().rev() {
        body.children.remove(i);
    }
    Ok(first)
}

fn paragraph_at(body: &mut Element, i: usize) -> Option<&mut Element> {
    match body.children.get_mut(i) {
        Some(XmlNode::Element(e)) => Some(e),
        _ => None,
    }
}

pub(crate) fn fill_text(
    body: &mut Element,
    slot: u32,
    text: &str,
    color: Option<Rgb>,
) -> Result<(), Error> {
    let first = keep_first_paragraph(body, slot)?;
    if let Some(para) = paragraph_at(body, first) {
        rewrite_paragraph(para, Some(text), color);
    }
    Ok(())
}

pub(crate) fn fill_list(
    body: &mut Element,
    slot: u32,
    items: &[String],
    color: Option<Rgb>,
) -> Result<(), Error> {
    let first = keep_first_paragraph(body, slot)?;
    // Snapshot before the reused paragraph is rewritten.
    let Some(template) = paragraph_at(body, first).cloned() else {
        return Err(Error::EmptyTextBody { slot });
    };

    let Some((head, rest)) = items.split_first() else {
        if let Some(para) = paragraph_at(body, first) {
            rewrite_paragraph(para, None, None);
        }
        return Ok(());
    };

    if let Some(para) = paragraph_at(body, first) {
        rewrite_paragraph(para, Some(head), color);
    }
    for (offset, item) in rest.iter().enumerate() {
        let mut para = template.clone();
        rewrite_paragraph(&mut para, Some(item), color);
        body.children
            .insert(first + offset + 1, XmlNode::Element(para));
    }
    Ok(())
}

/// An editable slide instantiated from one layout.
#[derive(Clone, Debug)]
pub struct SlideBuilder {
    slide: Element,
}

impl SlideBuilder {
    /// Clone every non-fixed placeholder of the layout into a fresh slide.
    ///
    /// Each clone keeps the placeholder's non-visual properties, gets empty
    /// shape properties so geometry keeps inheriting, and a text body reduced
    /// to its first paragraph's properties.
    pub fn from_layout(layout_xml: &str) -> Result<Self, Error> {
        let layout = xml::parse(layout_xml)?;
        if !layout.is(PML_NS, "sldLayout") {
            return Err(Error::InvalidPptx(format!(
                "expected a slide layout, found {}",
                layout.qualified_name()
            )));
        }

        let mut slide = layout.sibling("sld");
        slide.declarations = layout.declarations.clone();

        let layout_tree = layout
            .child(PML_NS, "cSld")
            .and_then(|c| c.child(PML_NS, "spTree"));
        let mut tree = slide.sibling("spTree");
        for name in ["nvGrpSpPr", "grpSpPr"] {
            if let Some(el) = layout_tree.and_then(|t| t.child(PML_NS, name)) {
                tree.push(el.clone());
            }
        }

        let placeholders = layout_tree
            .into_iter()
            .flat_map(|t| t.elements())
            .filter(|e| e.is(PML_NS, "sp"))
            .filter(|e| {
                placeholder_of(e)
                    .is_some_and(|ph| ph.role() != PlaceholderRole::Fixed)
            });
        for shape in placeholders {
            tree.push(clone_placeholder(shape));
        }

        let mut c_sld = slide.sibling("cSld");
        c_sld.push(tree);
        slide.push(c_sld);

        let dml_prefix = match slide.declared_prefix(DML_NS) {
            Some(p) => p.to_string(),
            None => {
                slide.declare(Some("a"), DML_NS);
                "a".to_string()
            }
        };
        let mut clr_map = slide.sibling("clrMapOvr");
        clr_map.push(Element::new(DML_NS, Some(&dml_prefix), "masterClrMapping"));
        slide.push(clr_map);

        Ok(Self { slide })
    }

    fn placeholders_mut(&mut self) -> impl Iterator<Item = (u32, &mut Element)> {
        self.slide
            .child_mut(PML_NS, "cSld")
            .and_then(|c| c.child_mut(PML_NS, "spTree"))
            .into_iter()
            .flat_map(|t| t.elements_mut())
            .filter_map(|e| placeholder_of(e).map(|ph| (ph.idx, e)))
    }

    pub fn slot_ids(&self) -> Vec<u32> {
        self.slide
            .child(PML_NS, "cSld")
            .and_then(|c| c.child(PML_NS, "spTree"))
            .into_iter()
            .flat_map(|t| t.elements())
            .filter_map(placeholder_of)
            .map(|ph| ph.idx)
            .collect()
    }

    /// Fill one slot. Returns `Ok(false)` when the slide has no such slot.
    pub fn fill(&mut self, content: &SlotContent, color: Option<Rgb>) -> Result<bool, Error> {
        let slot = content.id;
        let Some((_, shape)) = self.placeholders_mut().find(|(idx, _)| *idx == slot) else {
            return Ok(false);
        };
        let body = shape
            .child_mut(PML_NS, "txBody")
            .ok_or(Error::EmptyTextBody { slot })?;
        match content.kind {
            ContentKind::Text => fill_text(body, slot, &content.as_text(), color)?,
            ContentKind::List => fill_list(body, slot, &content.as_items(), color)?,
        }
        Ok(true)
    }

    pub fn element(&self) -> &Element {
        &self.slide
    }

    pub fn into_element(self) -> Element {
        self.slide
    }
}

fn clone_placeholder(shape: &Element) -> Element {
    let mut clone = shape.sibling("sp");
    if let Some(nv) = shape.child(PML_NS, "nvSpPr") {
        clone.push(nv.clone());
    }
    clone.push(shape.sibling("spPr"));

    if let Some(body) = shape.child(PML_NS, "txBody") {
        let mut new_body = body.sibling("txBody");
        if let Some(a) = body
            .elements()
            .find(|e| e.namespace.as_deref() == Some(DML_NS))
        {
            new_body.push(a.sibling("bodyPr"));
            new_body.push(a.sibling("lstStyle"));
        }
        if let Some(first) = first_of(body, TextNode::Paragraph) {
            new_body.push(stripped_paragraph(first));
        }
        clone.push(new_body);
    }
    clone
}

/// Explicit colors already resolved into a catalog entry.
fn catalogued_colors(entry: &LayoutDescriptor) -> BTreeMap<u32, Rgb> {
    entry
        .placeholders
        .iter()
        .filter_map(|p| {
            let color = p.style.color.as_ref().filter(|c| c.explicit)?;
            Some((p.idx, color.value))
        })
        .collect()
}

/// Colors authored on the layout's placeholders, resolved against the theme.
fn explicit_colors(layout_xml: &str, theme: &ThemeInfo) -> BTreeMap<u32, Rgb> {
    let Ok(doc) = roxmltree::Document::parse(layout_xml) else {
        return BTreeMap::new();
    };
    let Some(tree) = shape_tree(&doc) else {
        return BTreeMap::new();
    };
    top_level_shapes(tree)
        .filter_map(|shape| {
            let idx = placeholder_info(shape)?.idx;
            let color = extract_override(shape).color?;
            Some((idx, resolve_color(&color, theme)?))
        })
        .collect()
}

pub fn inject_content(
    pres: &mut Presentation,
    layout_ref: LayoutRef,
    spec: &SlideContentSpec,
) -> Result<InjectionReport, Error> {
    inject_content_with(pres, layout_ref, spec, InjectOptions::default())
}

/// Append one slide built on the resolved layout and fill it from `spec`.
///
/// Unknown slot ids are skipped. A placeholder without a paragraph to reuse
/// fails on its own and is reported; the other slots are still filled.
pub fn inject_content_with(
    pres: &mut Presentation,
    layout_ref: LayoutRef,
    spec: &SlideContentSpec,
    options: InjectOptions,
) -> Result<InjectionReport, Error> {
    let layout = resolve_layout(pres, layout_ref)?;
    let layout_xml = pres
        .part_text(&layout.part)
        .ok_or_else(|| Error::InvalidPptx(format!("missing layout part {}", layout.part)))?
        .to_string();

    let mut builder = SlideBuilder::from_layout(&layout_xml)?;
    let colors = if options.stamp_explicit_colors {
        let entry = match layout_ref {
            LayoutRef::Catalog {
                index,
                catalog: Some(catalog),
            } => catalog.entry(index).filter(|e| {
                e.master_index == Some(layout.master_index)
                    && e.local_index == Some(layout.local_index)
            }),
            _ => None,
        };
        match entry {
            Some(entry) => catalogued_colors(entry),
            None => explicit_colors(&layout_xml, &read_master_theme(pres, layout.master_index)),
        }
    } else {
        BTreeMap::new()
    };

    let mut filled = Vec::new();
    let mut skipped = Vec::new();
    let mut failures = Vec::new();
    for (slot, content) in spec.content_map() {
        match builder.fill(&content, colors.get(&slot).copied()) {
            Ok(true) => filled.push(slot),
            Ok(false) => {
                log::debug!("Layout {} has no slot {slot}, skipping", layout.part);
                skipped.push(slot);
            }
            Err(e) => {
                log::warn!("Could not fill slot {slot} on {}: {e}", layout.part);
                failures.push(SlotFailure {
                    slot,
                    reason: e.to_string(),
                });
            }
        }
    }

    let slide_part = pres.add_slide_part(builder.element(), &layout.part)?;
    Ok(InjectionReport {
        slide_part,
        master_index: layout.master_index,
        local_index: layout.local_index,
        resolution: layout.path,
        filled,
        skipped,
        failures,
    })
}
