//! Layout catalog: every layout of every master, described, deduplicated and
//! numbered, plus the lookup that maps a catalog entry back to a layout part.

use std::collections::HashSet;
use std::time::Instant;

use crate::cascade::resolve_style;
use crate::error::Error;
use crate::model::{
    CanvasSize, DecorativeShape, FixedElement, FixedElements, LayoutCatalog, LayoutDescriptor, MasterStyles,
    PlaceholderDescriptor, PlaceholderRole, Rect, Rgb, ThemeInfo,
};
use crate::pptx::placeholder::{
    extract_override, paragraph_format, placeholder_info, shape_name, shape_rect, word_wrap,
};
use crate::pptx::shapes::{decorative_shapes, shape_tree, top_level_shapes};
use crate::pptx::styles::read_master_styles;
use crate::pptx::theme::{read_master_theme, read_theme};
use crate::pptx::{Presentation, pml};

/// Structural identity used for deduplication: the display name
/// (case-insensitive) and the sorted (slot id, role) pairs of its content slots.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutSignature {
    pub name: String,
    pub slots: Vec<(u32, PlaceholderRole)>,
}

impl LayoutSignature {
    pub fn of(layout: &LayoutDescriptor) -> Self {
        let mut slots: Vec<(u32, PlaceholderRole)> = layout
            .placeholders
            .iter()
            .filter(|p| p.role != PlaceholderRole::Fixed)
            .map(|p| (p.idx, p.role))
            .collect();
        slots.sort();
        Self {
            name: layout.name.to_lowercase(),
            slots,
        }
    }
}

/// Master placeholder geometry, keyed for layout placeholders that carry no transform.
struct MasterGeometry {
    slots: Vec<(String, u32, Rect)>,
}

impl MasterGeometry {
    fn read(pres: &Presentation, master_part: &str) -> Self {
        let mut slots = Vec::new();
        if let Some(doc) = pres
            .part_text(master_part)
            .and_then(|text| roxmltree::Document::parse(text).ok())
        {
            if let Some(tree) = shape_tree(&doc) {
                for shape in top_level_shapes(tree) {
                    if let (Some(info), Some(rect)) = (placeholder_info(shape), shape_rect(shape)) {
                        slots.push((info.inheritance_key().to_string(), info.idx, rect));
                    }
                }
            }
        }
        Self { slots }
    }

    fn lookup(&self, key: &str, idx: u32) -> Option<Rect> {
        self.slots
            .iter()
            .find(|(k, _, _)| k == key)
            .or_else(|| self.slots.iter().find(|(_, i, _)| *i == idx))
            .map(|(_, _, rect)| *rect)
    }
}

struct MasterContext {
    theme: ThemeInfo,
    styles: MasterStyles,
    geometry: MasterGeometry,
}

fn describe_layout(
    pres: &Presentation,
    master_index: usize,
    local_index: usize,
    ctx: &MasterContext,
) -> LayoutDescriptor {
    let mut layout = LayoutDescriptor {
        catalog_index: 0,
        master_index: Some(master_index),
        local_index: Some(local_index),
        name: String::new(),
        layout_type: None,
        placeholders: Vec::new(),
        fixed_placeholders: Vec::new(),
        decorative_shapes: Vec::new(),
        description: String::new(),
    };

    let Some(part) = pres.layout_part(master_index, local_index) else {
        return layout;
    };
    let Some(doc) = pres
        .part_text(part)
        .and_then(|text| roxmltree::Document::parse(text).ok())
    else {
        log::warn!("Layout {part} is not well-formed, cataloguing it as empty");
        return layout;
    };

    let root = doc.root_element();
    layout.layout_type = root.attribute("type").map(str::to_string);
    layout.name = pml(root, "cSld")
        .and_then(|c| c.attribute("name"))
        .unwrap_or("")
        .to_string();

    if let Some(tree) = shape_tree(&doc) {
        for shape in top_level_shapes(tree) {
            let Some(info) = placeholder_info(shape) else {
                continue;
            };
            let role = info.role();
            let authored = extract_override(shape);
            let descriptor = PlaceholderDescriptor {
                idx: info.idx,
                name: shape_name(shape),
                position: shape_rect(shape)
                    .or_else(|| ctx.geometry.lookup(info.inheritance_key(), info.idx)),
                style: resolve_style(role, &ctx.theme, &ctx.styles, &authored),
                paragraph: paragraph_format(shape),
                word_wrap: word_wrap(shape),
                ph_type: info.ph_type,
                role,
            };
            if role == PlaceholderRole::Fixed {
                layout.fixed_placeholders.push(descriptor);
            } else {
                layout.placeholders.push(descriptor);
            }
        }
        layout.decorative_shapes = decorative_shapes(tree, &ctx.theme);
    }

    layout.description = auto_description(&layout);
    layout
}

/// A short English summary derived from the layout name and its slots.
pub fn auto_description(layout: &LayoutDescriptor) -> String {
    let name = layout.name.to_lowercase();
    if name.contains("blank") {
        return "Blank slide for pictures or custom content".to_string();
    }
    if name.contains("section") {
        return "Divider page between major sections".to_string();
    }
    if name.contains("title only") {
        return "Title only, leaving room for diagrams or pictures".to_string();
    }
    if name.contains("picture") {
        return "Layout with a picture placeholder".to_string();
    }
    if name.contains("caption") {
        return "Main content with a supporting caption".to_string();
    }
    if name.contains("vertical") {
        return "Vertical text layout".to_string();
    }
    match layout.placeholders.len() {
        0 => "Layout without text placeholders".to_string(),
        n => {
            let names: Vec<&str> = layout.placeholders.iter().map(|p| p.name.as_str()).collect();
            format!(
                "Layout with {n} placeholder{}: {}",
                if n == 1 { "" } else { "s" },
                names.join(", ")
            )
        }
    }
}

/// Named palette derived from the theme. Without accents, the most common
/// explicitly authored non-black, non-white placeholder color becomes `primary`.
pub fn build_palette(
    theme: &ThemeInfo,
    layouts: &[LayoutDescriptor],
) -> std::collections::BTreeMap<String, Rgb> {
    let mut palette = std::collections::BTreeMap::new();
    for (slot, key) in [
        ("dk1", "text_main"),
        ("dk2", "text_sub"),
        ("lt1", "background"),
        ("lt2", "background_alt"),
        ("hlink", "hyperlink"),
        ("folHlink", "followed_hyperlink"),
    ] {
        if let Some(rgb) = theme.color(slot) {
            palette.insert(key.to_string(), rgb);
        }
    }

    for i in 1..=6 {
        let slot = format!("accent{i}");
        if let Some(rgb) = theme.color(&slot) {
            if palette.contains_key("primary") {
                palette.insert(slot, rgb);
            } else {
                palette.insert("primary".to_string(), rgb);
            }
        }
    }

    if !palette.contains_key("primary") {
        let mut counts: Vec<(Rgb, usize)> = Vec::new();
        let explicit_colors = layouts
            .iter()
            .flat_map(|l| l.placeholders.iter())
            .filter_map(|p| p.style.color.as_ref())
            .filter(|c| c.explicit)
            .map(|c| c.value)
            .filter(|rgb| *rgb != Rgb([0, 0, 0]) && *rgb != Rgb([0xFF, 0xFF, 0xFF]));
        for rgb in explicit_colors {
            match counts.iter_mut().find(|(c, _)| *c == rgb) {
                Some((_, n)) => *n += 1,
                None => counts.push((rgb, 1)),
            }
        }
        let mut best: Option<(Rgb, usize)> = None;
        for (rgb, n) in counts {
            if best.is_none_or(|(_, top)| n > top) {
                best = Some((rgb, n));
            }
        }
        if let Some((rgb, _)) = best {
            palette.insert("primary".to_string(), rgb);
        }
    }
    palette
}

const COLOR_BAR_MAX_HEIGHT_IN: f64 = 0.15;
const COLOR_BAR_MIN_WIDTH_IN: f64 = 0.5;

/// The first filled layout shape thinner than 0.15in and wider than 0.5in.
fn find_color_bar(layouts: &[LayoutDescriptor]) -> Option<DecorativeShape> {
    layouts
        .iter()
        .flat_map(|l| l.decorative_shapes.iter())
        .find(|s| {
            s.fill_color.is_some()
                && s.position.is_some_and(|r| {
                    r.height_in() < COLOR_BAR_MAX_HEIGHT_IN && r.width_in() > COLOR_BAR_MIN_WIDTH_IN
                })
        })
        .cloned()
}

fn fixed_elements(layouts: &[LayoutDescriptor]) -> FixedElements {
    let mut fixed = FixedElements::default();
    for ph in layouts.iter().flat_map(|l| l.fixed_placeholders.iter()) {
        let slot = match ph.ph_type.as_str() {
            "ftr" => &mut fixed.footer,
            "dt" => &mut fixed.date,
            "sldNum" => &mut fixed.slide_number,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(FixedElement {
                idx: ph.idx,
                font_size: ph.style.size.as_ref().map(|s| s.value),
                color: ph.style.color.as_ref().map(|c| c.value),
            });
        }
    }
    fixed
}

/// Describe, deduplicate and number every layout of every master.
pub fn build_layout_catalog(pres: &Presentation) -> Result<LayoutCatalog, Error> {
    let start = Instant::now();
    if pres.layout_count() == 0 {
        return Err(Error::NoLayouts);
    }

    let theme = read_theme(pres);
    let mut layouts = Vec::new();
    let mut master_shapes = Vec::new();
    let mut seen = HashSet::new();
    let mut dropped = 0usize;
    let mut reference = Vec::new();

    for (master_index, master) in pres.masters().iter().enumerate() {
        let ctx = MasterContext {
            theme: read_master_theme(pres, master_index),
            styles: read_master_styles(pres, master_index),
            geometry: MasterGeometry::read(pres, &master.part),
        };

        if let Some(doc) = pres
            .part_text(&master.part)
            .and_then(|text| roxmltree::Document::parse(text).ok())
        {
            if let Some(tree) = shape_tree(&doc) {
                master_shapes.extend(decorative_shapes(tree, &ctx.theme));
            }
        }

        for local_index in 0..master.layouts.len() {
            let mut layout = describe_layout(pres, master_index, local_index, &ctx);
            reference.push(format!(
                "[{}]={}",
                reference.len(),
                layout.layout_type.as_deref().unwrap_or(layout.name.as_str())
            ));
            if !seen.insert(LayoutSignature::of(&layout)) {
                log::debug!(
                    "Dropping duplicate layout {:?} (master {master_index}, layout {local_index})",
                    layout.name
                );
                dropped += 1;
                continue;
            }
            layout.catalog_index = layouts.len();
            layouts.push(layout);
        }
    }

    let catalog = LayoutCatalog {
        template_identity: None,
        canvas: pres
            .slide_size()
            .map(|(cx, cy)| CanvasSize::from_emu(cx, cy)),
        palette: build_palette(&theme, &layouts),
        fixed_elements: fixed_elements(&layouts),
        master_styles: read_master_styles(pres, 0),
        theme,
        master_shapes,
        color_bar: find_color_bar(&layouts),
        layouts_reference: reference.join(", "),
        layouts,
    };

    log::info!(
        "Catalogued {} layout(s) from {} master(s), dropped {dropped} duplicate(s) in {:.1}ms",
        catalog.layouts.len(),
        pres.masters().len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(catalog)
}

/// How a layout is requested.
#[derive(Clone, Copy, Debug)]
pub enum LayoutRef<'a> {
    /// A concrete (master, layout) coordinate.
    Direct {
        master_index: usize,
        local_index: usize,
    },
    /// A catalog index, resolved through the catalog it came from when there is one.
    Catalog {
        index: usize,
        catalog: Option<&'a LayoutCatalog>,
    },
}

/// Which branch of layout resolution was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    /// The requested (master, layout) pair exists.
    Direct,
    /// The catalog entry's stored (master, layout) pair exists.
    Indexed,
    /// The index was counted linearly across all masters' layouts. This
    /// ignores deduplication, so it can land on a different layout than the
    /// one the index originally named.
    LinearFallback,
    /// Nothing matched; the first layout of the first master was used.
    FirstLayout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLayout {
    pub master_index: usize,
    pub local_index: usize,
    pub part: String,
    pub path: ResolutionPath,
}

fn linear_position(pres: &Presentation, index: usize) -> Option<(usize, usize)> {
    pres.masters()
        .iter()
        .enumerate()
        .flat_map(|(m, master)| (0..master.layouts.len()).map(move |l| (m, l)))
        .nth(index)
}

pub fn resolve_layout(pres: &Presentation, layout_ref: LayoutRef) -> Result<ResolvedLayout, Error> {
    let found = |m: usize, l: usize, path: ResolutionPath| {
        pres.layout_part(m, l).map(|part| ResolvedLayout {
            master_index: m,
            local_index: l,
            part: part.to_string(),
            path,
        })
    };

    let resolved = match layout_ref {
        LayoutRef::Direct {
            master_index,
            local_index,
        } => found(master_index, local_index, ResolutionPath::Direct),
        LayoutRef::Catalog { index, catalog } => {
            let indexed = catalog
                .and_then(|c| c.entry(index))
                .and_then(|e| Some((e.master_index?, e.local_index?)))
                .and_then(|(m, l)| found(m, l, ResolutionPath::Indexed));
            indexed.or_else(|| {
                log::debug!("Catalog index {index} has no usable (master, layout) pair, counting linearly");
                linear_position(pres, index)
                    .and_then(|(m, l)| found(m, l, ResolutionPath::LinearFallback))
            })
        }
    };

    match resolved {
        Some(layout) => Ok(layout),
        None => {
            match layout_ref {
                LayoutRef::Direct {
                    master_index,
                    local_index,
                } => log::warn!(
                    "Layout ({master_index}, {local_index}) does not exist, using the first layout"
                ),
                LayoutRef::Catalog { index, .. } => {
                    log::warn!("Layout index {index} is out of range, using the first layout")
                }
            }
            pres.masters()
                .iter()
                .enumerate()
                .find(|(_, m)| !m.layouts.is_empty())
                .and_then(|(m, _)| found(m, 0, ResolutionPath::FirstLayout))
                .ok_or(Error::NoLayouts)
        }
    }
}
