use crate::model::{
    Bullet, LineSpacing, ParagraphFormat, PlaceholderOverride, PlaceholderRole, Rect,
};

use super::styles::{parse_level_props, parse_run_props};
use super::text::TextBody;
use super::{attr_i64, dml, is_pml, pml};

const TITLE_TYPES: [&str; 2] = ["title", "ctrTitle"];
const FIXED_TYPES: [&str; 3] = ["dt", "ftr", "sldNum"];
const PICTURE_TYPES: [&str; 1] = ["pic"];

const NV_PROPERTIES: [&str; 5] = [
    "nvSpPr",
    "nvPicPr",
    "nvGraphicFramePr",
    "nvCxnSpPr",
    "nvGrpSpPr",
];

/// Identity of a placeholder as written in `p:nvPr/p:ph`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaceholderInfo {
    pub ph_type: String,
    pub idx: u32,
}

impl PlaceholderInfo {
    pub fn role(&self) -> PlaceholderRole {
        classify(&self.ph_type, self.idx)
    }

    /// Key used to find the master placeholder a layout placeholder inherits from.
    pub fn inheritance_key(&self) -> &str {
        match self.ph_type.as_str() {
            "title" | "ctrTitle" => "title",
            "dt" | "ftr" | "sldNum" => self.ph_type.as_str(),
            _ => "body",
        }
    }
}

pub fn classify(ph_type: &str, idx: u32) -> PlaceholderRole {
    if TITLE_TYPES.contains(&ph_type) || idx == 0 {
        PlaceholderRole::Title
    } else if FIXED_TYPES.contains(&ph_type) {
        PlaceholderRole::Fixed
    } else if PICTURE_TYPES.contains(&ph_type) {
        PlaceholderRole::Picture
    } else {
        PlaceholderRole::Body
    }
}

fn non_visual_properties<'a>(shape: roxmltree::Node<'a, 'a>) -> Option<roxmltree::Node<'a, 'a>> {
    shape
        .children()
        .find(|n| NV_PROPERTIES.iter().any(|name| is_pml(*n, name)))
}

pub fn placeholder_info(shape: roxmltree::Node) -> Option<PlaceholderInfo> {
    let ph = non_visual_properties(shape)
        .and_then(|nv| pml(nv, "nvPr"))
        .and_then(|nv_pr| pml(nv_pr, "ph"))?;
    Some(PlaceholderInfo {
        ph_type: ph.attribute("type").unwrap_or("obj").to_string(),
        idx: ph
            .attribute("idx")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0),
    })
}

pub fn shape_name(shape: roxmltree::Node) -> String {
    non_visual_properties(shape)
        .and_then(|nv| pml(nv, "cNvPr"))
        .and_then(|c| c.attribute("name"))
        .unwrap_or("")
        .to_string()
}

pub fn shape_rect(shape: roxmltree::Node) -> Option<Rect> {
    let xfrm = if is_pml(shape, "graphicFrame") {
        pml(shape, "xfrm")
    } else {
        let props = pml(shape, "spPr").or_else(|| pml(shape, "grpSpPr"))?;
        dml(props, "xfrm")
    }?;
    let off = dml(xfrm, "off");
    let ext = dml(xfrm, "ext")?;
    Some(Rect {
        x: off.and_then(|o| attr_i64(o, "x")).unwrap_or(0),
        y: off.and_then(|o| attr_i64(o, "y")).unwrap_or(0),
        cx: attr_i64(ext, "cx")?,
        cy: attr_i64(ext, "cy")?,
    })
}

pub fn text_body<'a>(shape: roxmltree::Node<'a, 'a>) -> Option<TextBody<'a>> {
    pml(shape, "txBody").map(TextBody::new)
}

/// Attributes authored on the placeholder itself.
///
/// Paragraphs are walked in order; within each, alignment, then the default
/// run properties of `a:pPr`, then `a:endParaRPr`, then each run's `a:rPr`.
/// The first value found for an attribute is kept. The placeholder's own
/// `a:lstStyle` level-one defaults only fill what is still unset.
pub fn extract_override(shape: roxmltree::Node) -> PlaceholderOverride {
    let mut result = PlaceholderOverride::default();
    let Some(body) = text_body(shape) else {
        return result;
    };

    for para in body.paragraphs() {
        if let Some(ppr) = para.properties() {
            if result.alignment.is_none() {
                result.alignment = parse_level_props(ppr).alignment;
            }
        }
        if let Some(def_rpr) = para.default_run_properties() {
            result.fill_from(&parse_run_props(def_rpr));
        }
        if let Some(end_rpr) = para.end_properties() {
            result.fill_from(&parse_run_props(end_rpr));
        }
        for run in para.runs() {
            if let Some(rpr) = run.properties() {
                result.fill_from(&parse_run_props(rpr));
            }
        }
    }

    if let Some(lvl1) = body.level1_properties() {
        result.fill_from(&parse_level_props(lvl1));
    }
    result
}

fn points_from_hundredths(node: roxmltree::Node) -> Option<f32> {
    dml(node, "spcPts")
        .and_then(|p| attr_i64(p, "val"))
        .map(|v| v as f32 / 100.0)
}

fn line_spacing(ppr: roxmltree::Node) -> Option<LineSpacing> {
    let spacing = dml(ppr, "lnSpc")?;
    if let Some(pct) = dml(spacing, "spcPct").and_then(|p| attr_i64(p, "val")) {
        return Some(LineSpacing::Multiple(pct as f32 / 100_000.0));
    }
    points_from_hundredths(spacing).map(LineSpacing::Points)
}

fn bullet(ppr: roxmltree::Node) -> Option<Bullet> {
    if dml(ppr, "buNone").is_some() {
        return Some(Bullet::None);
    }
    if let Some(bu) = dml(ppr, "buChar") {
        return Some(Bullet::Char {
            char: bu.attribute("char").unwrap_or("\u{2022}").to_string(),
        });
    }
    if let Some(bu) = dml(ppr, "buAutoNum") {
        return Some(Bullet::AutoNum {
            scheme: bu.attribute("type").unwrap_or("").to_string(),
        });
    }
    let font = dml(ppr, "buFont");
    if font.is_some() || dml(ppr, "buClr").is_some() || dml(ppr, "buSzPct").is_some() {
        return Some(Bullet::Formatted {
            font: font
                .and_then(|f| f.attribute("typeface"))
                .map(str::to_string),
        });
    }
    None
}

/// Paragraph formatting merged across paragraphs, first value wins.
pub fn paragraph_format(shape: roxmltree::Node) -> Option<ParagraphFormat> {
    let body = text_body(shape)?;
    let mut format = ParagraphFormat::default();
    for ppr in body.paragraphs().filter_map(|p| p.properties()) {
        if format.line_spacing.is_none() {
            format.line_spacing = line_spacing(ppr);
        }
        if format.space_before.is_none() {
            format.space_before = dml(ppr, "spcBef").and_then(points_from_hundredths);
        }
        if format.space_after.is_none() {
            format.space_after = dml(ppr, "spcAft").and_then(points_from_hundredths);
        }
        if format.bullet.is_none() {
            format.bullet = bullet(ppr).filter(|b| *b != Bullet::None);
        }
    }
    (!format.is_empty()).then_some(format)
}

pub fn word_wrap(shape: roxmltree::Node) -> Option<bool> {
    let body_pr = text_body(shape)?.body_properties()?;
    match body_pr.attribute("wrap")? {
        "square" => Some(true),
        "none" => Some(false),
        _ => None,
    }
}
