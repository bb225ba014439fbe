use crate::model::{Alignment, ColorRef, MasterStyles, Rgb, StyleClass, TextProps};

use super::{Presentation, dml, pml};

pub(crate) fn parse_alignment(val: &str) -> Option<Alignment> {
    match val {
        "l" => Some(Alignment::Left),
        "ctr" => Some(Alignment::Center),
        "r" => Some(Alignment::Right),
        "just" | "justLow" => Some(Alignment::Justify),
        "dist" | "thaiDist" => Some(Alignment::Distributed),
        _ => None,
    }
}

/// Typeface of `a:latin`/`a:ea`, skipping theme references such as `+mj-lt`.
fn typeface(rpr: roxmltree::Node, script: &str) -> Option<String> {
    dml(rpr, script)
        .and_then(|n| n.attribute("typeface"))
        .filter(|tf| !tf.is_empty() && !tf.starts_with('+'))
        .map(str::to_string)
}

/// Color of an `a:solidFill` child, kept symbolic when it names a scheme slot.
pub(crate) fn solid_fill_color(parent: roxmltree::Node) -> Option<ColorRef> {
    let fill = dml(parent, "solidFill")?;
    let value = fill.children().find(|n| n.is_element())?;
    match value.tag_name().name() {
        "srgbClr" => value
            .attribute("val")
            .and_then(Rgb::from_hex)
            .map(ColorRef::Rgb),
        "schemeClr" => value
            .attribute("val")
            .map(|slot| ColorRef::Scheme(slot.to_string())),
        "sysClr" => value
            .attribute("lastClr")
            .and_then(Rgb::from_hex)
            .map(ColorRef::Rgb),
        _ => None,
    }
}

pub(crate) fn parse_bool(val: &str) -> Option<bool> {
    match val {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Run-level attributes of an `a:rPr`, `a:defRPr` or `a:endParaRPr` node.
pub(crate) fn parse_run_props(rpr: roxmltree::Node) -> TextProps {
    TextProps {
        font_name: typeface(rpr, "latin"),
        ea_font_name: typeface(rpr, "ea"),
        size: rpr
            .attribute("sz")
            .and_then(|v| v.parse::<f32>().ok())
            .map(|sz| sz / 100.0),
        bold: rpr.attribute("b").and_then(parse_bool),
        color: solid_fill_color(rpr),
        alignment: None,
    }
}

/// Alignment and default run properties of a level paragraph-properties node
/// (`a:lvl1pPr` or `a:pPr`).
pub(crate) fn parse_level_props(ppr: roxmltree::Node) -> TextProps {
    let mut props = dml(ppr, "defRPr").map(parse_run_props).unwrap_or_default();
    props.alignment = ppr.attribute("algn").and_then(parse_alignment);
    props
}

pub(crate) fn parse_master_styles(xml_content: &str) -> MasterStyles {
    let mut styles = MasterStyles::default();
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        log::warn!("Slide master is not well-formed, no master text styles");
        return styles;
    };
    let Some(tx_styles) = pml(xml.root_element(), "txStyles") else {
        return styles;
    };

    for class in [StyleClass::Title, StyleClass::Body, StyleClass::Other] {
        let Some(lvl1) = pml(tx_styles, class.element_name()).and_then(|s| dml(s, "lvl1pPr"))
        else {
            continue;
        };
        let props = parse_level_props(lvl1);
        if !props.is_empty() {
            styles.set(class, props);
        }
    }
    styles
}

/// Text styles of one master; empty when the master is missing or defines none.
pub fn read_master_styles(pres: &Presentation, master_index: usize) -> MasterStyles {
    pres.masters()
        .get(master_index)
        .and_then(|m| pres.part_text(&m.part))
        .map(parse_master_styles)
        .unwrap_or_default()
}
