use crate::model::{Rgb, SCHEME_SLOTS, SchemeColor, ThemeFonts, ThemeInfo};

use super::{DML_NS, Presentation, dml};

fn typeface<'a>(font: roxmltree::Node<'a, 'a>, script: &str) -> Option<String> {
    dml(font, script)
        .and_then(|n| n.attribute("typeface"))
        .filter(|tf| !tf.is_empty())
        .map(str::to_string)
}

/// Literal value of one `a:clrScheme` slot.
fn slot_color(slot: roxmltree::Node) -> Option<Rgb> {
    let value = slot.children().find(|n| n.is_element())?;
    match value.tag_name().name() {
        "srgbClr" => value.attribute("val").and_then(Rgb::from_hex),
        "sysClr" => value
            .attribute("lastClr")
            .and_then(Rgb::from_hex)
            .or_else(|| value.attribute("val").and_then(Rgb::from_hex)),
        _ => None,
    }
}

pub(crate) fn parse_theme(xml_content: &str) -> ThemeInfo {
    let Ok(xml) = roxmltree::Document::parse(xml_content) else {
        log::warn!("Theme part is not well-formed, using an empty theme");
        return ThemeInfo::default();
    };

    let mut colors = Vec::new();
    let mut fonts = ThemeFonts::default();

    for node in xml.descendants() {
        if node.tag_name().namespace() != Some(DML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "clrScheme" if colors.is_empty() => {
                for slot in SCHEME_SLOTS {
                    if let Some(rgb) = dml(node, slot).and_then(slot_color) {
                        colors.push(SchemeColor {
                            slot: slot.to_string(),
                            rgb,
                        });
                    }
                }
            }
            "majorFont" if fonts.major_latin.is_none() => {
                fonts.major_latin = typeface(node, "latin");
                fonts.major_ea = typeface(node, "ea");
            }
            "minorFont" if fonts.minor_latin.is_none() => {
                fonts.minor_latin = typeface(node, "latin");
                fonts.minor_ea = typeface(node, "ea");
            }
            _ => {}
        }
    }

    ThemeInfo { colors, fonts }
}

fn theme_from_part(pres: &Presentation, part: Option<&str>) -> ThemeInfo {
    match part.and_then(|part| pres.part_text(part)) {
        Some(xml_content) => parse_theme(xml_content),
        None => {
            log::debug!("No theme part found");
            ThemeInfo::default()
        }
    }
}

/// The document-wide theme, or an empty one when no theme part resolves.
pub fn read_theme(pres: &Presentation) -> ThemeInfo {
    theme_from_part(pres, pres.theme_part())
}

/// The theme a master relates to, falling back to the document-wide theme.
pub fn read_master_theme(pres: &Presentation, master_index: usize) -> ThemeInfo {
    let part = pres
        .masters()
        .get(master_index)
        .and_then(|m| m.theme_part.as_deref())
        .or_else(|| pres.theme_part());
    theme_from_part(pres, part)
}
