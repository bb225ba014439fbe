//! Three-layer style merge: theme, then master class style, then the
//! placeholder's own override. Every resolved attribute records whether it
//! came from the override layer.

use crate::model::{
    Attr, ColorRef, MasterStyles, PlaceholderOverride, PlaceholderRole, ResolvedStyle, Rgb,
    StyleClass, ThemeInfo,
};

/// Scheme aliases used by text: `tx*` name the dark slots, `bg*` the light ones.
fn scheme_alias(slot: &str) -> &str {
    match slot {
        "tx1" => "dk1",
        "tx2" => "dk2",
        "bg1" => "lt1",
        "bg2" => "lt2",
        other => other,
    }
}

pub fn resolve_scheme_color(slot: &str, theme: &ThemeInfo) -> Option<Rgb> {
    theme.color(scheme_alias(slot))
}

pub fn resolve_color(color: &ColorRef, theme: &ThemeInfo) -> Option<Rgb> {
    match color {
        ColorRef::Rgb(rgb) => Some(*rgb),
        ColorRef::Scheme(slot) => resolve_scheme_color(slot, theme),
    }
}

/// Master style class a placeholder draws its defaults from.
pub fn style_class(role: PlaceholderRole) -> StyleClass {
    match role {
        PlaceholderRole::Title => StyleClass::Title,
        _ => StyleClass::Body,
    }
}

fn layer<T>(inherited: Option<T>, authored: Option<T>) -> Option<Attr<T>> {
    match authored {
        Some(value) => Some(Attr {
            value,
            explicit: true,
        }),
        None => inherited.map(|value| Attr {
            value,
            explicit: false,
        }),
    }
}

/// Effective text style of a placeholder: theme fonts, then the master's
/// style class for `role`, then what the placeholder authored.
///
/// Alignment cascades too. The master's `lvl1pPr@algn` is the inherited
/// value, so an unaligned placeholder reports the master's alignment with
/// `explicit` false rather than no alignment at all.
pub fn resolve_style(
    role: PlaceholderRole,
    theme: &ThemeInfo,
    master: &MasterStyles,
    authored: &PlaceholderOverride,
) -> ResolvedStyle {
    let is_title = role == PlaceholderRole::Title;
    let (theme_latin, theme_ea) = if is_title {
        (&theme.fonts.major_latin, &theme.fonts.major_ea)
    } else {
        (&theme.fonts.minor_latin, &theme.fonts.minor_ea)
    };
    let class = master.get(style_class(role)).cloned().unwrap_or_default();

    let color = match layer(class.color, authored.color.clone()) {
        Some(Attr { value, explicit }) => match resolve_color(&value, theme) {
            Some(rgb) => Some(Attr {
                value: rgb,
                explicit,
            }),
            None => {
                log::debug!("Unresolvable color {value}, leaving it to inheritance");
                None
            }
        },
        None => None,
    };

    ResolvedStyle {
        font_name: layer(
            class.font_name.or_else(|| theme_latin.clone()),
            authored.font_name.clone(),
        ),
        ea_font_name: layer(
            class.ea_font_name.or_else(|| theme_ea.clone()),
            authored.ea_font_name.clone(),
        ),
        size: layer(class.size, authored.size),
        bold: layer(class.bold, authored.bold),
        color,
        alignment: layer(class.alignment, authored.alignment),
    }
}
