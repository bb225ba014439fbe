use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const EMU_PER_INCH: f64 = 914_400.0;
pub const EMU_PER_POINT: f64 = 12_700.0;

/// Scheme color slots in theme order.
pub const SCHEME_SLOTS: [&str; 12] = [
    "dk1", "dk2", "lt1", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5", "accent6",
    "hlink", "folHlink",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Parse `RRGGBB` or `#RRGGBB`.
    pub fn from_hex(val: &str) -> Option<Self> {
        let val = val.strip_prefix('#').unwrap_or(val);
        if val.len() != 6 || !val.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&val[0..2], 16).ok()?;
        let g = u8::from_str_radix(&val[2..4], 16).ok()?;
        let b = u8::from_str_radix(&val[4..6], 16).ok()?;
        Some(Rgb([r, g, b]))
    }

    /// Hex form without the leading `#`, as written in `a:srgbClr@val`.
    pub fn to_ooxml(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_ooxml())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgb::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color {s:?}")))
    }
}

/// A color as authored: either a literal value or a reference into the theme's scheme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorRef {
    Rgb(Rgb),
    Scheme(String),
}

impl fmt::Display for ColorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorRef::Rgb(rgb) => rgb.fmt(f),
            ColorRef::Scheme(slot) => write!(f, "scheme:{slot}"),
        }
    }
}

impl Serialize for ColorRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColorRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if let Some(slot) = s.strip_prefix("scheme:") {
            return Ok(ColorRef::Scheme(slot.to_string()));
        }
        Rgb::from_hex(&s)
            .map(ColorRef::Rgb)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color {s:?}")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distributed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeColor {
    pub slot: String,
    pub rgb: Rgb,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFonts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_latin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_ea: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_latin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_ea: Option<String>,
}

/// Document-wide palette and font pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeInfo {
    /// Ordered by [`SCHEME_SLOTS`]; slots the theme leaves out are absent.
    #[serde(default)]
    pub colors: Vec<SchemeColor>,
    #[serde(default)]
    pub fonts: ThemeFonts,
}

impl ThemeInfo {
    pub fn color(&self, slot: &str) -> Option<Rgb> {
        self.colors.iter().find(|c| c.slot == slot).map(|c| c.rgb)
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.fonts == ThemeFonts::default()
    }
}

/// Text attributes as they appear on one layer of the cascade.
///
/// Used both for master-level defaults and for the overrides authored on a
/// single placeholder; every field is optional because each layer may leave
/// any attribute to the layer beneath it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ea_font_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
}

impl TextProps {
    /// Fill attributes that are still unset from `other` (first non-null wins).
    pub fn fill_from(&mut self, other: &TextProps) {
        macro_rules! fill {
            ($($field:ident),*) => {
                $(
                    if self.$field.is_none() && other.$field.is_some() {
                        self.$field = other.$field.clone();
                    }
                )*
            };
        }
        fill!(font_name, ea_font_name, size, bold, color, alignment);
    }

    pub fn is_empty(&self) -> bool {
        *self == TextProps::default()
    }
}

/// Master-level defaults for one style class.
pub type MasterTextStyle = TextProps;

/// Attributes authored directly on one placeholder. Presence here is what
/// makes a resolved attribute explicit.
pub type PlaceholderOverride = TextProps;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleClass {
    Title,
    Body,
    Other,
}

impl StyleClass {
    pub fn element_name(self) -> &'static str {
        match self {
            StyleClass::Title => "titleStyle",
            StyleClass::Body => "bodyStyle",
            StyleClass::Other => "otherStyle",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterStyles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<MasterTextStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<MasterTextStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<MasterTextStyle>,
}

impl MasterStyles {
    pub fn get(&self, class: StyleClass) -> Option<&MasterTextStyle> {
        match class {
            StyleClass::Title => self.title.as_ref(),
            StyleClass::Body => self.body.as_ref(),
            StyleClass::Other => self.other.as_ref(),
        }
    }

    pub fn set(&mut self, class: StyleClass, style: MasterTextStyle) {
        match class {
            StyleClass::Title => self.title = Some(style),
            StyleClass::Body => self.body = Some(style),
            StyleClass::Other => self.other = Some(style),
        }
    }
}

/// A resolved value tagged with where it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attr<T> {
    pub value: T,
    /// True only when the value was authored on the placeholder itself.
    pub explicit: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<Attr<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ea_font_name: Option<Attr<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Attr<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<Attr<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Attr<Rgb>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Attr<Alignment>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderRole {
    Title,
    Body,
    Picture,
    Fixed,
}

/// Shape geometry in EMU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Rect {
    pub fn width_in(&self) -> f64 {
        self.cx as f64 / EMU_PER_INCH
    }

    pub fn height_in(&self) -> f64 {
        self.cy as f64 / EMU_PER_INCH
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum LineSpacing {
    Multiple(f32), // 1.0 = single
    Points(f32),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Bullet {
    None,
    Char { char: String },
    AutoNum { scheme: String },
    Formatted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font: Option<String>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_spacing: Option<LineSpacing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_before: Option<f32>, // points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_after: Option<f32>, // points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<Bullet>,
}

impl ParagraphFormat {
    pub fn is_empty(&self) -> bool {
        *self == ParagraphFormat::default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderDescriptor {
    pub idx: u32,
    pub name: String,
    pub ph_type: String,
    pub role: PlaceholderRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
    #[serde(default)]
    pub style: ResolvedStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<ParagraphFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_wrap: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Shape,
    Picture,
    Connector,
    Group,
    GraphicFrame,
}

/// A non-placeholder shape drawn by a layout or master.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorativeShape {
    pub kind: ShapeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Rgb>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    pub catalog_index: usize,
    /// Absent in catalogs written before layouts were tracked per master.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_index: Option<usize>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_type: Option<String>,
    #[serde(default)]
    pub placeholders: Vec<PlaceholderDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_placeholders: Vec<PlaceholderDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorative_shapes: Vec<DecorativeShape>,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width_emu: i64,
    pub height_emu: i64,
    pub width_in: f64,
    pub height_in: f64,
}

impl CanvasSize {
    pub fn from_emu(width_emu: i64, height_emu: i64) -> Self {
        let round3 = |v: f64| (v * 1000.0).round() / 1000.0;
        Self {
            width_emu,
            height_emu,
            width_in: round3(width_emu as f64 / EMU_PER_INCH),
            height_in: round3(height_emu as f64 / EMU_PER_INCH),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedElement {
    pub idx: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

/// Footer/date/page-number block, taken from the first layout defining each.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedElements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<FixedElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<FixedElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_number: Option<FixedElement>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutCatalog {
    /// File stem of the template the catalog was scanned from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasSize>,
    #[serde(default)]
    pub theme: ThemeInfo,
    #[serde(default)]
    pub master_styles: MasterStyles,
    #[serde(default)]
    pub palette: BTreeMap<String, Rgb>,
    #[serde(default)]
    pub fixed_elements: FixedElements,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub master_shapes: Vec<DecorativeShape>,
    /// First thin, wide filled shape found on any layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_bar: Option<DecorativeShape>,
    /// `[0]=title, [1]=obj, ...`: every layout in linear order, by type or
    /// name, before deduplication.
    #[serde(default)]
    pub layouts_reference: String,
    pub layouts: Vec<LayoutDescriptor>,
}

impl LayoutCatalog {
    pub fn entry(&self, catalog_index: usize) -> Option<&LayoutDescriptor> {
        self.layouts
            .iter()
            .find(|l| l.catalog_index == catalog_index)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    List,
}

/// Content for one placeholder slot. `content` accepts any JSON value and is
/// coerced to text or items depending on `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotContent {
    #[serde(alias = "idx")]
    pub id: u32,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(rename = "type", default)]
    pub kind: ContentKind,
}

impl SlotContent {
    pub fn text(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            content: serde_json::Value::String(text.into()),
            kind: ContentKind::Text,
        }
    }

    pub fn list<S: Into<String>>(id: u32, items: impl IntoIterator<Item = S>) -> Self {
        Self {
            id,
            content: serde_json::Value::Array(
                items
                    .into_iter()
                    .map(|s| serde_json::Value::String(s.into()))
                    .collect(),
            ),
            kind: ContentKind::List,
        }
    }

    /// The content as a single string; lists are joined with ", ".
    pub fn as_text(&self) -> String {
        value_to_text(&self.content)
    }

    /// The content as list items; a non-list value becomes a single item.
    pub fn as_items(&self) -> Vec<String> {
        match &self.content {
            serde_json::Value::Array(items) => items.iter().map(value_to_text).collect(),
            other => vec![value_to_text(other)],
        }
    }
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideContentSpec {
    #[serde(default)]
    pub layout_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub placeholders: Vec<SlotContent>,
}

impl SlideContentSpec {
    /// Slot id → content, with the title mapped onto slot 0. Later entries
    /// for the same slot replace earlier ones.
    pub fn content_map(&self) -> BTreeMap<u32, SlotContent> {
        let mut map = BTreeMap::new();
        if let Some(title) = &self.title {
            map.insert(0, SlotContent::text(0, title.clone()));
        }
        for slot in &self.placeholders {
            map.insert(slot.id, slot.clone());
        }
        map
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_name: Option<String>,
    pub slides: Vec<SlideContentSpec>,
}
