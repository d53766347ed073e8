//! Style resolver – maps tag defaults, class rules from `<style>` blocks and
//! inline `style` attributes onto a flat [`ResolvedStyle`] per element.
//!
//! Only a fixed subset of CSS is honoured: `font-size`, `font-weight`,
//! `color`, `line-height`, `margin-top`, `margin-bottom` and `text-align`.
//! Anything else is ignored, and a value that fails to parse leaves the
//! property unset so the inherited value stands.

use serde::{Deserialize, Serialize};

use crate::dom::{ElementNode, Tag};
use crate::stylesheet::ClassStyleMap;

/// Pixels to points.
const PX_TO_PT: f32 = 0.75;

/// Stored line-height values above this are absolute points, values at or
/// below it are multipliers of the font size.
const LINE_HEIGHT_ABSOLUTE_THRESHOLD: f32 = 3.0;

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels scaled to 0.0 – 1.0 for the PDF colour operators.
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    /// Parse `#rgb`, `#rrggbb` or `rgb(r, g, b)`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        match value.strip_prefix('#') {
            Some(hex) => Self::from_hex(hex),
            None => Self::from_rgb_function(&value),
        }
    }

    fn from_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => Some(Self::new(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    fn from_rgb_function(value: &str) -> Option<Self> {
        let inner = value.strip_prefix("rgb(")?.strip_suffix(')')?;
        let channels: Vec<&str> = inner.split(',').map(str::trim).collect();
        if channels.len() != 3 {
            return None;
        }
        let mut out = [0u8; 3];
        for (slot, raw) in out.iter_mut().zip(&channels) {
            if raw.is_empty() || raw.len() > 3 || !raw.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            // "256" parses as u16 but not as u8, which is the range check.
            *slot = u8::try_from(raw.parse::<u16>().ok()?).ok()?;
        }
        Some(Self::new(out[0], out[1], out[2]))
    }
}

// ---------------------------------------------------------------------------
// Resolved and partial styles
// ---------------------------------------------------------------------------

/// The fully merged rendering properties of one element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStyle {
    /// Points.
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub color: Rgb,
    /// Multiplier or absolute points; see [`line_height_points`].
    pub line_height: f32,
    /// Points.
    pub margin_top: f32,
    /// Points.
    pub margin_bottom: f32,
    pub text_align: TextAlign,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            font_size: 11.0,
            font_weight: FontWeight::Normal,
            color: Rgb::BLACK,
            line_height: 1.4,
            margin_top: 0.0,
            margin_bottom: 0.0,
            text_align: TextAlign::Left,
        }
    }
}

impl ResolvedStyle {
    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    /// Line advance in points for this style.
    pub fn line_height_pt(&self) -> f32 {
        line_height_points(self.line_height, self.font_size)
    }
}

/// Convert a stored line-height into points.
///
/// A stored value above 3 is taken as already being points, anything else as
/// a multiplier of `font_size`. This means an absolute line-height of 3pt or
/// less is read as a multiplier; keep every interpretation of `line_height`
/// behind this function so the rule can be replaced by explicit units.
pub fn line_height_points(value: f32, font_size: f32) -> f32 {
    if value > LINE_HEIGHT_ABSOLUTE_THRESHOLD {
        value
    } else {
        value * font_size
    }
}

/// A set of explicitly declared properties. `None` means "not declared".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialStyle {
    pub font_size: Option<f32>,
    pub font_weight: Option<FontWeight>,
    pub color: Option<Rgb>,
    pub line_height: Option<f32>,
    pub margin_top: Option<f32>,
    pub margin_bottom: Option<f32>,
    pub text_align: Option<TextAlign>,
}

impl PartialStyle {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Property-wise merge: every property `later` declares wins.
    pub fn merge(&mut self, later: &PartialStyle) {
        self.font_size = later.font_size.or(self.font_size);
        self.font_weight = later.font_weight.or(self.font_weight);
        self.color = later.color.or(self.color);
        self.line_height = later.line_height.or(self.line_height);
        self.margin_top = later.margin_top.or(self.margin_top);
        self.margin_bottom = later.margin_bottom.or(self.margin_bottom);
        self.text_align = later.text_align.or(self.text_align);
    }

    /// Apply the declared properties on top of a resolved style.
    pub fn overlay(&self, style: &mut ResolvedStyle) {
        if let Some(v) = self.font_size {
            style.font_size = v;
        }
        if let Some(v) = self.font_weight {
            style.font_weight = v;
        }
        if let Some(v) = self.color {
            style.color = v;
        }
        if let Some(v) = self.line_height {
            style.line_height = v;
        }
        if let Some(v) = self.margin_top {
            style.margin_top = v;
        }
        if let Some(v) = self.margin_bottom {
            style.margin_bottom = v;
        }
        if let Some(v) = self.text_align {
            style.text_align = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Declaration parsing
// ---------------------------------------------------------------------------

/// Parse a declaration block (`font-size: 12px; color: #333`).
pub fn parse_declarations(css: &str) -> PartialStyle {
    let mut out = PartialStyle::default();
    for decl in css.split(';') {
        let Some((prop, val)) = decl.split_once(':') else {
            continue;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let val = val.trim().trim_end_matches("!important").trim();
        if prop.is_empty() || val.is_empty() {
            continue;
        }
        apply_declaration(&mut out, &prop, val);
    }
    out
}

fn apply_declaration(s: &mut PartialStyle, prop: &str, val: &str) {
    match prop {
        "font-size" => {
            if let Some(pt) = parse_length(val).filter(|pt| *pt > 0.0) {
                s.font_size = Some(pt);
            }
        }
        "font-weight" => s.font_weight = Some(parse_font_weight(val)),
        "color" => {
            if let Some(c) = Rgb::parse(val) {
                s.color = Some(c);
            }
        }
        "line-height" => {
            if let Ok(multiplier) = val.parse::<f32>() {
                if multiplier.is_finite() && multiplier > 0.0 {
                    s.line_height = Some(multiplier);
                }
            } else if let Some(pt) = parse_length(val).filter(|pt| *pt > 0.0) {
                s.line_height = Some(pt);
            }
        }
        "margin-top" => {
            if let Some(pt) = parse_length(val) {
                s.margin_top = Some(pt);
            }
        }
        "margin-bottom" => {
            if let Some(pt) = parse_length(val) {
                s.margin_bottom = Some(pt);
            }
        }
        "text-align" => {
            s.text_align = match val.to_ascii_lowercase().as_str() {
                "left" => Some(TextAlign::Left),
                "center" => Some(TextAlign::Center),
                "right" => Some(TextAlign::Right),
                _ => s.text_align,
            }
        }
        _ => {}
    }
}

/// Parse a length into points: `px` is scaled by 0.75, `pt` and bare numbers
/// pass through, any other unit is rejected.
pub fn parse_length(val: &str) -> Option<f32> {
    let val = val.trim().to_ascii_lowercase();
    let (number, scale) = if let Some(n) = val.strip_suffix("px") {
        (n, PX_TO_PT)
    } else if let Some(n) = val.strip_suffix("pt") {
        (n, 1.0)
    } else {
        (val.as_str(), 1.0)
    };
    let parsed: f32 = number.trim().parse().ok()?;
    parsed.is_finite().then_some(parsed * scale)
}

fn parse_font_weight(val: &str) -> FontWeight {
    let val = val.trim().to_ascii_lowercase();
    if val == "bold" || val.parse::<u32>().is_ok_and(|w| w >= 600) {
        FontWeight::Bold
    } else {
        FontWeight::Normal
    }
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

/// Intrinsic defaults for a tag.
pub fn tag_defaults(tag: &Tag) -> PartialStyle {
    let heading = |size: f32, mb: f32| PartialStyle {
        font_size: Some(size),
        font_weight: Some(FontWeight::Bold),
        margin_bottom: Some(mb),
        ..PartialStyle::default()
    };
    let bottom = |mb: f32| PartialStyle {
        margin_bottom: Some(mb),
        ..PartialStyle::default()
    };
    match tag {
        Tag::H1 => heading(28.0, 8.0),
        Tag::H2 => heading(22.0, 6.0),
        Tag::H3 => heading(18.0, 5.0),
        Tag::H4 => heading(15.0, 4.0),
        Tag::H5 => heading(13.0, 4.0),
        Tag::H6 => heading(11.0, 3.0),
        Tag::P | Tag::Section | Tag::Article => bottom(6.0),
        Tag::Div | Tag::Ul | Tag::Ol => bottom(4.0),
        Tag::Header => bottom(8.0),
        Tag::Li => bottom(2.0),
        Tag::Footer => PartialStyle {
            margin_top: Some(8.0),
            ..PartialStyle::default()
        },
        Tag::Strong | Tag::B => PartialStyle {
            font_weight: Some(FontWeight::Bold),
            ..PartialStyle::default()
        },
        _ => PartialStyle::default(),
    }
}

/// Resolve the style of `element`: inherited style, then tag defaults, then
/// matching class rules in the order they were first declared, then the
/// inline `style` attribute.
pub fn resolve(
    element: &ElementNode,
    inherited: &ResolvedStyle,
    classes: &ClassStyleMap,
) -> ResolvedStyle {
    let mut style = *inherited;
    tag_defaults(&element.tag).overlay(&mut style);
    classes.matching(&element.classes()).overlay(&mut style);
    if let Some(inline) = element.inline_style() {
        parse_declarations(inline).overlay(&mut style);
    }
    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylesheet::parse_style_sheet;

    fn element(tag: Tag, attrs: &[(&str, &str)]) -> ElementNode {
        let mut e = ElementNode::new(tag);
        for (k, v) in attrs {
            e.attributes.insert(k.to_string(), v.to_string());
        }
        e
    }

    #[test]
    fn hex_and_rgb_forms_agree() {
        let white = Rgb::new(255, 255, 255);
        assert_eq!(Rgb::parse("#fff"), Some(white));
        assert_eq!(Rgb::parse("#ffffff"), Some(white));
        assert_eq!(Rgb::parse("rgb(255,255,255)"), Some(white));
        assert_eq!(Rgb::parse("RGB( 255 , 255 , 255 )"), Some(white));
    }

    #[test]
    fn bad_colours_are_rejected() {
        assert_eq!(Rgb::parse("rgb(256,0,0)"), None);
        assert_eq!(Rgb::parse("rgb(-1,0,0)"), None);
        assert_eq!(Rgb::parse("#ffff"), None);
        assert_eq!(Rgb::parse("#ggg"), None);
        assert_eq!(Rgb::parse("red"), None);
        assert_eq!(Rgb::parse("rgba(0,0,0,1)"), None);
    }

    #[test]
    fn invalid_colour_leaves_inherited_value() {
        let parent = ResolvedStyle {
            color: Rgb::new(1, 2, 3),
            ..ResolvedStyle::default()
        };
        let e = element(Tag::Span, &[("style", "color: rgb(256,0,0)")]);
        let style = resolve(&e, &parent, &ClassStyleMap::default());
        assert_eq!(style.color, Rgb::new(1, 2, 3));
    }

    #[test]
    fn lengths_convert_to_points() {
        assert_eq!(parse_length("16px"), Some(12.0));
        assert_eq!(parse_length("12pt"), Some(12.0));
        assert_eq!(parse_length("9"), Some(9.0));
        assert_eq!(parse_length("2em"), None);
        assert_eq!(parse_length("abc"), None);
    }

    #[test]
    fn font_weight_threshold() {
        let s = parse_declarations("font-weight: 600");
        assert_eq!(s.font_weight, Some(FontWeight::Bold));
        let s = parse_declarations("font-weight: 500");
        assert_eq!(s.font_weight, Some(FontWeight::Normal));
        let s = parse_declarations("FONT-WEIGHT: bold");
        assert_eq!(s.font_weight, Some(FontWeight::Bold));
    }

    #[test]
    fn line_height_multiplier_vs_points() {
        let s = parse_declarations("line-height: 1.5");
        assert_eq!(s.line_height, Some(1.5));
        let s = parse_declarations("line-height: 24px");
        assert_eq!(s.line_height, Some(18.0));
        assert_eq!(line_height_points(1.5, 10.0), 15.0);
        assert_eq!(line_height_points(18.0, 10.0), 18.0);
    }

    #[test]
    fn unknown_properties_are_ignored() {
        let s = parse_declarations("display: flex; padding: 4px; text-align: justify");
        assert!(s.is_empty());
    }

    #[test]
    fn cascade_order_is_inherited_tag_class_inline() {
        let classes = parse_style_sheet(".big { font-size: 20pt; color: #00ff00 }");
        let e = element(
            Tag::H1,
            &[("class", "big"), ("style", "color: #0000ff")],
        );
        let style = resolve(&e, &ResolvedStyle::default(), &classes);
        // class beats tag default for font size
        assert_eq!(style.font_size, 20.0);
        // tag default still applies where the class is silent
        assert!(style.is_bold());
        assert_eq!(style.margin_bottom, 8.0);
        // inline beats class
        assert_eq!(style.color, Rgb::new(0, 0, 255));
    }

    #[test]
    fn margins_inherit_from_parent() {
        let parent = resolve(
            &element(Tag::Footer, &[]),
            &ResolvedStyle::default(),
            &ClassStyleMap::default(),
        );
        let child = resolve(&element(Tag::P, &[]), &parent, &ClassStyleMap::default());
        assert_eq!(child.margin_top, 8.0);
        assert_eq!(child.margin_bottom, 6.0);
    }
}
