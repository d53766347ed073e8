//! Document layout – the record of everything the native engine drew, page
//! by page. It sits between layout and PDF encoding and serialises to JSON,
//! so a layout can be inspected, stored, and re-encoded later.
//!
//! Coordinates are in points with the origin at the top-left of the page.

use serde::{Deserialize, Serialize};

use crate::fonts::FontFace;
use crate::style::Rgb;

/// A4 in points.
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

/// A complete document ready for encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLayout {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "DocumentLayout::default_title")]
    pub title: String,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub pages: Vec<PageOps>,
}

/// The draw calls of one page, in draw order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageOps {
    pub page_index: usize,
    pub items: Vec<DrawItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DrawItem {
    Text(TextRun),
    Line(LineStroke),
}

/// A single line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    /// Distance of the baseline from the top of the page.
    pub baseline_y: f32,
    pub font_size: f32,
    pub face: FontFace,
    pub color: Rgb,
}

/// A straight stroke between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStroke {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub thickness: f32,
    pub color: Rgb,
}

impl DocumentLayout {
    pub fn new(title: impl Into<String>, page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            title: title.into(),
            page_width_pt,
            page_height_pt,
            pages: Vec::new(),
        }
    }

    /// An empty A4 document.
    pub fn a4() -> Self {
        Self::new(Self::default_title(), A4_WIDTH_PT, A4_HEIGHT_PT)
    }

    fn default_title() -> String {
        "pdf-press output".to_string()
    }

    /// Every text run in the document with the index of its page.
    pub fn text_runs(&self) -> impl Iterator<Item = (usize, &TextRun)> {
        self.pages.iter().flat_map(|page| {
            page.items.iter().filter_map(move |item| match item {
                DrawItem::Text(run) => Some((page.page_index, run)),
                DrawItem::Line(_) => None,
            })
        })
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl PageOps {
    pub fn text_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::Text(run) => Some(run),
            DrawItem::Line(_) => None,
        })
    }
}
