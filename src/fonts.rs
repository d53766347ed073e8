//! Text measurement for the two standard faces the native engine draws with.
//!
//! Both faces are PDF standard fonts (Helvetica, Helvetica-Bold), so their
//! advance widths are fixed by the font programs every viewer ships. The
//! tables below hold those widths in 1/1000 em for printable ASCII.

use serde::{Deserialize, Serialize};

/// One of the two faces embedded in every native document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFace {
    Regular,
    Bold,
}

impl FontFace {
    pub fn for_weight(bold: bool) -> Self {
        if bold {
            FontFace::Bold
        } else {
            FontFace::Regular
        }
    }

    pub fn postscript_name(self) -> &'static str {
        match self {
            FontFace::Regular => "Helvetica",
            FontFace::Bold => "Helvetica-Bold",
        }
    }
}

/// Helvetica advances for U+0020 ..= U+007E.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advances for U+0020 ..= U+007E.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for characters outside the tables.
const FALLBACK_ADVANCE: u16 = 556;

/// Measures strings in the standard faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontMetrics;

impl FontMetrics {
    pub fn new() -> Self {
        Self
    }

    fn advance(&self, ch: char, face: FontFace) -> u16 {
        let table = match face {
            FontFace::Regular => &HELVETICA,
            FontFace::Bold => &HELVETICA_BOLD,
        };
        match ch {
            ' '..='~' => table[ch as usize - 0x20],
            '\u{00A0}' => table[0],
            '\u{2022}' => 350,
            _ => FALLBACK_ADVANCE,
        }
    }

    /// Width of `text` in points at `font_size`.
    pub fn measure_text_width(&self, text: &str, font_size: f32, face: FontFace) -> f32 {
        let units: u32 = text.chars().map(|c| self.advance(c, face) as u32).sum();
        units as f32 * font_size / 1000.0
    }
}

/// Greedy word wrap: words are added to the current line while it still fits
/// `max_width`; the first word that overflows starts the next line. A single
/// word wider than `max_width` gets a line of its own.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    face: FontFace,
    max_width: f32,
    metrics: &FontMetrics,
) -> Vec<String> {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = first.to_string();
    for word in words {
        let candidate = format!("{current} {word}");
        if metrics.measure_text_width(&candidate, font_size, face) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    lines.push(current);
    lines
}
