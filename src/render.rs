//! PDF encoder – takes a [`DocumentLayout`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).

use printpdf::*;

use crate::document::{DocumentLayout, DrawItem, LineStroke, TextRun};
use crate::error::{PressError, Result};
use crate::fonts::FontFace;

/// Points to millimetres.
const PT_TO_MM: f32 = 0.352778;

/// Encode a layout into PDF bytes.
///
/// The layout is validated first; a page size that is not positive, a
/// document without pages, or any non-finite coordinate aborts the encode
/// and no bytes are returned.
pub fn render_pdf(layout: &DocumentLayout) -> Result<Vec<u8>> {
    validate(layout)?;
    log::trace!(
        "encoding {} page(s) with {} and {}",
        layout.pages.len(),
        FontFace::Regular.postscript_name(),
        FontFace::Bold.postscript_name()
    );

    let page_w = Mm(layout.page_width_pt * PT_TO_MM);
    let page_h = Mm(layout.page_height_pt * PT_TO_MM);

    let mut doc = PdfDocument::new(&layout.title);
    let pages = layout
        .pages
        .iter()
        .map(|page| {
            let mut ops = Vec::new();
            for item in &page.items {
                match item {
                    DrawItem::Text(run) => push_text(&mut ops, run, layout.page_height_pt),
                    DrawItem::Line(line) => push_line(&mut ops, line, layout.page_height_pt),
                }
            }
            PdfPage::new(page_w, page_h, ops)
        })
        .collect::<Vec<_>>();

    doc.with_pages(pages);
    let mut warnings = Vec::new();
    // Not `secure`: that mode drops the raw `Tj` operators from `push_text`.
    let options = PdfSaveOptions {
        secure: false,
        ..PdfSaveOptions::default()
    };
    let bytes = doc.save(&options, &mut warnings);
    if !warnings.is_empty() {
        log::debug!("printpdf reported {} warning(s) while saving", warnings.len());
    }
    if bytes.is_empty() {
        return Err(PressError::Encoding("writer produced no output".into()));
    }
    Ok(bytes)
}

fn validate(layout: &DocumentLayout) -> Result<()> {
    let positive = |v: f32| v.is_finite() && v > 0.0;
    if !positive(layout.page_width_pt) || !positive(layout.page_height_pt) {
        return Err(PressError::Encoding(format!(
            "invalid page size {}x{}",
            layout.page_width_pt, layout.page_height_pt
        )));
    }
    if layout.pages.is_empty() {
        return Err(PressError::Encoding("document has no pages".into()));
    }
    for page in &layout.pages {
        for item in &page.items {
            let finite = match item {
                DrawItem::Text(t) => [t.x, t.baseline_y, t.font_size].iter().all(|v| v.is_finite()),
                DrawItem::Line(l) => [l.x1, l.y1, l.x2, l.y2, l.thickness]
                    .iter()
                    .all(|v| v.is_finite()),
            };
            if !finite {
                return Err(PressError::Encoding(format!(
                    "non-finite coordinate on page {}",
                    page.page_index + 1
                )));
            }
        }
    }
    Ok(())
}

fn builtin(face: FontFace) -> BuiltinFont {
    match face {
        FontFace::Regular => BuiltinFont::Helvetica,
        FontFace::Bold => BuiltinFont::HelveticaBold,
    }
}

fn rgb_color(c: crate::style::Rgb) -> Color {
    let [r, g, b] = c.to_unit();
    Color::Rgb(Rgb {
        r,
        g,
        b,
        icc_profile: None,
    })
}

fn push_text(ops: &mut Vec<Op>, run: &TextRun, page_height: f32) {
    if run.text.is_empty() {
        return;
    }
    // PDF origin is bottom-left; layout origin is top-left.
    let font = builtin(run.face);
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(run.x),
            y: Pt(page_height - run.baseline_y),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(run.font_size),
        font,
    });
    ops.push(Op::SetFillColor {
        col: rgb_color(run.color),
    });
    // printpdf writes `TextItem::Text` as its UTF-8 bytes, which is wrong
    // under WinAnsiEncoding for anything past ASCII. The empty write only
    // registers the font resource; the text itself goes out as a raw `Tj`.
    ops.push(Op::WriteTextBuiltinFont {
        items: Vec::new(),
        font,
    });
    ops.push(Op::Unknown {
        key: "Tj".to_string(),
        value: vec![DictItem::String {
            data: to_winlatin(&run.text),
            literal: true,
        }],
    });
    ops.push(Op::EndTextSection);
}

fn push_line(ops: &mut Vec<Op>, line: &LineStroke, page_height: f32) {
    ops.push(Op::SetOutlineColor {
        col: rgb_color(line.color),
    });
    ops.push(Op::SetOutlineThickness {
        pt: Pt(line.thickness),
    });
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![
                LinePoint {
                    p: Point {
                        x: Pt(line.x1),
                        y: Pt(page_height - line.y1),
                    },
                    bezier: false,
                },
                LinePoint {
                    p: Point {
                        x: Pt(line.x2),
                        y: Pt(page_height - line.y2),
                    },
                    bezier: false,
                },
            ],
            is_closed: false,
        },
    });
}

/// Map text to WinAnsi (Windows-1252) bytes, the encoding printpdf declares
/// for its builtin fonts. Characters outside it become `?`.
fn to_winlatin(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82, // single low-9 quote
            '\u{201E}' => 0x84, // double low-9 quote
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{2122}' => 0x99, // trademark
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PageOps;
    use crate::style::Rgb as StyleRgb;

    fn one_page() -> DocumentLayout {
        let mut layout = DocumentLayout::a4();
        layout.pages.push(PageOps::default());
        layout
    }

    #[test]
    fn render_empty_page() {
        let bytes = render_pdf(&one_page()).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn no_pages_is_an_encoding_error() {
        let err = render_pdf(&DocumentLayout::a4()).unwrap_err();
        assert!(matches!(err, PressError::Encoding(_)));
    }

    #[test]
    fn non_finite_coordinates_abort() {
        let mut layout = one_page();
        layout.pages[0].items.push(DrawItem::Text(TextRun {
            text: "x".into(),
            x: f32::NAN,
            baseline_y: 10.0,
            font_size: 11.0,
            face: FontFace::Regular,
            color: StyleRgb::BLACK,
        }));
        assert!(matches!(render_pdf(&layout), Err(PressError::Encoding(_))));
    }

    #[test]
    fn winlatin_maps_bullet_and_unknowns() {
        let bytes = to_winlatin("\u{2022} \u{e9} \u{4e2d}");
        assert_eq!(bytes, vec![0x95, b' ', 0xE9, b' ', b'?']);
    }

    #[test]
    fn encoded_text_reads_back() {
        let mut layout = one_page();
        layout.pages.push(PageOps {
            page_index: 1,
            items: vec![DrawItem::Text(TextRun {
                text: "Hi there".into(),
                x: 36.0,
                baseline_y: 51.4,
                font_size: 11.0,
                face: FontFace::Bold,
                color: StyleRgb::new(255, 0, 0),
            })],
        });
        let bytes = render_pdf(&layout).unwrap();

        let mut warnings = Vec::new();
        let parsed = PdfDocument::parse(&bytes, &PdfParseOptions::default(), &mut warnings).unwrap();
        assert_eq!(parsed.pages.len(), 2);
        let texts: Vec<String> = parsed.pages[1]
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::WriteTextBuiltinFont { items, .. } => Some(items),
                _ => None,
            })
            .flatten()
            .filter_map(|item| match item {
                TextItem::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Hi there"]);
    }
}
