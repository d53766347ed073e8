//! Flow layout engine – walks the DOM in document order and turns text into
//! wrapped, aligned lines on the [`DocumentWriter`].
//!
//! There is no box tree: block elements contribute their margins as vertical
//! gaps, every text node is wrapped on its own against the content width,
//! and list items are flattened into a single bulleted text block.

use crate::document::{LineStroke, TextRun};
use crate::dom::{DomNode, ElementNode, Tag};
use crate::fonts::{wrap_text, FontFace, FontMetrics};
use crate::pagination::PageCursor;
use crate::style::{resolve, ResolvedStyle, Rgb, TextAlign};
use crate::stylesheet::ClassStyleMap;
use crate::writer::DocumentWriter;

/// Gap above a horizontal rule.
const HR_GAP_BEFORE: f32 = 4.0;
/// Room reserved for, and gap below, a horizontal rule.
const HR_GAP_AFTER: f32 = 8.0;
const HR_THICKNESS: f32 = 0.8;
const HR_COLOR: Rgb = Rgb::new(209, 209, 209);

/// Indent of a list item: base plus a step per nesting level.
const LIST_INDENT_BASE: f32 = 10.0;
const LIST_INDENT_STEP: f32 = 8.0;
const BULLET: &str = "\u{2022} ";

/// One render's worth of layout state.
pub struct FlowLayout<'a> {
    writer: &'a mut DocumentWriter,
    cursor: PageCursor,
    classes: &'a ClassStyleMap,
    metrics: FontMetrics,
}

impl<'a> FlowLayout<'a> {
    pub fn new(writer: &'a mut DocumentWriter, cursor: PageCursor, classes: &'a ClassStyleMap) -> Self {
        Self {
            writer,
            cursor,
            classes,
            metrics: FontMetrics::new(),
        }
    }

    /// Lay out `nodes` (normally the children of `<body>`) with the root style.
    pub fn layout(&mut self, nodes: &[DomNode]) {
        let root = ResolvedStyle::default();
        for node in nodes {
            self.layout_node(node, &root, 0);
        }
    }

    fn layout_node(&mut self, node: &DomNode, inherited: &ResolvedStyle, list_depth: usize) {
        match node {
            DomNode::Text(text) => self.draw_text_block(text, inherited, 0.0),
            DomNode::Element(element) => self.layout_element(element, inherited, list_depth),
        }
    }

    fn layout_element(&mut self, element: &ElementNode, inherited: &ResolvedStyle, list_depth: usize) {
        if element.tag.is_non_content() {
            return;
        }

        let style = resolve(element, inherited, self.classes);

        match element.tag {
            Tag::Br => {
                self.cursor.gap(self.writer, style.line_height_pt());
                return;
            }
            Tag::Hr => {
                self.horizontal_rule();
                return;
            }
            _ => {}
        }

        let is_block = element.tag.is_block();
        if is_block {
            self.cursor.gap(self.writer, style.margin_top);
        }

        if element.tag == Tag::Li {
            let indent = LIST_INDENT_BASE + list_depth as f32 * LIST_INDENT_STEP;
            let text = format!("{BULLET}{}", element.text_content());
            self.draw_text_block(&text, &style, indent);
        } else if element.tag.is_list() {
            for child in &element.children {
                self.layout_node(child, &style, list_depth + 1);
            }
        } else if !element.children.is_empty() {
            for child in &element.children {
                self.layout_node(child, &style, list_depth);
            }
        } else {
            self.draw_text_block(&element.text_content(), &style, 0.0);
        }

        if is_block {
            self.cursor.gap(self.writer, style.margin_bottom);
        }
    }

    fn horizontal_rule(&mut self) {
        self.cursor.gap(self.writer, HR_GAP_BEFORE);
        self.cursor.ensure_room(self.writer, HR_GAP_AFTER);
        let y = self.cursor.y();
        let left = self.cursor.content_left();
        self.writer.draw_line(LineStroke {
            x1: left,
            y1: y,
            x2: left + self.cursor.content_width(),
            y2: y,
            thickness: HR_THICKNESS,
            color: HR_COLOR,
        });
        self.cursor.gap(self.writer, HR_GAP_AFTER);
    }

    /// Collapse whitespace, wrap, and draw one line per wrapped row.
    fn draw_text_block(&mut self, text: &str, style: &ResolvedStyle, indent: f32) {
        let collapsed = collapse_whitespace(text);
        if collapsed.is_empty() {
            return;
        }

        let face = FontFace::for_weight(style.is_bold());
        let font_size = style.font_size;
        let line_height = style.line_height_pt();
        let left = self.cursor.content_left() + indent;
        let max_width = (self.cursor.content_width() - indent).max(0.0);

        for line in wrap_text(&collapsed, font_size, face, max_width, &self.metrics) {
            self.cursor.ensure_room(self.writer, line_height);
            let width = self.metrics.measure_text_width(&line, font_size, face);
            let x = match style.text_align {
                TextAlign::Left => left,
                TextAlign::Center => left + (max_width - width) / 2.0,
                TextAlign::Right => left + max_width - width,
            };
            let baseline_y = self.cursor.y() + line_height;
            self.writer.draw_text(TextRun {
                text: line,
                x,
                baseline_y,
                font_size,
                face,
                color: style.color,
            });
            self.cursor.advance(line_height);
        }
    }
}

/// Runs of whitespace become one space; leading and trailing whitespace go.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentLayout, DrawItem, A4_HEIGHT_PT, A4_WIDTH_PT};
    use crate::dom::{body_children, parse_html, style_sheet_text};
    use crate::pagination::Margins;
    use crate::stylesheet::parse_style_sheet;

    fn lay_out(html: &str) -> DocumentLayout {
        let dom = parse_html(html);
        let classes = parse_style_sheet(&style_sheet_text(&dom));
        let mut writer = DocumentWriter::new("test", A4_WIDTH_PT, A4_HEIGHT_PT);
        let cursor = PageCursor::start(&mut writer, Margins::default());
        FlowLayout::new(&mut writer, cursor, &classes).layout(&body_children(&dom));
        writer.layout().clone()
    }

    fn texts(layout: &DocumentLayout) -> Vec<String> {
        layout.text_runs().map(|(_, r)| r.text.clone()).collect()
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn non_content_tags_are_skipped() {
        let layout = lay_out(
            "<html><head><title>T</title><style>.x{color:red}</style></head>\
             <body><script>var a = 1;</script><p>Visible</p></body></html>",
        );
        assert_eq!(texts(&layout), vec!["Visible"]);
    }

    #[test]
    fn first_line_sits_below_top_margin() {
        let layout = lay_out("<p>Hello</p>");
        let (_, run) = layout.text_runs().next().unwrap();
        // 11pt × 1.4
        assert!((run.baseline_y - (36.0 + 15.4)).abs() < 0.01);
        assert_eq!(run.x, 36.0);
    }

    #[test]
    fn block_margins_add_gaps() {
        let layout = lay_out("<h1>Title</h1><p>Body</p>");
        let runs: Vec<_> = layout.text_runs().map(|(_, r)| r.clone()).collect();
        // h1 line: 28 × 1.4 = 39.2; h1 margin-bottom 8; p line 15.4
        assert!((runs[0].baseline_y - (36.0 + 39.2)).abs() < 0.01);
        assert!((runs[1].baseline_y - (36.0 + 39.2 + 8.0 + 15.4)).abs() < 0.01);
        assert_eq!(runs[0].face, FontFace::Bold);
        assert_eq!(runs[1].face, FontFace::Regular);
    }

    #[test]
    fn alignment_shifts_lines() {
        let layout = lay_out(
            r#"<p style="text-align:center">Mid</p><p style="text-align:right">End</p>"#,
        );
        let runs: Vec<_> = layout.text_runs().map(|(_, r)| r.clone()).collect();
        let metrics = FontMetrics::new();
        let content = A4_WIDTH_PT - 72.0;
        let mid_w = metrics.measure_text_width("Mid", 11.0, FontFace::Regular);
        let end_w = metrics.measure_text_width("End", 11.0, FontFace::Regular);
        assert!((runs[0].x - (36.0 + (content - mid_w) / 2.0)).abs() < 0.01);
        assert!((runs[1].x + end_w - (A4_WIDTH_PT - 36.0)).abs() < 0.01);
    }

    #[test]
    fn list_items_are_bulleted_and_indented() {
        let layout = lay_out("<ul><li>One <b>bold</b></li><li>Two<ul><li>Deep</li></ul></li></ul>");
        let runs: Vec<_> = layout.text_runs().map(|(_, r)| r.clone()).collect();
        assert_eq!(runs[0].text, "\u{2022} One bold");
        assert_eq!(runs[0].x, 36.0 + 18.0);
        // The nested list is flattened into its parent item's text.
        assert_eq!(runs[1].text, "\u{2022} TwoDeep");
        assert_eq!(runs.len(), 2);
    }

    #[test]
    fn nested_list_depth_increases_indent() {
        let layout = lay_out("<ul><li>a</li></ul><ol><ol><li>b</li></ol></ol>");
        let runs: Vec<_> = layout.text_runs().map(|(_, r)| r.clone()).collect();
        assert_eq!(runs[0].x, 36.0 + 18.0);
        assert_eq!(runs[1].x, 36.0 + 26.0);
    }

    #[test]
    fn br_advances_one_line() {
        let layout = lay_out("<div>a<br>b</div>");
        let runs: Vec<_> = layout.text_runs().map(|(_, r)| r.clone()).collect();
        assert!((runs[1].baseline_y - runs[0].baseline_y - 2.0 * 15.4).abs() < 0.01);
    }

    #[test]
    fn hr_draws_a_stroke_across_content() {
        let layout = lay_out("<p>a</p><hr><p>b</p>");
        let line = layout.pages[0]
            .items
            .iter()
            .find_map(|i| match i {
                DrawItem::Line(l) => Some(l.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(line.x1, 36.0);
        assert!((line.x2 - (A4_WIDTH_PT - 36.0)).abs() < 0.01);
        assert_eq!(line.y1, line.y2);
        assert_eq!(line.color, HR_COLOR);
    }

    #[test]
    fn class_styles_apply() {
        let layout = lay_out(
            "<style>.alert { color: rgb(200,0,0); font-weight: 700 }</style>\
             <p class=\"alert\">Warn</p>",
        );
        let (_, run) = layout.text_runs().next().unwrap();
        assert_eq!(run.color, Rgb::new(200, 0, 0));
        assert_eq!(run.face, FontFace::Bold);
    }

    #[test]
    fn long_content_paginates_within_margins() {
        let mut html = String::new();
        for i in 0..120 {
            html.push_str(&format!("<p>Paragraph {i} with some words that need space.</p>"));
        }
        let layout = lay_out(&html);
        assert!(layout.pages.len() > 1);
        for (_, run) in layout.text_runs() {
            assert!(run.baseline_y <= A4_HEIGHT_PT - 36.0 + 0.001);
        }
    }
}
