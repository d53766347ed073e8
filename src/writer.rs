//! Document writer – the drawing surface the flow layout engine talks to.
//!
//! The writer owns the pages of one document. It records each draw call in a
//! [`DocumentLayout`] and only touches the PDF library in [`finish`], so a
//! failed encode never leaves partial output behind.
//!
//! [`finish`]: DocumentWriter::finish

use crate::document::{DocumentLayout, DrawItem, LineStroke, PageOps, TextRun};
use crate::error::Result;
use crate::fonts::FontFace;
use crate::render::render_pdf;

pub struct DocumentWriter {
    layout: DocumentLayout,
    fonts: [FontFace; 2],
}

impl DocumentWriter {
    /// A new document with no pages yet.
    pub fn new(title: impl Into<String>, page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            layout: DocumentLayout::new(title, page_width_pt, page_height_pt),
            fonts: [FontFace::Regular, FontFace::Bold],
        }
    }

    /// The faces embedded in the document: regular and bold, once each.
    pub fn fonts(&self) -> &[FontFace; 2] {
        &self.fonts
    }

    pub fn page_width(&self) -> f32 {
        self.layout.page_width_pt
    }

    pub fn page_height(&self) -> f32 {
        self.layout.page_height_pt
    }

    pub fn page_count(&self) -> usize {
        self.layout.pages.len()
    }

    /// Start a new page of the document's size; later draws land on it.
    /// Returns the new page's index.
    pub fn add_page(&mut self) -> usize {
        let page_index = self.layout.pages.len();
        self.layout.pages.push(PageOps {
            page_index,
            items: Vec::new(),
        });
        log::debug!("writer: page {} started", page_index + 1);
        page_index
    }

    pub fn draw_text(&mut self, run: TextRun) {
        self.current_page().items.push(DrawItem::Text(run));
    }

    pub fn draw_line(&mut self, line: LineStroke) {
        self.current_page().items.push(DrawItem::Line(line));
    }

    /// What has been drawn so far.
    pub fn layout(&self) -> &DocumentLayout {
        &self.layout
    }

    /// Encode the document. On failure nothing is returned but the error.
    pub fn finish(self) -> Result<(Vec<u8>, DocumentLayout)> {
        let bytes = render_pdf(&self.layout)?;
        Ok((bytes, self.layout))
    }

    fn current_page(&mut self) -> &mut PageOps {
        if self.layout.pages.is_empty() {
            self.add_page();
        }
        let last = self.layout.pages.len() - 1;
        &mut self.layout.pages[last]
    }
}
