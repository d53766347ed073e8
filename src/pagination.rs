//! Pagination – the vertical write position of a render and the rule for
//! when a new page starts.
//!
//! The cursor measures down from the top edge of the current page. Anything
//! about to be drawn first asks [`PageCursor::ensure_room`] for its height;
//! if the remaining space above the bottom margin is too small, the writer
//! gets a fresh page and the cursor goes back to the top margin.

use crate::writer::DocumentWriter;

/// Default page margins in points.
pub const PAGE_MARGIN_PT: f32 = 36.0;

/// Fixed page margins in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(pt: f32) -> Self {
        Self {
            top: pt,
            right: pt,
            bottom: pt,
            left: pt,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(PAGE_MARGIN_PT)
    }
}

/// Mutable page state of one render.
#[derive(Debug, Clone)]
pub struct PageCursor {
    /// Distance of the write position from the top of the current page.
    y: f32,
    page_width: f32,
    page_height: f32,
    margins: Margins,
}

impl PageCursor {
    /// Open the first page on `writer` and place the cursor at its top margin.
    pub fn start(writer: &mut DocumentWriter, margins: Margins) -> Self {
        writer.add_page();
        Self {
            y: margins.top,
            page_width: writer.page_width(),
            page_height: writer.page_height(),
            margins,
        }
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    /// Lowest y anything may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.page_height - self.margins.bottom
    }

    pub fn content_left(&self) -> f32 {
        self.margins.left
    }

    pub fn content_width(&self) -> f32 {
        (self.page_width - self.margins.left - self.margins.right).max(0.0)
    }

    fn at_page_top(&self) -> bool {
        self.y <= self.margins.top
    }

    /// Make sure `height` points fit below the cursor, starting a new page if
    /// they do not. A page with nothing on it yet is never abandoned: content
    /// taller than a whole page is drawn there rather than looping.
    pub fn ensure_room(&mut self, writer: &mut DocumentWriter, height: f32) {
        if self.y + height <= self.bottom_limit() || self.at_page_top() {
            return;
        }
        let page = writer.add_page();
        log::debug!(
            "pagination: {height:.1}pt does not fit at y={:.1}, continuing on page {}",
            self.y,
            page + 1
        );
        self.y = self.margins.top;
    }

    pub fn advance(&mut self, height: f32) {
        self.y += height;
    }

    /// Reserve room for a blank gap and step over it.
    pub fn gap(&mut self, writer: &mut DocumentWriter, height: f32) {
        if height <= 0.0 {
            return;
        }
        self.ensure_room(writer, height);
        self.advance(height);
    }
}
