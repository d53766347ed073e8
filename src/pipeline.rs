//! Native pipeline – ties together parsing, style sheet collection, flow
//! layout and PDF encoding into a single function call.

use crate::document::{DocumentLayout, A4_HEIGHT_PT, A4_WIDTH_PT};
use crate::dom::{body_children, parse_html, style_sheet_text};
use crate::error::Result;
use crate::layout::FlowLayout;
use crate::pagination::{Margins, PageCursor};
use crate::stylesheet::parse_style_sheet;
use crate::writer::DocumentWriter;

/// Page geometry and metadata for a native render.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Page width in points (default: A4 = 595.28).
    pub page_width: f32,
    /// Page height in points (default: A4 = 841.89).
    pub page_height: f32,
    pub margins: Margins,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "pdf-press output".to_string(),
            page_width: A4_WIDTH_PT,
            page_height: A4_HEIGHT_PT,
            margins: Margins::default(),
        }
    }
}

/// Lay out `html` without encoding it.
pub fn compute_document_layout(html: &str, config: &PipelineConfig) -> DocumentLayout {
    layout_into_writer(html, config).layout().clone()
}

/// Full pipeline: HTML string → PDF bytes plus the layout that was encoded.
pub fn generate_pdf(html: &str, config: &PipelineConfig) -> Result<(Vec<u8>, DocumentLayout)> {
    let writer = layout_into_writer(html, config);
    let (bytes, layout) = writer.finish()?;
    log::debug!(
        "native render: {} page(s), {} bytes",
        layout.pages.len(),
        bytes.len()
    );
    Ok((bytes, layout))
}

/// Convenience: generate a PDF with the default A4 config.
pub fn generate_pdf_from_html(html: &str) -> Result<Vec<u8>> {
    let (bytes, _) = generate_pdf(html, &PipelineConfig::default())?;
    Ok(bytes)
}

fn layout_into_writer(html: &str, config: &PipelineConfig) -> DocumentWriter {
    // 1. Parse HTML and collect the class rules from every <style> block
    let dom = parse_html(html);
    let classes = parse_style_sheet(&style_sheet_text(&dom));
    log::trace!("style sheet: {} class rule(s)", classes.len());

    // 2. Flow the body into pages
    let mut writer = DocumentWriter::new(&config.title, config.page_width, config.page_height);
    let cursor = PageCursor::start(&mut writer, config.margins);
    FlowLayout::new(&mut writer, cursor, &classes).layout(&body_children(&dom));
    writer
}
