//! Byte-level writers for the report layouts.

mod pdf_writer;
mod png;
mod pptx_writer;

use super::exporter::{ArtifactRenderer, RenderError};
use super::pdf::PdfDocument;
use super::pptx::SlideDeck;

pub use pdf_writer::write_pdf;
pub use pptx_writer::write_pptx;

/// Writes PDF 1.4 files and PPTX packages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentRenderer;

impl ArtifactRenderer for DocumentRenderer {
    fn render_pdf(&self, document: &PdfDocument) -> Result<Vec<u8>, RenderError> {
        write_pdf(document)
    }

    fn render_pptx(&self, deck: &SlideDeck) -> Result<Vec<u8>, RenderError> {
        write_pptx(deck)
    }
}
