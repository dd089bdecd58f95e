//! Corporate Culture Intelligence exports: CSV data, PDF report and PPTX deck
//! built from a survey wave's aggregate scores.

mod csv_export;
pub mod domain;
mod exporter;
pub mod locale;
pub mod pdf;
pub mod pptx;
mod render;

use crate::source::DataSourceError;

pub use csv_export::{build_csv, csv_filename, CSV_HEADER};
pub use domain::{
    sanitize_label, Artifact, BarrettProfile, CciOverview, ChartImage, ChartSet, CulturalWeb,
    CvfProfile, ExportFormat, ExportRequest, ExportScope, Initiative, Language, ANONYMITY_FLOOR,
};
pub use exporter::{ArtifactRenderer, CciExporter, RenderError};
pub use pdf::{layout_pdf, pdf_filename, PdfDocument, PdfElement};
pub use pptx::{build_deck, pptx_filename, SlideDeck, SlideKind, SlideVisual};
pub use render::{write_pdf, write_pptx, DocumentRenderer};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to fetch culture overview: {0}")]
    Source(#[from] DataSourceError),
    #[error("no culture overview for survey {survey_id} wave {wave_id}")]
    MissingOverview { survey_id: String, wave_id: String },
    #[error("culture overview has an unexpected shape: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to write csv: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}
