use super::csv_export::build_csv;
use super::domain::{Artifact, CciOverview, ExportFormat, ExportRequest, ExportScope};
use super::pdf::{layout_pdf, pdf_filename, PdfDocument};
use super::pptx::{build_deck, pptx_filename, SlideDeck};
use super::ExportError;
use crate::source::{first_row, procedures, DataSource};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to package presentation: {0}")]
    Package(#[from] zip::result::ZipError),
}

/// Turns layout models into final document bytes.
pub trait ArtifactRenderer: Send + Sync {
    fn render_pdf(&self, document: &PdfDocument) -> Result<Vec<u8>, RenderError>;
    fn render_pptx(&self, deck: &SlideDeck) -> Result<Vec<u8>, RenderError>;
}

/// Fetches a wave's culture aggregate and renders it in the requested format.
pub struct CciExporter {
    source: Arc<dyn DataSource>,
    renderer: Arc<dyn ArtifactRenderer>,
    brand: String,
}

impl CciExporter {
    pub fn new(
        source: Arc<dyn DataSource>,
        renderer: Arc<dyn ArtifactRenderer>,
        brand: impl Into<String>,
    ) -> Self {
        Self {
            source,
            renderer,
            brand: brand.into(),
        }
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn fetch_overview(&self, scope: &ExportScope) -> Result<CciOverview, ExportError> {
        let raw = self.source.rpc(
            procedures::CCI_OVERVIEW,
            json!({
                "p_tenant": scope.tenant_id.as_str(),
                "p_survey": scope.survey_id,
                "p_wave": scope.wave_id,
            }),
        )?;
        let row = first_row(raw).ok_or_else(|| ExportError::MissingOverview {
            survey_id: scope.survey_id.clone(),
            wave_id: scope.wave_id.clone(),
        })?;
        serde_json::from_value(row).map_err(ExportError::Decode)
    }

    pub fn export(&self, request: &ExportRequest) -> Result<Artifact, ExportError> {
        let overview = self.fetch_overview(&request.scope)?;
        let artifact = self.render(request, &overview)?;

        info!(
            tenant = %request.scope.tenant_id,
            format = %request.format,
            filename = %artifact.filename,
            bytes = artifact.bytes.len(),
            suppressed = overview.is_suppressed(),
            "cci export generated"
        );
        self.remember(request, &overview, &artifact);
        Ok(artifact)
    }

    /// Builds the artifact from an already fetched overview.
    pub fn render(
        &self,
        request: &ExportRequest,
        overview: &CciOverview,
    ) -> Result<Artifact, ExportError> {
        let scope = &request.scope;
        match request.format {
            ExportFormat::Csv => build_csv(&self.brand, scope, overview),
            ExportFormat::Pdf => {
                let document = layout_pdf(
                    &self.brand,
                    scope,
                    overview,
                    &request.initiatives,
                    &request.charts,
                    request.language,
                );
                Ok(Artifact {
                    filename: pdf_filename(&self.brand, scope),
                    mime: ExportFormat::Pdf.mime(),
                    bytes: self.renderer.render_pdf(&document)?,
                })
            }
            ExportFormat::Pptx => {
                let deck = build_deck(
                    &self.brand,
                    scope,
                    overview,
                    &request.initiatives,
                    &request.charts,
                    request.language,
                );
                Ok(Artifact {
                    filename: pptx_filename(&self.brand, scope),
                    mime: ExportFormat::Pptx.mime(),
                    bytes: self.renderer.render_pptx(&deck)?,
                })
            }
        }
    }

    fn remember(&self, request: &ExportRequest, overview: &CciOverview, artifact: &Artifact) {
        let payload = json!({
            "p_tenant": request.scope.tenant_id.as_str(),
            "p_key": "cci_last_export",
            "p_value": {
                "survey_id": request.scope.survey_id,
                "wave_id": request.scope.wave_id,
                "format": request.format,
                "filename": artifact.filename,
                "n": overview.n,
            },
        });
        if let Err(err) = self.source.rpc(procedures::SESSION_MEMORY, payload) {
            warn!(error = %err, "session memory update skipped");
        }
    }
}
