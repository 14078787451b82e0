//! HTML to PDF export through an external rendering engine.

pub mod chromium;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::Biodata;
use crate::render::AssetLoader;

pub use chromium::ChromiumEngine;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("rendering engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("rendering engine timed out after {0}s")]
    Timeout(u64),
    #[error("rendering engine failed: {0}")]
    EngineFailed(String),
    #[error("could not render document markup: {0}")]
    Render(String),
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can rasterise self-contained markup into a PDF.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, ExportError>;
}

/// A finished document ready for a response body or a mail attachment.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub filename: String,
    pub pdf: Vec<u8>,
}

/// Shared rendering + export service used by downloads and approvals.
#[derive(Clone)]
pub struct Exporter {
    assets: AssetLoader,
    engine: Arc<dyn PdfEngine>,
}

impl Exporter {
    pub fn new(assets: AssetLoader, engine: Arc<dyn PdfEngine>) -> Self {
        Self { assets, engine }
    }

    pub async fn html(&self, record: &Biodata) -> Result<String, ExportError> {
        self.assets.render(record).await
    }

    pub async fn pdf(&self, record: &Biodata) -> Result<ExportedDocument, ExportError> {
        let html = self.html(record).await?;
        let pdf = self.engine.render_pdf(&html).await?;
        Ok(ExportedDocument {
            filename: format!("biodata_{}.pdf", record.id),
            pdf,
        })
    }
}
