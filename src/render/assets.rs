use std::path::PathBuf;

use base64::Engine;

use crate::biodata::template::Layout;
use crate::biodata::TemplateChoice;
use crate::export::ExportError;
use crate::media::MediaStore;
use crate::models::Biodata;

use super::{render_markup, DocumentView};

/// Loads the images a document embeds and produces the final markup.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    border_dir: PathBuf,
    media: MediaStore,
}

impl AssetLoader {
    pub fn new(assets_dir: impl Into<PathBuf>, media: MediaStore) -> Self {
        Self {
            border_dir: assets_dir.into().join("border"),
            media,
        }
    }

    /// Render the document markup for `record`. Missing artwork degrades to a
    /// plain page rather than failing the render.
    pub async fn render(&self, record: &Biodata) -> Result<String, ExportError> {
        let template = record.template().map_err(ExportError::Render)?;
        let border_uri = self.border_uri(template).await;
        let portrait_uri = self.portrait_uri(record).await;
        let view = DocumentView::build(record, template, border_uri, portrait_uri);
        render_markup(&view).map_err(|e| ExportError::Render(e.to_string()))
    }

    /// Border artwork for centered layouts; the side-portrait layout has none.
    async fn border_uri(&self, template: TemplateChoice) -> Option<String> {
        if template.layout() == Layout::SidePortrait {
            return None;
        }
        let file = template.border_image();
        let path = self.border_dir.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(data_uri(file, &bytes)),
            Err(e) => {
                tracing::warn!("Border image {} unavailable: {e}", path.display());
                None
            }
        }
    }

    async fn portrait_uri(&self, record: &Biodata) -> Option<String> {
        let name = record.profile_image.as_deref()?;
        match self.media.read(name).await {
            Ok(bytes) => Some(data_uri(name, &bytes)),
            Err(e) => {
                tracing::warn!("Portrait for biodata {} unavailable: {e}", record.id);
                None
            }
        }
    }
}

pub fn data_uri(file_name: &str, bytes: &[u8]) -> String {
    let mime = mime_guess::from_path(file_name)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "image/jpeg".to_string());
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}
