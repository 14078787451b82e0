use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::biodata::{find_or_404, pdf_response};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct DownloadParams {
    pub format: Option<String>,
}

/// Tokenized download. The token is checked before the record is loaded so a
/// bad link never reveals whether the id exists.
pub async fn download(
    State(state): State<SharedState>,
    Path((id, token)): Path<(i64, String)>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, AppError> {
    state.signer.verify(&token, id)?;

    let record = find_or_404(&state, id).await?;
    record.status().require_approved()?;

    match params.format.as_deref() {
        Some("pdf") => {
            let document = state.exporter.pdf(&record).await?;
            Ok(pdf_response(document))
        }
        _ => Ok(Html(state.exporter.html(&record).await?).into_response()),
    }
}
