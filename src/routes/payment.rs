use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::extractor::MaybeAuthUser;
use crate::db;
use crate::error::AppError;
use crate::media::MediaKind;
use crate::models::Biodata;
use crate::state::SharedState;
use crate::submission::parser;

/// Attach a proof-of-payment screenshot to a record.
///
/// The target is, in order: the explicit `biodata_id`/`biodataId`, the
/// caller's most recent record (matched by email), or the most recent record
/// with no proof yet. An explicit id that matches nothing falls through to the
/// next rule.
pub async fn verify(
    MaybeAuthUser(auth): MaybeAuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let mut form = parser::parse_request(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;

    let screenshot = form
        .take_file("screenshot")
        .ok_or_else(|| AppError::BadRequest("screenshot file is required".to_string()))?;

    let explicit_id = form
        .text("biodata_id")
        .or_else(|| form.text("biodataId"))
        .and_then(|raw| raw.trim().parse::<i64>().ok());

    let target = resolve_target(&state, explicit_id, auth.as_ref().map(|a| a.email.as_str()))
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(
                "Could not find a Biodata record to attach the screenshot to. \
                 Provide biodata_id or ensure you are authenticated."
                    .to_string(),
            )
        })?;

    let stored = state
        .media
        .save(MediaKind::Payment, &screenshot.file_name, &screenshot.bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to save screenshot: {e}")))?;

    db::biodata::set_payment_proof(&state.pool, target.id, &stored)
        .await?
        .ok_or_else(|| AppError::NotFound("Biodata not found".to_string()))?;

    tracing::info!("Payment proof attached to biodata {}", target.id);
    Ok(Json(json!({ "success": true, "biodata_id": target.id })))
}

async fn resolve_target(
    state: &SharedState,
    explicit_id: Option<i64>,
    caller_email: Option<&str>,
) -> Result<Option<Biodata>, AppError> {
    if let Some(id) = explicit_id {
        if let Some(record) = db::biodata::find_by_id(&state.pool, id).await? {
            return Ok(Some(record));
        }
        tracing::debug!("Payment proof for unknown biodata {id}; falling back");
    }

    if let Some(email) = caller_email.filter(|e| !e.trim().is_empty()) {
        if let Some(record) = db::biodata::find_latest_by_email(&state.pool, email).await? {
            return Ok(Some(record));
        }
    }

    Ok(db::biodata::find_latest_without_proof(&state.pool).await?)
}
