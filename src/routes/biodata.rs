use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::extractor::AuthUser;
use crate::biodata::normalize::normalize_payload;
use crate::biodata::{ApprovalStatus, TemplateChoice};
use crate::db;
use crate::db::biodata::BiodataFields;
use crate::error::AppError;
use crate::export::ExportedDocument;
use crate::media::{MediaKind, MediaStore};
use crate::models::{Biodata, BiodataResponse};
use crate::rate_limit::{SUBMISSION_LIMIT, SUBMISSION_WINDOW_SECS};
use crate::state::SharedState;
use crate::submission::{metadata, parser, FormData};

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Page/per-page with the bounds every list endpoint shares.
pub fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    (page, per_page, (page - 1) * per_page)
}

pub async fn find_or_404(state: &SharedState, id: i64) -> Result<Biodata, AppError> {
    db::biodata::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Biodata not found".to_string()))
}

/// Save an uploaded file from `form` under `field`, returning its stored name.
async fn store_upload(
    media: &MediaStore,
    form: &mut FormData,
    field: &str,
    kind: MediaKind,
) -> Result<Option<String>, AppError> {
    match form.take_file(field) {
        Some(file) => Ok(Some(media.save(kind, &file.file_name, &file.bytes).await?)),
        None => Ok(None),
    }
}

fn parse_template(raw: Option<&str>) -> Result<TemplateChoice, AppError> {
    TemplateChoice::parse_stored(raw).map_err(AppError::BadRequest)
}

/// Merge submitted fields over `base`. With `partial` unset, absent text
/// fields reset to empty as a full replacement would.
async fn merge_form(
    state: &SharedState,
    mut form: FormData,
    base: BiodataFields,
    partial: bool,
) -> Result<BiodataFields, AppError> {
    let text = |form: &FormData, name: &str, current: String| match form.text(name) {
        Some(value) => value,
        None if partial => current,
        None => String::new(),
    };

    let template_raw = form.text("template_choice");
    let template_choice = match (template_raw.as_deref(), partial) {
        (None, true) => base.template_choice.clone(),
        (raw, _) => parse_template(raw)?.to_string(),
    };

    let data = match form.payload().map_err(AppError::BadRequest)? {
        Some(payload) => normalize_payload(&payload),
        None if partial => base.data.clone(),
        None => normalize_payload(&json!({})),
    };

    let profile_image = store_upload(&state.media, &mut form, "profile_image", MediaKind::Profile)
        .await?
        .or(base.profile_image.clone());
    let payment_screenshot =
        store_upload(&state.media, &mut form, "payment_screenshot", MediaKind::Payment)
            .await?
            .or(base.payment_screenshot.clone());

    Ok(BiodataFields {
        title: text(&form, "title", base.title),
        data,
        template_choice,
        user_name: text(&form, "user_name", base.user_name),
        user_email: text(&form, "user_email", base.user_email).trim().to_string(),
        user_phone: text(&form, "user_phone", base.user_phone),
        profile_image,
        payment_screenshot,
    })
}

pub async fn create(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<BiodataResponse>), AppError> {
    let ip = metadata::client_ip(&headers, Some(addr.ip()), &state.config.trusted_proxies);
    if let Err(retry_after) = state
        .submission_limiter
        .check(ip, SUBMISSION_LIMIT, SUBMISSION_WINDOW_SECS)
    {
        return Err(AppError::RateLimited(format!(
            "Too many submissions. Try again in {retry_after}s."
        )));
    }

    let form = parser::parse_request(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;
    // Reject a bad selector before any upload touches the disk.
    let template = parse_template(form.text("template_choice").as_deref())?;

    let fields = merge_form(&state, form, BiodataFields::default(), false).await?;
    let is_approved = ApprovalStatus::approved_on_create(template);
    let record = db::biodata::create(&state.pool, &fields, is_approved).await?;

    tracing::info!(
        "Biodata {} submitted with template {template} (approved: {is_approved})",
        record.id
    );
    Ok((StatusCode::CREATED, Json(record.to_response(&state.media))))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;
    let (page, per_page, offset) = page_bounds(params.page, params.per_page);

    let list_params = db::biodata::ListParams {
        limit: per_page,
        offset,
        ..Default::default()
    };
    let records = db::biodata::list(&state.pool, &list_params).await?;
    let total = db::biodata::count(&state.pool, &list_params).await?;

    let items: Vec<BiodataResponse> = records.iter().map(|r| r.to_response(&state.media)).collect();
    Ok(Json(json!({
        "biodata": items,
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": (total + per_page - 1) / per_page,
    })))
}

/// Admins see everything; other callers only records submitted under their email.
fn require_owner_or_admin(auth: &AuthUser, record: &Biodata) -> Result<(), AppError> {
    if auth.is_admin || record.user_email.eq_ignore_ascii_case(&auth.email) {
        Ok(())
    } else {
        Err(AppError::NotFound("Biodata not found".to_string()))
    }
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<BiodataResponse>, AppError> {
    let record = find_or_404(&state, id).await?;
    require_owner_or_admin(&auth, &record)?;
    Ok(Json(record.to_response(&state.media)))
}

async fn save_update(
    auth: AuthUser,
    state: SharedState,
    id: i64,
    headers: HeaderMap,
    body: Bytes,
    partial: bool,
) -> Result<Json<BiodataResponse>, AppError> {
    auth.require_admin()?;
    let existing = find_or_404(&state, id).await?;

    let form = parser::parse_request(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;
    let fields = merge_form(&state, form, BiodataFields::from(&existing), partial).await?;

    let record = db::biodata::update(&state.pool, id, &fields)
        .await?
        .ok_or_else(|| AppError::NotFound("Biodata not found".to_string()))?;
    Ok(Json(record.to_response(&state.media)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BiodataResponse>, AppError> {
    save_update(auth, state, id, headers, body, false).await
}

pub async fn patch(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BiodataResponse>, AppError> {
    save_update(auth, state, id, headers, body, true).await
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    if !db::biodata::delete(&state.pool, id).await? {
        return Err(AppError::NotFound("Biodata not found".to_string()));
    }
    tracing::info!("Biodata {id} deleted by {}", auth.email);
    Ok(StatusCode::NO_CONTENT)
}

/// PDF as a download attachment.
pub fn pdf_response(document: ExportedDocument) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ),
        ],
        document.pdf,
    )
        .into_response()
}

/// Direct download for approved free-tier records.
pub async fn pdf(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let record = find_or_404(&state, id).await?;
    let template = record.template().map_err(AppError::BadRequest)?;
    if !template.is_free() {
        return Err(AppError::Forbidden(
            "Direct download is only available for the free template".to_string(),
        ));
    }
    record.status().require_approved()?;

    let document = state.exporter.pdf(&record).await?;
    Ok(pdf_response(document))
}

/// Untokenized HTML preview of an approved record.
pub async fn html(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let record = find_or_404(&state, id).await?;
    record.status().require_approved()?;
    Ok(Html(state.exporter.html(&record).await?))
}
