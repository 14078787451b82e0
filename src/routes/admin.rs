use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::approval::{self, ApprovalReport};
use crate::auth::extractor::AuthUser;
use crate::biodata::TemplateChoice;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Biodata, BiodataResponse};
use crate::repair::{self, PayloadIssue};
use crate::routes::biodata::page_bounds;
use crate::state::SharedState;

#[derive(Deserialize, Default)]
pub struct AdminListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub is_approved: Option<bool>,
    pub template_choice: Option<String>,
    pub search: Option<String>,
}

impl AdminListParams {
    pub fn to_db(&self) -> Result<db::biodata::ListParams, AppError> {
        let (_, per_page, offset) = page_bounds(self.page, self.per_page);
        let template_choice = self
            .template_choice
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<TemplateChoice>().map(|t| t.to_string()))
            .transpose()
            .map_err(AppError::BadRequest)?;
        Ok(db::biodata::ListParams {
            limit: per_page,
            offset,
            is_approved: self.is_approved,
            template_choice,
            search: self.search.clone(),
        })
    }
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<AdminListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;
    let (page, per_page, _) = page_bounds(params.page, params.per_page);
    let list_params = params.to_db()?;

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

#[derive(Deserialize)]
pub struct ApproveRequest {
    pub ids: Vec<i64>,
}

pub async fn approve(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<ApprovalReport>, AppError> {
    auth.require_admin()?;
    if req.ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }

    let mut seen = std::collections::HashSet::new();
    let mut ids = req.ids;
    ids.retain(|id| seen.insert(*id));
    let report = approval::approve_batch(&state, &ids, Some(auth.user_id)).await;
    Ok(Json(report))
}

pub async fn export_csv(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;
    let records = db::biodata::list_all(&state.pool).await?;
    let csv = records_csv(&records, &state.media);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"biodata.csv\"",
            ),
        ],
        csv,
    ))
}

pub fn records_csv(records: &[Biodata], media: &crate::media::MediaStore) -> String {
    use std::fmt::Write;
    let mut csv = String::new();
    let _ = writeln!(
        csv,
        "id,title,user_name,user_email,template_choice,is_approved,created_at,payment_screenshot"
    );
    for r in records {
        let screenshot = r
            .payment_screenshot
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| media.url(s))
            .unwrap_or_default();
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{}",
            r.id,
            csv_escape(&r.title),
            csv_escape(&r.user_name),
            csv_escape(&r.user_email),
            csv_escape(&r.template_choice),
            r.is_approved,
            r.created_at.to_rfc3339(),
            csv_escape(&screenshot),
        );
    }
    csv
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub async fn repair_payloads(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;
    let repaired = repair::repair_all(&state.pool).await?;
    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "biodata.repaired",
        "biodata",
        None,
        Some(json!({ "repaired": repaired })),
    )
    .await;
    Ok(Json(json!({ "repaired": repaired })))
}

pub async fn check_payloads(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<PayloadIssue>>, AppError> {
    auth.require_admin()?;
    Ok(Json(repair::check_all(&state.pool).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_escape_quotes_only_when_needed() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn admin_list_rejects_unknown_template_filter() {
        let params = AdminListParams {
            template_choice: Some("9".to_string()),
            ..Default::default()
        };
        assert!(params.to_db().is_err());

        let params = AdminListParams {
            template_choice: Some("5".to_string()),
            ..Default::default()
        };
        assert_eq!(params.to_db().unwrap().template_choice.as_deref(), Some("5"));
    }
}
