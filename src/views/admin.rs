use askama::Template;
use axum::extract::{Query, State};
use axum::response::Html;

use crate::auth::extractor::AuthUser;
use crate::biodata::{ApprovalStatus, TemplateChoice};
use crate::db;
use crate::error::AppError;
use crate::models::Biodata;
use crate::routes::admin::AdminListParams;
use crate::routes::biodata::page_bounds;
use crate::state::SharedState;

struct BiodataRow {
    id: i64,
    title: String,
    user_name: String,
    user_email: String,
    user_phone: String,
    template_choice: String,
    status: &'static str,
    is_approved: bool,
    created_at: String,
    screenshot_url: String,
    download_link: String,
}

impl BiodataRow {
    fn from_record(record: &Biodata, state: &SharedState) -> Self {
        let status = match record.status() {
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::PaymentPending => "Payment pending",
            ApprovalStatus::Submitted => "Awaiting review",
        };
        Self {
            id: record.id,
            title: record.title.clone(),
            user_name: record.user_name.clone(),
            user_email: record.user_email.clone(),
            user_phone: record.user_phone.clone(),
            template_choice: record.template_choice.clone(),
            status,
            is_approved: record.is_approved,
            created_at: record.created_at.format("%Y-%m-%d %H:%M").to_string(),
            screenshot_url: record
                .payment_screenshot
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| state.media.url(s))
                .unwrap_or_default(),
            download_link: record.download_link.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/biodata.html")]
struct BiodataPageTemplate {
    admin_email: String,
    rows: Vec<BiodataRow>,
    total: i64,
    page: i64,
    total_pages: i64,
    search: String,
    filter_approved: Option<bool>,
    template_options: Vec<TemplateOption>,
}

struct TemplateOption {
    code: String,
    selected: bool,
}

pub async fn biodata_page(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<AdminListParams>,
) -> Result<Html<String>, AppError> {
    auth.require_admin()?;

    let (page, per_page, _) = page_bounds(params.page, params.per_page);
    let list_params = params.to_db()?;
    let records = db::biodata::list(&state.pool, &list_params).await?;
    let total = db::biodata::count(&state.pool, &list_params).await?;

    let template = BiodataPageTemplate {
        admin_email: auth.email.clone(),
        rows: records
            .iter()
            .map(|r| BiodataRow::from_record(r, &state))
            .collect(),
        total,
        page,
        total_pages: ((total + per_page - 1) / per_page).max(1),
        search: params.search.clone().unwrap_or_default(),
        filter_approved: params.is_approved,
        template_options: TemplateChoice::ALL
            .iter()
            .map(|t| TemplateOption {
                code: t.to_string(),
                selected: list_params.template_choice.as_deref() == Some(t.to_string().as_str()),
            })
            .collect(),
    };
    let html = template
        .render()
        .map_err(|e| AppError::Internal(format!("Admin page render failed: {e}")))?;
    Ok(Html(html))
}
