//! Administrator approval: flag the record, mint its signed download link,
//! render the PDF and mail it to the submitter.
//!
//! Every record in a batch is handled independently. A failure is reported in
//! that record's outcome and the batch carries on.

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::middleware::audit;
use crate::models::Biodata;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub id: i64,
    pub approved: bool,
    pub download_link: Option<String>,
    pub emailed: bool,
    pub error: Option<String>,
    pub warning: Option<String>,
}

impl ApprovalOutcome {
    fn failed(id: i64, error: impl Into<String>) -> Self {
        Self {
            id,
            approved: false,
            download_link: None,
            emailed: false,
            error: Some(error.into()),
            warning: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalReport {
    pub results: Vec<ApprovalOutcome>,
    pub approved: usize,
    pub emailed: usize,
    pub failed: usize,
}

impl ApprovalReport {
    fn from_outcomes(results: Vec<ApprovalOutcome>) -> Self {
        let approved = results.iter().filter(|r| r.approved).count();
        let emailed = results.iter().filter(|r| r.emailed).count();
        let failed = results.iter().filter(|r| r.error.is_some()).count();
        Self {
            results,
            approved,
            emailed,
            failed,
        }
    }
}

/// Absolute URL of the tokenized download endpoint.
pub fn download_url(base_url: &str, id: i64, token: &str) -> String {
    format!("{}/api/v1/download/{id}/{token}", base_url.trim_end_matches('/'))
}

pub async fn approve_batch(state: &AppState, ids: &[i64], actor: Option<Uuid>) -> ApprovalReport {
    let mut results = Vec::with_capacity(ids.len());
    for &id in ids {
        let outcome = approve_one(state, id).await;
        audit::log_event(
            &state.pool,
            actor,
            "biodata.approved",
            "biodata",
            Some(id),
            Some(json!({
                "approved": outcome.approved,
                "emailed": outcome.emailed,
                "error": outcome.error,
            })),
        )
        .await;
        results.push(outcome);
    }

    let report = ApprovalReport::from_outcomes(results);
    tracing::info!(
        "Approved {} biodata entries, emails sent: {}, failures: {}",
        report.approved,
        report.emailed,
        report.failed
    );
    report
}

pub async fn approve_one(state: &AppState, id: i64) -> ApprovalOutcome {
    let record = match db::biodata::find_by_id(&state.pool, id).await {
        Ok(Some(record)) => record,
        Ok(None) => return ApprovalOutcome::failed(id, "Biodata not found"),
        Err(e) => {
            tracing::error!("Loading biodata {id} for approval failed: {e}");
            return ApprovalOutcome::failed(id, "Database error");
        }
    };

    let token = state.signer.issue(record.id);
    let link = download_url(&state.config.base_url, record.id, &token);

    let record = match db::biodata::approve(&state.pool, record.id, &link).await {
        Ok(Some(record)) => record,
        Ok(None) => return ApprovalOutcome::failed(id, "Biodata not found"),
        Err(e) => {
            tracing::error!("Approving biodata {id} failed: {e}");
            return ApprovalOutcome::failed(id, "Database error");
        }
    };

    let mut outcome = ApprovalOutcome {
        id,
        approved: true,
        download_link: Some(link.clone()),
        emailed: false,
        error: None,
        warning: None,
    };

    if record.user_email.trim().is_empty() {
        tracing::warn!("No user_email set for biodata {id}; approved without delivery");
        outcome.warning = Some("No email address on record; nothing was sent".to_string());
        return outcome;
    }

    match deliver(state, &record, &link).await {
        Ok(()) => {
            tracing::info!("Approval email with PDF sent to {}", record.user_email);
            outcome.emailed = true;
        }
        Err(e) => {
            tracing::warn!("Delivery for biodata {id} failed: {e}");
            outcome.error = Some(e);
        }
    }
    outcome
}

async fn deliver(state: &AppState, record: &Biodata, link: &str) -> Result<(), String> {
    let mailer = state
        .system_mailer
        .as_ref()
        .ok_or_else(|| crate::email::DeliveryError::NotConfigured.to_string())?;

    let document = state
        .exporter
        .pdf(record)
        .await
        .map_err(|e| format!("PDF generation failed: {e}"))?;

    mailer
        .send_biodata_pdf(&record.user_email, &record.user_name, link, &document)
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_joins_without_double_slash() {
        assert_eq!(
            download_url("https://biodata.example/", 5, "5.1700000000.ab"),
            "https://biodata.example/api/v1/download/5/5.1700000000.ab"
        );
    }

    #[test]
    fn report_counts_each_outcome_kind() {
        let ok = ApprovalOutcome {
            id: 1,
            approved: true,
            download_link: Some("l".into()),
            emailed: true,
            error: None,
            warning: None,
        };
        let approved_not_sent = ApprovalOutcome {
            id: 2,
            emailed: false,
            error: Some("Email not configured".into()),
            ..ok.clone()
        };
        let report = ApprovalReport::from_outcomes(vec![
            ok,
            approved_not_sent,
            ApprovalOutcome::failed(3, "Biodata not found"),
        ]);
        assert_eq!(report.approved, 2);
        assert_eq!(report.emailed, 1);
        assert_eq!(report.failed, 2);
    }
}
