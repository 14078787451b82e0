//! Batch normalization over stored records.

use serde::Serialize;
use sqlx::PgPool;

use crate::biodata::normalize::{non_canonical_fields, repair};
use crate::db;

#[derive(Debug, Clone, Serialize)]
pub struct PayloadIssue {
    pub id: i64,
    /// `Section.field` keys whose value is not a canonical pair.
    pub fields: Vec<String>,
}

/// Rewrite every stored payload that is not already canonical. Returns how
/// many records changed.
pub async fn repair_all(pool: &PgPool) -> Result<usize, sqlx::Error> {
    let mut repaired = 0;
    for record in db::biodata::list_all(pool).await? {
        if let Some(fixed) = repair(&record.data) {
            db::biodata::update_data(pool, record.id, &fixed).await?;
            tracing::info!("Repaired payload of biodata {}", record.id);
            repaired += 1;
        }
    }
    Ok(repaired)
}

/// Report records whose payload still holds non-canonical fields.
pub async fn check_all(pool: &PgPool) -> Result<Vec<PayloadIssue>, sqlx::Error> {
    let issues = db::biodata::list_all(pool)
        .await?
        .into_iter()
        .filter_map(|record| {
            let fields: Vec<String> = non_canonical_fields(&record.data)
                .into_iter()
                .map(|(section, key)| format!("{section}.{key}"))
                .collect();
            (!fields.is_empty()).then_some(PayloadIssue {
                id: record.id,
                fields,
            })
        })
        .collect();
    Ok(issues)
}
