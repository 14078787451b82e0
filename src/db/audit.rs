use sqlx::PgPool;
use uuid::Uuid;

use crate::models::AuditEvent;

pub async fn log_event(
    pool: &PgPool,
    user_id: Option<Uuid>,
    action: &str,
    resource_type: &str,
    resource_id: Option<i64>,
    details: Option<serde_json::Value>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events (user_id, action, resource_type, resource_id, details)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(resource_type)
    .bind(resource_id)
    .bind(details)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_for_resource(
    pool: &PgPool,
    resource_type: &str,
    resource_id: i64,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    sqlx::query_as::<_, AuditEvent>(
        "SELECT * FROM audit_events WHERE resource_type = $1 AND resource_id = $2
         ORDER BY created_at DESC",
    )
    .bind(resource_type)
    .bind(resource_id)
    .fetch_all(pool)
    .await
}
