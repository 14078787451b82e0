use sqlx::PgPool;
use uuid::Uuid;

/// Record an administrator action. Called explicitly by handlers after a
/// mutation; a failed write is logged and never fails the request.
pub async fn log_event(
    pool: &PgPool,
    user_id: Option<Uuid>,
    action: &str,
    resource_type: &str,
    resource_id: Option<i64>,
    details: Option<serde_json::Value>,
) {
    if let Err(e) =
        crate::db::audit::log_event(pool, user_id, action, resource_type, resource_id, details).await
    {
        tracing::error!("Failed to log audit event: {e}");
    }
}
