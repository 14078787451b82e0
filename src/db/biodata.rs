use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::Biodata;

/// Columns a submitter controls. Approval state is never written through here.
#[derive(Debug, Clone, Default)]
pub struct BiodataFields {
    pub title: String,
    pub data: serde_json::Value,
    pub template_choice: String,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub profile_image: Option<String>,
    pub payment_screenshot: Option<String>,
}

impl From<&Biodata> for BiodataFields {
    fn from(record: &Biodata) -> Self {
        Self {
            title: record.title.clone(),
            data: record.data.clone(),
            template_choice: record.template_choice.clone(),
            user_name: record.user_name.clone(),
            user_email: record.user_email.clone(),
            user_phone: record.user_phone.clone(),
            profile_image: record.profile_image.clone(),
            payment_screenshot: record.payment_screenshot.clone(),
        }
    }
}

// Payloads are bound as text and cast in SQL: a bound `Value` travels as
// JSONB, which would reorder keys before they reach the JSON column.

pub async fn create(
    pool: &PgPool,
    fields: &BiodataFields,
    is_approved: bool,
) -> Result<Biodata, sqlx::Error> {
    sqlx::query_as::<_, Biodata>(
        "INSERT INTO biodata (title, data, template_choice, user_name, user_email, user_phone,
                              profile_image, payment_screenshot, is_approved)
         VALUES ($1, $2::json, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(&fields.title)
    .bind(fields.data.to_string())
    .bind(&fields.template_choice)
    .bind(&fields.user_name)
    .bind(&fields.user_email)
    .bind(&fields.user_phone)
    .bind(&fields.profile_image)
    .bind(&fields.payment_screenshot)
    .bind(is_approved)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Biodata>, sqlx::Error> {
    sqlx::query_as::<_, Biodata>("SELECT * FROM biodata WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    fields: &BiodataFields,
) -> Result<Option<Biodata>, sqlx::Error> {
    sqlx::query_as::<_, Biodata>(
        "UPDATE biodata SET title = $2, data = $3::json, template_choice = $4, user_name = $5,
                user_email = $6, user_phone = $7, profile_image = $8, payment_screenshot = $9,
                updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&fields.title)
    .bind(fields.data.to_string())
    .bind(&fields.template_choice)
    .bind(&fields.user_name)
    .bind(&fields.user_email)
    .bind(&fields.user_phone)
    .bind(&fields.profile_image)
    .bind(&fields.payment_screenshot)
    .fetch_optional(pool)
    .await
}

pub async fn update_data(
    pool: &PgPool,
    id: i64,
    data: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE biodata SET data = $2::json, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(data.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM biodata WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_payment_proof(
    pool: &PgPool,
    id: i64,
    screenshot: &str,
) -> Result<Option<Biodata>, sqlx::Error> {
    sqlx::query_as::<_, Biodata>(
        "UPDATE biodata SET payment_screenshot = $2, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(screenshot)
    .fetch_optional(pool)
    .await
}

/// Mark approved and store the signed download link in one statement.
pub async fn approve(
    pool: &PgPool,
    id: i64,
    download_link: &str,
) -> Result<Option<Biodata>, sqlx::Error> {
    sqlx::query_as::<_, Biodata>(
        "UPDATE biodata SET is_approved = TRUE, download_link = $2, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(download_link)
    .fetch_optional(pool)
    .await
}

pub async fn find_latest_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Biodata>, sqlx::Error> {
    sqlx::query_as::<_, Biodata>(
        "SELECT * FROM biodata WHERE lower(user_email) = lower($1)
         ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_latest_without_proof(pool: &PgPool) -> Result<Option<Biodata>, sqlx::Error> {
    sqlx::query_as::<_, Biodata>(
        "SELECT * FROM biodata
         WHERE payment_screenshot IS NULL OR payment_screenshot = ''
         ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub limit: i64,
    pub offset: i64,
    pub is_approved: Option<bool>,
    pub template_choice: Option<String>,
    pub search: Option<String>,
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, params: &'a ListParams) {
    builder.push(" WHERE TRUE");
    if let Some(approved) = params.is_approved {
        builder.push(" AND is_approved = ").push_bind(approved);
    }
    if let Some(choice) = &params.template_choice {
        builder.push(" AND template_choice = ").push_bind(choice.as_str());
    }
    if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR user_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR user_email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR user_phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Newest first.
pub async fn list(pool: &PgPool, params: &ListParams) -> Result<Vec<Biodata>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM biodata");
    push_filters(&mut builder, params);
    builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(params.limit)
        .push(" OFFSET ")
        .push_bind(params.offset);
    builder.build_query_as::<Biodata>().fetch_all(pool).await
}

pub async fn count(pool: &PgPool, params: &ListParams) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM biodata");
    push_filters(&mut builder, params);
    let row: (i64,) = builder.build_query_as().fetch_one(pool).await?;
    Ok(row.0)
}

/// Every record, oldest first. Used by the repair job and exports.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Biodata>, sqlx::Error> {
    sqlx::query_as::<_, Biodata>("SELECT * FROM biodata ORDER BY id ASC")
        .fetch_all(pool)
        .await
}
