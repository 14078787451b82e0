use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::{AuthUser, ACCESS_COOKIE};
use crate::auth::jwt::{encode_token, Claims, ACCESS_TOKEN_MINUTES};
use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::User;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub is_admin: bool,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn auth_cookie(access_token: &str) -> CookieJar {
    let access = Cookie::build((ACCESS_COOKIE, access_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(ACCESS_TOKEN_MINUTES))
        .build();
    CookieJar::new().add(access)
}

fn clear_auth_cookie() -> CookieJar {
    let access = Cookie::build((ACCESS_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(access)
}

fn issue(state: &SharedState, user: &User) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let claims = Claims::new(user.id, user.email.clone(), user.is_admin);
    let access_token =
        encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;
    Ok((
        auth_cookie(&access_token),
        Json(AuthResponse {
            access_token,
            is_admin: user.is_admin,
        }),
    ))
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    // Advisory lock so two concurrent first registrations can't both become admin
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    let is_admin = db::users::count_all(&mut *tx).await? == 0;
    let user = db::users::create(&mut *tx, &email, &pw_hash, req.name.trim(), is_admin)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Email already registered".to_string())
            }
            other => AppError::Database(other),
        })?;

    tx.commit().await?;

    audit::log_event(
        &state.pool,
        Some(user.id),
        "user.registered",
        "user",
        None,
        Some(serde_json::json!({ "is_admin": is_admin })),
    )
    .await;

    issue(&state, &user)
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if state.login_limiter.check(&req.email).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let Some(user) = db::users::find_by_email(&state.pool, req.email.trim()).await? else {
        state.login_limiter.record_failure(&req.email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    };

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        state.login_limiter.record_failure(&req.email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    issue(&state, &user)
}

pub async fn logout() -> (CookieJar, Json<MessageResponse>) {
    (
        clear_auth_cookie(),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

pub async fn me(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}
