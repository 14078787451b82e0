use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::extractor::ACCESS_COOKIE;
use crate::auth::jwt;
use crate::error::AppError;
use crate::middleware::auth_redirect::safe_next;
use crate::state::SharedState;

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate<'a> {
    next: &'a str,
}

const AFTER_LOGIN: &str = "/admin/biodata";

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

pub async fn login_page(
    State(state): State<SharedState>,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let next = safe_next(query.next.as_deref(), AFTER_LOGIN);

    // Already signed in as an admin: go straight on
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        if jwt::decode_token(cookie.value(), &state.config.jwt_secret).is_ok_and(|c| c.adm) {
            return Ok(Redirect::to(&next).into_response());
        }
    }

    let template = LoginTemplate { next: &next };
    let html = template
        .render()
        .map_err(|e| AppError::Internal(format!("Login page render failed: {e}")))?;
    Ok(Html(html).into_response())
}
