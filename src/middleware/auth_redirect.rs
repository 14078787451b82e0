use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

/// Sends unauthenticated page requests to the login page, remembering where
/// they were headed.
pub async fn redirect_unauthorized(req: Request, next: Next) -> Response {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let response = next.run(req).await;
    if response.status() == StatusCode::UNAUTHORIZED {
        Redirect::to(&login_url(&target)).into_response()
    } else {
        response
    }
}

pub fn login_url(target: &str) -> String {
    let encoded: String = target
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect();
    format!("/auth/login?next={encoded}")
}

/// Only same-site paths are followed after login.
pub fn safe_next(next: Option<&str>, fallback: &'static str) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}
