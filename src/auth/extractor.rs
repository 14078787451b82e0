use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::jwt::{self, Claims};
use crate::error::AppError;
use crate::state::SharedState;

pub const ACCESS_COOKIE: &str = "access_token";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            user_id: claims.sub,
            email: claims.email,
            is_admin: claims.adm,
        }
    }
}

/// Raw token from the Authorization header, falling back to the cookie.
fn token_from_parts(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(auth_header) = parts.headers.get("authorization") {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(Some(token.to_string()));
        }
    }

    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()))
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)?
            .ok_or_else(|| AppError::Unauthorized("Missing authentication token".to_string()))?;

        let claims = jwt::decode_token(&token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(claims.into())
    }
}

/// Authentication for endpoints that also serve anonymous callers. A bad or
/// expired token is treated the same as no token.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<SharedState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let user = token_from_parts(parts)
            .ok()
            .flatten()
            .and_then(|token| jwt::decode_token(&token, &state.config.jwt_secret).ok())
            .map(AuthUser::from);
        Ok(MaybeAuthUser(user))
    }
}
