pub mod admin;
pub mod auth;

use axum::routing::get;
use axum::Router;

use crate::state::SharedState;

pub fn view_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(auth::login_page))
        .route("/auth/login", get(auth::login_page))
        .route("/admin/biodata", get(admin::biodata_page))
}
