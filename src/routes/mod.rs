pub mod admin;
pub mod auth;
pub mod biodata;
pub mod download;
pub mod payment;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me))
        // Biodata
        .route("/api/v1/biodata", get(biodata::list).post(biodata::create))
        .route(
            "/api/v1/biodata/{id}",
            get(biodata::get)
                .put(biodata::update)
                .patch(biodata::patch)
                .delete(biodata::delete),
        )
        .route("/api/v1/biodata/{id}/pdf", get(biodata::pdf))
        .route("/api/v1/biodata/{id}/html", get(biodata::html))
        // Payment
        .route("/api/v1/payment/verify", post(payment::verify))
        // Signed downloads
        .route("/api/v1/download/{id}/{token}", get(download::download))
        // Admin
        .route("/api/v1/admin/biodata", get(admin::list))
        .route("/api/v1/admin/biodata/approve", post(admin::approve))
        .route("/api/v1/admin/biodata/export.csv", get(admin::export_csv))
        .route("/api/v1/admin/biodata/repair", post(admin::repair_payloads))
        .route("/api/v1/admin/biodata/check", get(admin::check_payloads))
}
