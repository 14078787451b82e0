pub mod approval;
pub mod auth;
pub mod biodata;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod export;
pub mod media;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod render;
pub mod repair;
pub mod routes;
pub mod signing;
pub mod state;
pub mod submission;
pub mod views;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::email::SystemMailer;
use crate::export::{Exporter, PdfEngine};
use crate::media::MediaStore;
use crate::middleware::auth_redirect::redirect_unauthorized;
use crate::rate_limit::{LoginRateLimiter, SubmissionRateLimiter};
use crate::render::AssetLoader;
use crate::signing::LinkSigner;
use crate::state::{AppState, SharedState};

/// Assemble the application. The media store must already be opened (and
/// therefore proven writable) and the PDF engine chosen by the caller.
pub fn build_app(
    pool: PgPool,
    config: Config,
    media: MediaStore,
    engine: Arc<dyn PdfEngine>,
) -> (Router, SharedState) {
    let system_mailer = config.smtp.as_ref().and_then(|smtp| {
        match SystemMailer::new(smtp) {
            Ok(mailer) => {
                tracing::info!("System SMTP configured");
                Some(Arc::new(mailer))
            }
            Err(e) => {
                tracing::warn!("System SMTP not available: {e}");
                None
            }
        }
    });

    let signer = LinkSigner::new(&config.signing_secret, config.link_max_age);
    let exporter = Exporter::new(AssetLoader::new(&config.assets_dir, media.clone()), engine);

    let state: SharedState = Arc::new(AppState {
        pool,
        signer,
        media,
        exporter,
        system_mailer,
        submission_limiter: SubmissionRateLimiter::new(),
        login_limiter: LoginRateLimiter::new(),
        config,
    });

    let media_url = state.config.media_url.clone();
    let media_dir = ServeDir::new(state.media.root());
    let assets_dir = ServeDir::new(&state.config.assets_dir);
    let max_body = state.config.max_body_size;

    let app = Router::new()
        .merge(routes::api_routes())
        .merge(views::view_routes().layer(axum::middleware::from_fn(redirect_unauthorized)))
        .nest_service(&media_url, media_dir)
        .nest_service("/assets", assets_dir)
        .route("/health", axum::routing::get(health))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}
