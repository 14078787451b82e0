use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::email::SystemMailer;
use crate::export::Exporter;
use crate::media::MediaStore;
use crate::rate_limit::{LoginRateLimiter, SubmissionRateLimiter};
use crate::signing::LinkSigner;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub signer: LinkSigner,
    pub media: MediaStore,
    pub exporter: Exporter,
    pub system_mailer: Option<Arc<SystemMailer>>,
    pub submission_limiter: SubmissionRateLimiter,
    pub login_limiter: LoginRateLimiter,
}
