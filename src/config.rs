use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub signing_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub log_level: String,
    pub media_root: PathBuf,
    pub media_url: String,
    pub assets_dir: PathBuf,
    pub export: ExportConfig,
    pub link_max_age: Duration,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub chromium_path: String,
    pub timeout: Duration,
    /// Time granted to fonts and images before the page is captured.
    pub asset_wait: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;
        let signing_secret = env_required("BIODATA_SIGNING_SECRET")?;

        let host: IpAddr = env_or("BIODATA_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid BIODATA_HOST: {e}"))?;

        let port: u16 = env_or("BIODATA_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid BIODATA_PORT: {e}"))?;

        let base_url = env_or("BIODATA_BASE_URL", &format!("http://{host}:{port}"))
            .trim_end_matches('/')
            .to_string();

        let max_body_size: usize = env_or("BIODATA_MAX_BODY_SIZE", "10485760")
            .parse()
            .map_err(|e| format!("Invalid BIODATA_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("BIODATA_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid BIODATA_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = env_or("BIODATA_LOG_LEVEL", "info");

        let media_root = PathBuf::from(env_or("BIODATA_MEDIA_ROOT", "media"));
        let media_url = normalize_url_prefix(&env_or("BIODATA_MEDIA_URL", "/media"));
        let assets_dir = PathBuf::from(env_or("BIODATA_ASSETS_DIR", "assets"));

        let timeout_secs: u64 = env_or("BIODATA_EXPORT_TIMEOUT_SECS", "30")
            .parse()
            .map_err(|e| format!("Invalid BIODATA_EXPORT_TIMEOUT_SECS: {e}"))?;
        let asset_wait_ms: u64 = env_or("BIODATA_ASSET_WAIT_MS", "1000")
            .parse()
            .map_err(|e| format!("Invalid BIODATA_ASSET_WAIT_MS: {e}"))?;

        let export = ExportConfig {
            chromium_path: env_or("BIODATA_CHROMIUM_PATH", "chromium"),
            timeout: Duration::from_secs(timeout_secs),
            asset_wait: Duration::from_millis(asset_wait_ms),
        };

        let link_max_age_days: u64 = env_or("BIODATA_LINK_MAX_AGE_DAYS", "7")
            .parse()
            .map_err(|e| format!("Invalid BIODATA_LINK_MAX_AGE_DAYS: {e}"))?;

        let smtp = match (
            std::env::var("BIODATA_SMTP_HOST").ok(),
            std::env::var("BIODATA_SMTP_PORT").ok(),
            std::env::var("BIODATA_SMTP_USER").ok(),
            std::env::var("BIODATA_SMTP_PASS").ok(),
            std::env::var("BIODATA_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid BIODATA_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            signing_secret,
            host,
            port,
            base_url,
            max_body_size,
            trusted_proxies,
            log_level,
            media_root,
            media_url,
            assets_dir,
            export,
            link_max_age: Duration::from_secs(link_max_age_days * 24 * 60 * 60),
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// `media/` and `/media/` both become `/media`.
fn normalize_url_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    format!("/{trimmed}")
}
