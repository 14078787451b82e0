use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tempfile::TempDir;
use uuid::Uuid;

use biodata_server::config::{Config, ExportConfig};
use biodata_server::export::{ExportError, PdfEngine};
use biodata_server::media::MediaStore;
use biodata_server::signing::LinkSigner;

pub const SIGNING_SECRET: &str = "test-signing-secret";
pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n% fake document\n";

/// Stands in for headless Chromium: records the markup it was given.
#[derive(Default)]
pub struct FakePdfEngine {
    pub calls: AtomicUsize,
    pub last_html: Mutex<String>,
    pub fail: bool,
}

#[async_trait]
impl PdfEngine for FakePdfEngine {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>, ExportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_html.lock().unwrap() = html.to_string();
        if self.fail {
            return Err(ExportError::EngineFailed("fake engine failure".to_string()));
        }
        Ok(FAKE_PDF.to_vec())
    }
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub engine: Arc<FakePdfEngine>,
    pub signer: LinkSigner,
    _dirs: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "email": email, "password": password, "name": name }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register the first user (administrator), return access token.
    pub async fn bootstrap(&self) -> String {
        let (body, status) = self.register("admin@test.com", "password123", "Admin").await;
        assert_eq!(status, StatusCode::OK, "bootstrap register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Submit a biodata record as JSON, return (body, status).
    pub async fn submit_json(&self, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/biodata"))
            .json(body)
            .send()
            .await
            .expect("submit json failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Submit a biodata record as multipart form data, return (body, status).
    pub async fn submit_multipart(&self, form: Form) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/biodata"))
            .multipart(form)
            .send()
            .await
            .expect("submit multipart failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Create a record with a typical payload and the given template; returns its id.
    pub async fn create_biodata(&self, template: &str, email: &str) -> i64 {
        let (body, status) = self.submit_json(&sample_submission(template, email)).await;
        assert_eq!(status, StatusCode::CREATED, "create biodata failed: {body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn patch_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("patch request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> StatusCode {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed")
            .status()
    }

    pub fn pdf_calls(&self) -> usize {
        self.engine.calls.load(Ordering::SeqCst)
    }
}

pub fn sample_submission(template: &str, email: &str) -> Value {
    json!({
        "title": "Marriage Biodata",
        "template_choice": template,
        "user_name": "Asha Kulkarni",
        "user_email": email,
        "user_phone": "+91 98200 00000",
        "data": {
            "PersonalDetails": {
                "name": "Asha Kulkarni",
                "date_of_birth": "12 May 1996",
                "height": {"label": "Height", "value": "5'4\""},
                "gotra": "{'label': 'Gotra', 'value': 'Kashyap'}"
            },
            "FamilyDetails": {
                "father_name": {"value": "Ramesh Kulkarni"},
                "brothers": 1
            },
            "HabitsDeclaration": {}
        }
    })
}

pub fn screenshot_part() -> Part {
    Part::bytes(b"\x89PNG fake screenshot".to_vec())
        .file_name("payment proof.png")
        .mime_str("image/png")
        .unwrap()
}

async fn spawn_with_engine(engine: Arc<FakePdfEngine>) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("biodata_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let dirs = tempfile::tempdir().expect("Failed to create temp dir");
    let media_root = dirs.path().join("media");
    let assets_dir = dirs.path().join("assets");
    std::fs::create_dir_all(assets_dir.join("border")).unwrap();
    for border in ["White.png", "bg0.png", "bg6.png"] {
        std::fs::write(assets_dir.join("border").join(border), b"border-bytes").unwrap();
    }

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        signing_secret: SIGNING_SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: "http://localhost:0".to_string(),
        max_body_size: 1_048_576,
        trusted_proxies: vec![],
        log_level: "warn".to_string(),
        media_root: media_root.clone(),
        media_url: "/media".to_string(),
        assets_dir,
        export: ExportConfig {
            chromium_path: "chromium".to_string(),
            timeout: Duration::from_secs(5),
            asset_wait: Duration::from_millis(10),
        },
        link_max_age: Duration::from_secs(7 * 24 * 60 * 60),
        smtp: None,
    };
    let signer = LinkSigner::new(SIGNING_SECRET, config.link_max_age);

    let media = MediaStore::open(&media_root, "/media")
        .await
        .expect("Failed to open media store");
    let (app, _state) = biodata_server::build_app(pool.clone(), config, media, engine.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
        engine,
        signer,
        _dirs: dirs,
    }
}

/// Spawn a test app with a fresh temporary database and a working fake engine.
pub async fn spawn_app() -> TestApp {
    spawn_with_engine(Arc::new(FakePdfEngine::default())).await
}

/// Same as `spawn_app`, but every PDF export fails.
pub async fn spawn_app_with_failing_engine() -> TestApp {
    spawn_with_engine(Arc::new(FakePdfEngine {
        fail: true,
        ..Default::default()
    }))
    .await
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
