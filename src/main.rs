use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use biodata_server::config::Config;
use biodata_server::email::SystemMailer;
use biodata_server::export::ChromiumEngine;
use biodata_server::media::MediaStore;
use biodata_server::rate_limit;
use biodata_server::repair;

#[derive(Parser)]
#[command(name = "biodata-server", version, about = "Biodata submission and delivery service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Rewrite stored payloads into canonical label/value pairs
    RepairPayloads,
    /// List records whose payload still has non-canonical fields
    CheckPayloads,
    /// Send a plain test message through the configured SMTP server
    SendTestEmail {
        #[arg(long)]
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::RepairPayloads => {
            let pool = connect(&config).await?;
            let repaired = repair::repair_all(&pool).await?;
            println!("Repaired {repaired} biodata record(s)");
            Ok(())
        }
        Command::CheckPayloads => {
            let pool = connect(&config).await?;
            let issues = repair::check_all(&pool).await?;
            if issues.is_empty() {
                println!("All biodata payloads are canonical");
            }
            for issue in &issues {
                println!("biodata {}: {}", issue.id, issue.fields.join(", "));
            }
            Ok(())
        }
        Command::SendTestEmail { to } => {
            let smtp = config
                .smtp
                .as_ref()
                .ok_or("SMTP is not configured (set BIODATA_SMTP_*)")?;
            SystemMailer::new(smtp)?.send_test(&to).await?;
            println!("Test email sent to {to}");
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> Result<PgPool, Box<dyn std::error::Error>> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied");
    Ok(pool)
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting biodata server");

    let pool = connect(&config).await?;

    // Refuse to start on storage we cannot write to
    let media = MediaStore::open(&config.media_root, &config.media_url).await?;
    tracing::info!("Media storage ready at {}", config.media_root.display());

    let engine = ChromiumEngine::new(&config.export);
    match engine.check_version().await {
        Ok(version) => tracing::info!("PDF engine: {version}"),
        Err(e) => tracing::warn!("PDF engine unavailable, exports will fail: {e}"),
    }

    let addr = SocketAddr::new(config.host, config.port);
    let (app, state) = biodata_server::build_app(pool, config, media, Arc::new(engine));
    rate_limit::spawn_cleanup(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
