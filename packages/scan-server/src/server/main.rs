// Main entry point for the scan server and CLI

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use job_scanner::{NewSource, ScanStore, SourceStore, SqliteStore};
use scan_server::{
    kernel::build_scanner,
    server::{build_app, AppState},
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scan-server")]
#[command(about = "Job board scanner: HTTP server and one-off scans")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Run one scan and print the report as JSON
    Scan {
        /// Source id to scan; repeat for several, omit for all
        #[arg(long = "source")]
        sources: Vec<i64>,
    },

    /// Add a source
    AddSource {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        filter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_scanner=debug,scan_server=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let store = Arc::new(
        SqliteStore::new(&config.database_url)
            .await
            .context("Failed to open database")?,
    );
    tracing::info!(database = %config.database_url, "Database ready");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, store).await,
        Commands::Scan { sources } => scan(config, store, sources).await,
        Commands::AddSource { name, url, filter } => {
            let mut source = NewSource::new(name, url);
            if let Some(filter) = filter {
                source = source.with_filter(filter);
            }
            let created = store
                .create_source(source)
                .await
                .context("Failed to create source")?;
            println!("{}", serde_json::to_string_pretty(&created)?);
            Ok(())
        }
    }
}

async fn serve(config: Config, store: Arc<SqliteStore>) -> Result<()> {
    let store: Arc<dyn ScanStore> = store;
    let scanner = build_scanner(&config, store.clone()).context("Failed to build scanner")?;
    let app = build_app(AppState::new(scanner, store), &config.allowed_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn scan(config: Config, store: Arc<SqliteStore>, sources: Vec<i64>) -> Result<()> {
    let scanner = build_scanner(&config, store).context("Failed to build scanner")?;

    let ids = (!sources.is_empty()).then_some(sources.as_slice());
    let report = scanner.run_scan(ids).await.context("Scan failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
