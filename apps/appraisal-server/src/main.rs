//! Appraisal report server
//!
//! HTTP front end for the appraisal form. Provides REST endpoints for:
//!
//! - Session sign-in and sign-out
//! - Analog slot editing and photo upload
//! - Report generation (multipart form + files, DOCX returned as base64)
//!
//! All document logic lives in `appraisal-core`; handlers only move data
//! between HTTP and the session store.

use std::net::SocketAddr;
use std::path::PathBuf;

use appraisal_core::GeneratorConfig;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod state;

use state::AppState;

/// Command-line arguments for the appraisal server
#[derive(Parser, Debug)]
#[command(name = "appraisal-server")]
#[command(about = "Vehicle appraisal report generator")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "PORT")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Generator config file (TOML)
    #[arg(short, long, env = "APPRAISAL_CONFIG")]
    config: Option<PathBuf>,

    /// DOCX template, overrides the config file
    #[arg(long, env = "APPRAISAL_TEMPLATE")]
    template: Option<PathBuf>,

    /// Directory for generated reports, overrides the config file
    #[arg(long, env = "APPRAISAL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Request body limit in megabytes
    #[arg(long, default_value = "64")]
    max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Build the application router around `state`
pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health))
        .route("/api/session", post(api::create_session))
        .route(
            "/api/session/:id",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/api/session/:id/analogs", post(api::add_analog))
        .route(
            "/api/session/:id/analogs/:slot_id",
            put(api::update_analog).delete(api::remove_analog),
        )
        .route(
            "/api/session/:id/analogs/:slot_id/photos",
            post(api::upload_analog_photos),
        )
        .route("/api/session/:id/report", post(api::generate_report))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(template) = args.template {
        config.template_path = template;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    config.validate()?;

    info!("Template: {}", config.template_path.display());
    info!("Output directory: {}", config.output_dir.display());
    if !config.template_path.is_file() {
        tracing::warn!("Template file is missing; report requests will fail until it exists");
    }

    let app = build_router(AppState::new(config), args.max_upload_mb * 1024 * 1024);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
