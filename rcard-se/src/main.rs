//! Scoring Engine (rcard-se) - Main entry point
//!
//! HTTP service converting operator and CV event streams into official
//! 10-point-must round scorecards.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rcard_se::api::{self, AppContext};
use rcard_se::db;
use rcard_se::state::SharedState;

/// Command-line arguments for rcard-se
#[derive(Parser, Debug)]
#[command(name = "rcard-se")]
#[command(about = "Round scoring engine for RoundCard")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5810", env = "RCARD_SE_PORT")]
    port: u16,

    /// Path to the SQLite database
    #[arg(short, long, env = "RCARD_DATABASE")]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rcard_se=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let db_path =
        rcard_common::config::resolve_database_path(args.database.as_deref(), "RCARD_DATABASE")
            .context("Failed to resolve database path")?;
    info!("Starting RoundCard scoring engine on port {}", args.port);
    info!("Database: {}", db_path.display());

    let db_pool = db::init::connect(&db_path)
        .await
        .context("Failed to open database")?;
    db::init::init_database(&db_pool)
        .await
        .context("Failed to initialize database")?;

    let ctx = AppContext {
        db_pool,
        state: Arc::new(SharedState::new()),
    };
    let app = api::build_router(ctx).layer(tower_http::cors::CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
