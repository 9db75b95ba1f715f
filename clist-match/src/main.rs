//! clist-match - vendor matching service for Courtney's List
//!
//! Serves the match-session API over HTTP with an SSE event stream.
//! Host, port and root folder resolve CLI > environment > TOML > compiled default.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clist_common::config::{CompiledDefaults, RootFolderInitializer, RootFolderResolver};
use clist_common::db::init_database;
use clist_common::events::EventBus;
use clist_match::services::MatchSettings;
use clist_match::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MODULE_NAME: &str = "clist-match";

/// Command-line arguments for clist-match
#[derive(Parser, Debug)]
#[command(name = "clist-match")]
#[command(about = "Vendor matching service for Courtney's List")]
#[command(version)]
struct Args {
    /// Root folder holding clist.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file, bypassing the platform search
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "CLIST_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CLIST_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_config_file(args.config.clone());
    let toml_config = resolver.load_config();
    let defaults = CompiledDefaults::for_current_platform();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting Courtney's List vendor matcher ({}) v{}",
        MODULE_NAME,
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = resolver.resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let settings = MatchSettings::load(&pool)
        .await
        .context("Failed to load match settings")?;
    info!(
        search_limit = settings.search_limit,
        max_lock_wait_ms = settings.max_lock_wait_ms,
        session_idle_timeout_secs = settings.session_idle_timeout_secs,
        "Match settings loaded"
    );

    let idle_timeout = settings.session_idle_timeout();
    let state = AppState::new(pool, EventBus::new(256), settings);
    let sweeper = state.matcher.spawn_idle_sweeper(idle_timeout);
    let app = build_router(state);

    let host = args
        .host
        .or(toml_config.host)
        .unwrap_or(defaults.host);
    let port = args.port.or(toml_config.port).unwrap_or(defaults.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("{} listening on http://{}", MODULE_NAME, addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
