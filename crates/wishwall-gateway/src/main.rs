use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wishwall_broadcast::{KeyValueStore, LikeCounter, SpotlightChannel, SqliteKv};
use wishwall_core::config::WishwallConfig;
use wishwall_stage::StageEngine;
use wishwall_store::{RecordStore, SqliteRecordStore};

mod app;
mod auth;
mod http;
mod ws;

#[derive(Parser, Debug)]
#[command(name = "wishwall-gateway", version, about = "Live wish wall server")]
struct Cli {
    /// Config file (overrides WISHWALL_CONFIG and ~/.wishwall/wishwall.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP + WebSocket server (default)
    Serve,
    /// Write every record as JSON and exit
    Export {
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wishwall_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > WISHWALL_CONFIG env > ~/.wishwall/wishwall.toml
    let config_path = cli.config.or_else(|| std::env::var("WISHWALL_CONFIG").ok());
    let config = WishwallConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        WishwallConfig::default()
    });

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Export { out } => export(&config, out),
    }
}

async fn serve(config: WishwallConfig) -> anyhow::Result<()> {
    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    wishwall_store::db::init_db(&db)?;
    wishwall_broadcast::db::init_db(&db)?;
    info!("database migrations complete");

    // each subsystem gets its own connection
    let store: Arc<dyn RecordStore> =
        Arc::new(SqliteRecordStore::new(rusqlite::Connection::open(&db_path)?)?);
    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKv::new(rusqlite::Connection::open(&db_path)?)?);

    let spotlight = Arc::new(SpotlightChannel::new(kv.clone(), config.spotlight.live_enabled));
    if !spotlight.live_available() {
        warn!("live spotlight channel disabled, clients rely on persisted state");
    }
    let likes = LikeCounter::new(kv.clone());
    let auth = Arc::new(auth::SharedPasswordAuth::new(config.admin.password.clone(), kv));
    if config.admin.password == wishwall_core::config::AdminConfig::default().password {
        warn!("admin password is the built-in default, set admin.password");
    }

    let (engine, stage) = StageEngine::new(store.clone(), spotlight.clone(), &config);

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, store, spotlight, likes, auth, stage));
    let router = app::build_router(state);

    // spawn stage engine loop in background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_task = tokio::spawn(engine.run(shutdown_rx));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
        }
        on_signal.cancel();
    });

    info!("Wish wall gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    // signal stage engine to stop
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    Ok(())
}

fn export(config: &WishwallConfig, out: Option<PathBuf>) -> anyhow::Result<()> {
    let db_path = &config.database.path;
    let conn = rusqlite::Connection::open(db_path)
        .with_context(|| format!("opening database {db_path}"))?;
    let store = SqliteRecordStore::new(conn)?;
    let snapshot = store.snapshot()?;
    let json = wishwall_store::export::to_json(&snapshot.records)?;

    match out {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(count = snapshot.len(), path = %path.display(), "export written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
