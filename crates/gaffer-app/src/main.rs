// Gaffer scoring engine entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open database
// 4. Load the player catalog
// 5. Build app state and recover managers from the database
// 6. Spawn the WebSocket server and the app loop
// 7. Wait for Ctrl+C, then shut down

use gaffer_app::app;
use gaffer_app::catalog::PlayerCatalog;
use gaffer_app::config;
use gaffer_app::db;
use gaffer_app::ws_server;

use anyhow::Context;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Gaffer starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, budget {}, {} formations",
        config.league.name,
        config.league.starting_budget,
        config.league.formations.len()
    );

    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let catalog = PlayerCatalog::load(std::path::Path::new(&config.data_paths.players))
        .context("failed to load player catalog")?;

    let mut app_state = app::AppState::new(config.clone(), catalog, db)?;
    match app::recover_from_db(&mut app_state) {
        Ok(true) => info!("Season restored from previous session"),
        Ok(false) => info!("Starting fresh season"),
        Err(e) => {
            error!("Recovery failed: {:#}", e);
            return Err(e.context("recovery failed"));
        }
    }

    let (ws_tx, ws_rx) = mpsc::channel(256);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let ws_port = config.ws_port;
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(ws_port, ws_tx).await {
            error!("WebSocket server error: {}", e);
        }
    });

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(ws_rx, shutdown_rx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    info!("Ready on ws://127.0.0.1:{}", ws_port);
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Ctrl+C received, shutting down");

    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), app_handle).await;
    ws_handle.abort();

    info!("Gaffer shut down cleanly");
    Ok(())
}

/// Log to `logs/gaffer.log`; `RUST_LOG` overrides the default filter.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("gaffer.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gaffer=info,gaffer_app=info,gaffer_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
