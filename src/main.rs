use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use seatledger::ledger::{sync, Ledger, SeaOrmStore};
use seatledger::{db, notify, routes, AppState, Config};

const DEFAULT_ADDR: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
    8080,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "-help" || arg == "--help") {
        println!("Usage: seatledger [OPTIONS]");
        println!("Options:");
        println!("  -config <path>  Path to configuration file (default: ./etc/seatledger.toml)");
        println!("  -help, --help   Print this help message");
        return Ok(());
    }

    let config_path = args
        .iter()
        .skip_while(|arg| arg.as_str() != "-config")
        .nth(1)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "./etc/seatledger.toml".to_string());

    // Load configuration first (before logging init)
    let mut config = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Could not load config file: {}, using defaults", e);
        Config::default()
    });
    config.apply_env();

    // Initialize logging
    // Priority: RUST_LOG env var > config file > default "info"
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting Seatledger server...");
    info!("Loading configuration from: {}", config_path);

    let db_conn = db::init_database(&config.database, config.seed_default_tables)
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {}", e);
            anyhow::anyhow!("Database initialization failed: {}", e)
        })?;

    let store = Arc::new(SeaOrmStore::new(db_conn.clone()));
    let ledger = Ledger::open(store).await.map_err(|e| {
        tracing::error!("Ledger load failed: {}", e);
        anyhow::anyhow!("Ledger load failed: {}", e)
    })?;

    if config.sync.poll_interval_secs > 0 {
        sync::spawn_reconciler(
            ledger.clone(),
            Duration::from_secs(config.sync.poll_interval_secs),
        );
        info!(
            "Ledger reconciler running every {}s",
            config.sync.poll_interval_secs
        );
    }

    let notifier = notify::from_config(&config.sms);

    // Create application state
    let state = AppState::new(db_conn, ledger, config.clone(), notifier);

    // Create router
    let app = routes::create_router(state);

    // Parse address
    let addr: SocketAddr = config.addr.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid address '{}', using default {}", config.addr, DEFAULT_ADDR);
        DEFAULT_ADDR
    });

    info!("Server listening on {}", addr);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
