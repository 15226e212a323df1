use tracing::info;
use tracing_subscriber::EnvFilter;

use tutoria_server::api;
use tutoria_server::config::ServerConfig;
use tutoria_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tutoria_server=debug")),
        )
        .init();

    info!("Starting Tutoria chat server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the history database
    // -----------------------------------------------------------------------
    let db = match config.database_path {
        Some(ref path) => Database::open_at(path)?,
        None => Database::new()?,
    };

    // -----------------------------------------------------------------------
    // 4. Wire subsystems and run the server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;
    let state = api::build_state(config, db);

    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
