//! Mazerun - authoritative maze arena game server.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    info!("Mazerun Server v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Tick: {}ms", config.server.tick_interval_ms);
    info!("  Reconnect grace: {}ms", config.server.reconnect_grace_ms);
    info!(
        "  Base maze: {}x{} (+{} per level)",
        config.game.base_maze_rows, config.game.base_maze_cols, config.game.maze_growth_per_level
    );

    server::run(config).await
}
