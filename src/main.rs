//! Session Timer - reload-safe timer for an active study session
//!
//! This is the main entry point for the session-timer host binary.

use std::sync::Arc;
use tracing::info;

use session_timer::{
    commands::run_command,
    config::Config,
    services::FileStore,
    state::TimerEngine,
    utils::SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Logs go to stderr so stdout carries only timer output
    tracing_subscriber::fmt()
        .with_env_filter(format!("session_timer={}", config.log_level()))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting session-timer v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: store={}, tick={}ms",
        config.store_dir().display(),
        config.tick_ms
    );

    let clock = Arc::new(SystemClock);
    let store = Arc::new(FileStore::new(config.store_dir()));

    // Reconciles with the persisted record before any command runs
    let engine = TimerEngine::new(clock.clone(), store, config.engine_settings())?;

    run_command(&engine, clock.as_ref(), &config.command).await
}
