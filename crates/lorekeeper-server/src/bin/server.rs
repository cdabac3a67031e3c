//! The `lorekeeper-server` binary: loads configuration, wires up
//! [`lorekeeper_server::state::AppState`], and serves the HTTP/WebSocket
//! API (§6).

use anyhow::Context;
use clap::Parser;

use lorekeeper_core::config::AppConfig;
use lorekeeper_server::state::AppState;

/// lorekeeper-server: the HTTP/WebSocket API for the retrieval-augmented
/// question-answering system (§6).
#[derive(Parser)]
struct Cli {
    /// Path to a TOML config file, overriding `LOREKEEPER_CONFIG_FILE`.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lorekeeper_observability::init_tracing();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => AppConfig::from_file(&path).context("loading configuration")?,
        None => AppConfig::load().context("loading configuration")?,
    };
    let bind_addr = config.bind_addr.clone();

    let state = AppState::build(config).context("building application state")?;
    let router = lorekeeper_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(%bind_addr, "lorekeeper-server listening");

    axum::serve(listener, router)
        .await
        .context("serving HTTP")?;
    Ok(())
}
