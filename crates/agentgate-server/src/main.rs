//! agentgate web server
//!
//! Serves the login flow, the chat page and the streaming agent relay.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use agentgate_core::config::load_config;
use agentgate_core::tracing_init::init_tracing;
use agentgate_server::server::build_router;
use agentgate_server::server::state::LiveState;
use agentgate_server::session::unix_now;

#[derive(Parser, Debug)]
#[command(name = "agentgate")]
#[command(version, about = "agentgate - OAuth-delegated warehouse agent chat")]
struct Args {
    /// JSON config file.
    #[arg(long, env = "AGENTGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen host; the port comes from config unless `--port` is given.
    #[arg(long, default_value = "0.0.0.0", env = "LISTEN_HOST")]
    host: std::net::IpAddr,

    /// Listen port (overrides `server.port` / `APP_PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Display name for pages and health output (overrides `APP_NAME`).
    #[arg(long)]
    app_name: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing("agentgate_server=info,agentgate_core=info,tower_http=info", args.log_json);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(name) = args.app_name {
        config.server.app_name = name;
    }
    config.validate()?;

    let addr = SocketAddr::new(args.host, config.server.port);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        app = %config.server.app_name,
        client_id = %config.oauth.client_id,
        warehouse_host = %config.warehouse.host(),
        "Starting agentgate"
    );

    let sweep_every = Duration::from_secs(config.server.sweep_interval_secs.max(1));
    let state = LiveState::live(config)?;

    // Background sweep of expired logins and sessions
    let sessions = Arc::clone(&state.sessions);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            let removed = sessions.sweep(unix_now()).await;
            if removed.total() > 0 {
                info!(
                    pending = removed.pending,
                    sessions = removed.sessions,
                    "Background session sweep completed"
                );
            }
        }
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Listening");

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("agentgate stopped");
    Ok(())
}
