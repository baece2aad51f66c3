use std::sync::Arc;

use anyhow::{Context, Result};
use aura_live::{create_router, AppState, Config, ConfigBoundaries};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "aura-live", about = "Live multimodal session service for the Aura companion")]
struct Args {
    /// Path to the config file (without extension)
    #[arg(short, long, default_value = "config/aura-live")]
    config: String,

    /// Override the HTTP port from the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;

    info!("{} starting", cfg.service.name);

    let boundaries = Arc::new(ConfigBoundaries {
        nats_url: cfg.transport.nats_url.clone(),
        capture_source: cfg.capture_source()?,
    });
    let state = AppState::new(cfg.session_template(), boundaries);
    let router = create_router(state.clone());

    let port = args.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP API listening on {}", addr);
    info!("NATS endpoint: {}", cfg.transport.nats_url);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Close any session the UI left running
    let session = state.session.read().await.clone();
    if let Some(session) = session {
        if !session.is_finished() {
            session.stop().await;
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
