//! Audio Host (cwae-host) - Main entry point
//!
//! Brings the sound engine up, loads the configured banks, posts one event
//! against one game object, renders for a fixed number of frames and tears
//! everything down again.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cwae_common::config::{load_host_config, resolve_bank_root, BANK_ROOT_ENV};
use cwae_host::{EngineHandle, IntervalClock, RenderLoop, SimulatedEngine};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cwae-host
#[derive(Parser, Debug)]
#[command(name = "cwae-host")]
#[command(about = "Sound engine bring-up harness")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CWAE_CONFIG")]
    config: Option<PathBuf>,

    /// Folder containing sound banks
    #[arg(short, long)]
    bank_root: Option<PathBuf>,

    /// Language subfolder for localized banks
    #[arg(short, long, env = "CWAE_LANGUAGE")]
    language: Option<String>,

    /// Number of render frames before shutdown
    #[arg(short, long)]
    frames: Option<u32>,

    /// Milliseconds between render frames
    #[arg(long)]
    frame_period_ms: Option<u64>,

    /// Event to post
    #[arg(short, long)]
    event: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cwae_host=debug,cwae_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config =
        load_host_config(args.config.as_deref()).context("Failed to load configuration")?;
    config.bank_root = resolve_bank_root(
        args.bank_root.as_deref(),
        BANK_ROOT_ENV,
        Some(config.bank_root.as_path()),
    );
    if let Some(language) = args.language {
        config.language = language;
    }
    if let Some(frames) = args.frames {
        config.frame_count = frames;
    }
    if let Some(period) = args.frame_period_ms {
        config.frame_period_ms = period;
    }
    if let Some(event) = args.event {
        config.event = event;
    }
    config.validate().context("Invalid configuration")?;

    info!("Bank root: {}", config.bank_root.display());
    info!("Language: {}", config.language);

    let mut handle = EngineHandle::new(SimulatedEngine::new(), config.clone());
    handle
        .initialize()
        .context("Failed to initialize sound engine")?;

    for bank in &config.banks {
        if let Err(e) = handle.load_bank(bank) {
            warn!("Failed to load bank {}: {}", bank, e);
        }
    }

    let game_object = handle
        .register_game_object(&config.game_object)
        .context("Failed to register game object")?;

    if let Err(e) = handle.post_event(&config.event, game_object) {
        warn!("Failed to post {}: {}", config.event, e);
    }

    let mut clock = IntervalClock::new(Duration::from_millis(config.frame_period_ms));
    let render_result = RenderLoop::new(u64::from(config.frame_count))
        .run(&mut handle, &mut clock, shutdown_signal())
        .await;
    match &render_result {
        Ok(summary) => info!(
            "Rendered {} frames{}",
            summary.ticks,
            if summary.interrupted { " (interrupted)" } else { "" }
        ),
        Err(e) => error!("Render loop failed: {}", e),
    }

    if let Err(e) = handle.unregister_game_object(game_object) {
        warn!("Failed to unregister game object {}: {}", game_object, e);
    }
    for bank in config.banks.iter().rev() {
        if handle.bank_ref_count(bank) > 0 {
            if let Err(e) = handle.unload_bank_by_name(bank) {
                warn!("Failed to unload bank {}: {}", bank, e);
            }
        }
    }
    handle
        .terminate()
        .context("Failed to terminate sound engine")?;
    render_result.context("Render loop failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
