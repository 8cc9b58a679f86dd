//! Garden demo - headless session driven by a scripted player
//!
//! Builds the sandbox garden, lets the demo script walk up to the opponent
//! and play the match through, then logs the session summary.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use garden_core::config::Config;
use garden_core::sandbox::{DemoScript, GardenSpec, Sandbox};
use garden_core::scene::{GardenScene, RunnerSettings, SceneRunner, SceneSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting garden demo");
    info!(
        max_turns = config.max_turns,
        tick_rate = config.tick_rate,
        platform = ?config.platform,
        "Session settings"
    );

    let world = Sandbox::garden(&GardenSpec {
        slot_count: config.max_turns,
        ..GardenSpec::default()
    });
    let scene = GardenScene::new(world, SceneSettings::from_config(&config))
        .context("failed to set up the garden scene")?;
    let runner = SceneRunner::new(scene, DemoScript::new(), RunnerSettings::from_config(&config));

    tokio::select! {
        result = runner.run() => {
            let summary = result.context("session aborted")?;
            info!(summary = %serde_json::to_string(&summary)?, "Match summary");
        }
        _ = shutdown_signal() => {
            info!("Session interrupted");
        }
    }

    info!("Garden demo shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping session");
        }
        _ = terminate => {
            info!("Received terminate signal, stopping session");
        }
    }
}
