// Letterbox - reminder daemon for digitized letters
// Entry point: opens the store, re-arms pending reminders, delivers alarms

use chrono::Utc;
use letterbox::config::{resolve_data_dir, AppConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = resolve_data_dir(std::env::args().nth(1));

    // The log filter lives in the config, so read it before logging exists
    let log_filter = AppConfig::read(&data_dir)
        .await?
        .unwrap_or_default()
        .log_filter;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Letterbox in {:?}", data_dir);

    let config = AppConfig::load(&data_dir).await?;

    let state = letterbox::app::setup(&data_dir, config).await?;

    // Nothing is being edited yet, so stray page images can go
    let swept = state.letters.sweep_orphan_blobs().await?;
    if swept > 0 {
        tracing::info!("Removed {} orphaned page image(s)", swept);
    }

    let mut deliveries = state.scheduler.subscribe();
    state.scheduler.start().await?;

    // Process start stands in for the boot-completed signal
    if state.config.rehydrate_on_start {
        state.rehydration.rehydrate(Utc::now()).await?;
    }

    loop {
        tokio::select! {
            delivered = deliveries.recv() => match delivered {
                Ok(payload) => tracing::info!(
                    "Reminder due: {} - {}",
                    payload.title,
                    payload.description.as_deref().unwrap_or("")
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Missed {} reminder deliveries", missed)
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    state.scheduler.shutdown().await?;
    Ok(())
}
