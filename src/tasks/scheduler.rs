use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::core::state::AppState;
use crate::tasks::sweeper::ExpirySweeper;

/// Run the periodic background work until a shutdown signal arrives. The
/// sweeper itself owns no timer; the cadence lives here.
pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = ExpirySweeper::from_state(&state);
    let interval_seconds = state.settings().sweeper().sweep_interval_seconds;
    let handle = tokio::spawn(sweep_loop(sweeper, interval_seconds, shutdown_rx));

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    if let Err(err) = handle.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    Ok(())
}

async fn sweep_loop(
    sweeper: ExpirySweeper,
    interval_seconds: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(Duration::from_secs(interval_seconds));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = sweeper.sweep_once().await {
                    tracing::error!(error = %err, "Expiry sweep failed");
                }
            }
        }
    }
}
