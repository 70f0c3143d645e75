use crate::state::{AppState, RefreshOutcome};
use std::time::Duration;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, error, info};

/// Running periodic refresh. Dropping the handle also ends the task.
pub struct RefreshHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            error!("refresh task ended abnormally: {err}");
        }
    }
}

/// Re-reads the store every `every`. The first read is the caller's job.
pub fn spawn(state: AppState, every: Duration) -> RefreshHandle {
    let (shutdown, mut stopped) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("refreshing records every {}s", every.as_secs_f64());

        loop {
            tokio::select! {
                _ = &mut stopped => break,
                _ = ticker.tick() => match state.try_refresh().await {
                    Ok(RefreshOutcome::Refreshed(count)) => debug!(count, "records refreshed"),
                    Ok(RefreshOutcome::Skipped) => debug!("refresh already in flight, skipping"),
                    Err(err) => error!("periodic refresh failed, keeping previous records: {err}"),
                },
            }
        }
        debug!("refresh task stopped");
    });

    RefreshHandle { shutdown, task }
}
