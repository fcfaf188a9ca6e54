use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::metrics::SCREEN_SWEEPS_TOTAL;
use crate::services::{screen_service::ScreenService, AppState};

/// Background loop that unmounts screens abandoned without a `DELETE`.
pub struct ScreenSweeper {
    service: ScreenService,
    interval: Duration,
    idle_timeout: Duration,
}

impl ScreenSweeper {
    pub fn new(state: Arc<AppState>) -> Self {
        let interval = Duration::from_secs(state.config.engine.sweep_interval_secs);
        let idle_timeout = Duration::from_secs(state.config.engine.screen_idle_timeout_secs);
        Self {
            service: ScreenService::new(state),
            interval,
            idle_timeout,
        }
    }

    pub async fn run(&self) {
        info!(
            "Starting screen sweeper (interval {}s, idle timeout {}s)",
            self.interval.as_secs(),
            self.idle_timeout.as_secs()
        );

        loop {
            sleep(self.interval).await;
            self.run_once().await;
        }
    }

    pub async fn run_once(&self) -> usize {
        let evicted = self.service.evict_idle(self.idle_timeout).await;
        SCREEN_SWEEPS_TOTAL.inc();
        debug!("Screen sweep finished: {} evicted", evicted);
        evicted
    }
}
