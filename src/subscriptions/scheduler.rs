use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{info, warn};

use crate::config;

use super::service::SubscriptionService;

/// Handle to the background renewal task.
pub struct SweepHandle {
    task: JoinHandle<()>,
}

impl SweepHandle {
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

/// key: renewal-scheduler -> periodic sweep driver
pub fn spawn(service: Arc<SubscriptionService>) -> SweepHandle {
    let interval = Duration::from_secs(*config::RENEWAL_SWEEP_INTERVAL_SECS);

    let task = tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = interval.as_secs(), "renewal scheduler started");
        loop {
            ticker.tick().await;
            if let Err(err) = service.renew_subscriptions(Utc::now()).await {
                warn!(?err, "renewal sweep tick failed");
            }
        }
    });

    SweepHandle { task }
}
