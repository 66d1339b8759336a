// Guest Sweeper - periodic cleanup of idle guest identities
//
// Guests are also purged opportunistically inside the transaction that
// concludes their last active entry; this sweep catches stragglers (crashes,
// rows predating the opportunistic purge).

use crate::port::QueueStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

pub struct GuestSweeper {
    store: Arc<dyn QueueStore>,
    interval_hours: u64,
}

impl GuestSweeper {
    pub fn new(store: Arc<dyn QueueStore>, interval_hours: u64) -> Self {
        Self {
            store,
            interval_hours,
        }
    }

    /// Sweep loop. Should be spawned in tokio::spawn; dropped on shutdown.
    pub async fn run(self) {
        info!(
            interval_hours = self.interval_hours,
            "Guest sweeper started"
        );

        let mut tick = interval(Duration::from_secs(self.interval_hours * 3600));
        // The first tick fires immediately, which doubles as a startup sweep
        loop {
            tick.tick().await;

            match self.store.purge_idle_guests().await {
                Ok(0) => info!("No idle guest records to clean up"),
                Ok(purged) => info!(purged = purged, "Idle guest records removed"),
                Err(e) => error!(error = %e, "Guest sweep failed"),
            }
        }
    }
}
