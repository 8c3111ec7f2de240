//! Periodic pending-transaction expiry.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use chainlive_store::{ChainCommand, ChainStore};

use crate::handle::StoreHandle;

/// Send `CleanExpiredPending { ttl_ms }` to the chain store every `every`.
///
/// The task ends on its own once the chain store's writer has stopped.
pub fn spawn_pending_expiry(
    handle: StoreHandle<ChainStore>,
    every: Duration,
    ttl_ms: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if handle
                .send(ChainCommand::CleanExpiredPending { ttl_ms })
                .is_err()
            {
                tracing::debug!("chain store stopped, ending pending expiry");
                break;
            }
        }
    })
}
