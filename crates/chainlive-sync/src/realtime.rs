//! One-call wiring of the realtime stores.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use chainlive_core::{Clock, StoreConfig, SystemClock};
use chainlive_store::{ChainStore, ConsensusStore};

use crate::dispatcher::Dispatcher;
use crate::error::SyncError;
use crate::expiry::spawn_pending_expiry;
use crate::handle::spawn_store;

/// The running chain and consensus stores, their dispatcher and the
/// pending-expiry ticker.
pub struct Realtime {
    dispatcher: Dispatcher,
    expiry: JoinHandle<()>,
}

impl Realtime {
    /// Validate `config` and start everything on the current runtime.
    pub fn spawn(config: &StoreConfig) -> Result<Self, SyncError> {
        Self::spawn_with_clock(config, Arc::new(SystemClock))
    }

    pub fn spawn_with_clock(
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SyncError> {
        config.validate()?;
        let (chain, _) = spawn_store(ChainStore::with_clock(config, clock.clone()));
        let (consensus, _) = spawn_store(ConsensusStore::with_clock(config, clock));
        let expiry = spawn_pending_expiry(
            chain.clone(),
            Duration::from_millis(config.expiry_interval_ms),
            config.pending_ttl_ms,
        );
        tracing::info!(
            recent_blocks = config.recent_blocks,
            pending_ttl_ms = config.pending_ttl_ms,
            monotonic_latest = config.monotonic_latest,
            "realtime stores started"
        );
        Ok(Self {
            dispatcher: Dispatcher::new(chain, consensus, config.log_capacity),
            expiry,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

/// Stops the expiry ticker. Store writers stop when their last handle drops.
impl Drop for Realtime {
    fn drop(&mut self) {
        self.expiry.abort();
    }
}
