//! Store configuration and its fluent builder.
//!
//! # Example
//!
//! ```rust
//! use chainlive_core::StoreConfigBuilder;
//!
//! let config = StoreConfigBuilder::new()
//!     .recent_blocks(25)
//!     .pending_ttl_ms(60_000)
//!     .monotonic_latest(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.recent_blocks, 25);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Realtime chain store: recent confirmed blocks.
pub const RECENT_BLOCKS: usize = 50;
/// Realtime chain store: recent confirmed transactions.
pub const RECENT_TRANSACTIONS: usize = 100;
/// Realtime chain store: pending transactions.
pub const PENDING_TRANSACTIONS: usize = 200;

pub const MAX_RECENT_BLOCKS: usize = 100;
pub const MAX_RECENT_ERRORS: usize = 50;
pub const MAX_RECENT_FORKS: usize = 20;
pub const MAX_RECENT_VALIDATOR_CHANGES: usize = 50;

/// Default per-subscription log buffer.
pub const LOG_CAPACITY: usize = 100;

/// Pending transactions the node never confirms are dropped after this long.
pub const PENDING_TTL_MS: u64 = 5 * 60 * 1000;
/// How often the expiry ticker sweeps the pending list.
pub const EXPIRY_INTERVAL_MS: u64 = 10_000;

/// Capacities and policies for all three stores.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub recent_blocks: usize,
    pub recent_transactions: usize,
    pub pending_transactions: usize,

    pub consensus_recent_blocks: usize,
    pub consensus_recent_errors: usize,
    pub consensus_recent_forks: usize,
    pub consensus_recent_validator_changes: usize,

    pub log_capacity: usize,

    /// Reject a "latest block" whose number is below the current latest.
    /// Off by default: arrival order wins.
    pub monotonic_latest: bool,

    pub pending_ttl_ms: u64,
    pub expiry_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            recent_blocks: RECENT_BLOCKS,
            recent_transactions: RECENT_TRANSACTIONS,
            pending_transactions: PENDING_TRANSACTIONS,
            consensus_recent_blocks: MAX_RECENT_BLOCKS,
            consensus_recent_errors: MAX_RECENT_ERRORS,
            consensus_recent_forks: MAX_RECENT_FORKS,
            consensus_recent_validator_changes: MAX_RECENT_VALIDATOR_CHANGES,
            log_capacity: LOG_CAPACITY,
            monotonic_latest: false,
            pending_ttl_ms: PENDING_TTL_MS,
            expiry_interval_ms: EXPIRY_INTERVAL_MS,
        }
    }
}

impl StoreConfig {
    /// Check that every capacity and interval is non-zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        let capacities = [
            ("recent_blocks", self.recent_blocks),
            ("recent_transactions", self.recent_transactions),
            ("pending_transactions", self.pending_transactions),
            ("consensus_recent_blocks", self.consensus_recent_blocks),
            ("consensus_recent_errors", self.consensus_recent_errors),
            ("consensus_recent_forks", self.consensus_recent_forks),
            (
                "consensus_recent_validator_changes",
                self.consensus_recent_validator_changes,
            ),
            ("log_capacity", self.log_capacity),
        ];
        for (field, value) in capacities {
            if value == 0 {
                return Err(CoreError::invalid(field, "capacity must be at least 1"));
            }
        }
        if self.pending_ttl_ms == 0 {
            return Err(CoreError::invalid("pending_ttl_ms", "TTL must be non-zero"));
        }
        if self.expiry_interval_ms == 0 {
            return Err(CoreError::invalid(
                "expiry_interval_ms",
                "interval must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Fluent builder for [`StoreConfig`].
#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent_blocks(mut self, n: usize) -> Self {
        self.config.recent_blocks = n;
        self
    }

    pub fn recent_transactions(mut self, n: usize) -> Self {
        self.config.recent_transactions = n;
        self
    }

    pub fn pending_transactions(mut self, n: usize) -> Self {
        self.config.pending_transactions = n;
        self
    }

    pub fn consensus_recent_blocks(mut self, n: usize) -> Self {
        self.config.consensus_recent_blocks = n;
        self
    }

    pub fn consensus_recent_errors(mut self, n: usize) -> Self {
        self.config.consensus_recent_errors = n;
        self
    }

    pub fn consensus_recent_forks(mut self, n: usize) -> Self {
        self.config.consensus_recent_forks = n;
        self
    }

    pub fn consensus_recent_validator_changes(mut self, n: usize) -> Self {
        self.config.consensus_recent_validator_changes = n;
        self
    }

    pub fn log_capacity(mut self, n: usize) -> Self {
        self.config.log_capacity = n;
        self
    }

    /// Guard "latest" pointers against out-of-order delivery.
    pub fn monotonic_latest(mut self, on: bool) -> Self {
        self.config.monotonic_latest = on;
        self
    }

    pub fn pending_ttl_ms(mut self, ms: u64) -> Self {
        self.config.pending_ttl_ms = ms;
        self
    }

    pub fn expiry_interval_ms(mut self, ms: u64) -> Self {
        self.config.expiry_interval_ms = ms;
        self
    }

    /// Validate and return the config.
    pub fn build(self) -> Result<StoreConfig, CoreError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.recent_blocks, 50);
        assert_eq!(cfg.recent_transactions, 100);
        assert_eq!(cfg.pending_transactions, 200);
        assert!(!cfg.monotonic_latest);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: StoreConfig =
            serde_json::from_str(r#"{"recent_blocks": 10, "monotonic_latest": true}"#).unwrap();
        assert_eq!(cfg.recent_blocks, 10);
        assert!(cfg.monotonic_latest);
        assert_eq!(cfg.log_capacity, LOG_CAPACITY);
    }

    #[test]
    fn builder_rejects_zero_capacity() {
        let err = StoreConfigBuilder::new().log_capacity(0).build().unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidConfig {
                field: "log_capacity",
                reason: "capacity must be at least 1".into(),
            }
        );
    }

    #[test]
    fn builder_rejects_zero_ttl() {
        assert!(StoreConfigBuilder::new().pending_ttl_ms(0).build().is_err());
    }
}
