//! Realtime chain store — confirmed blocks, confirmed transactions and the
//! pending-transaction lifecycle.
//!
//! Pending membership is "seen, not yet confirmed, not yet expired":
//! confirmation ([`ChainStore::set_latest_transaction`]) and expiry
//! ([`ChainStore::clean_expired_pending_transactions`]) are the only ways
//! an entry leaves the pending list, apart from an explicit removal.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use chainlive_core::{
    BlockRecord, BoundedFifo, Clock, PendingTransaction, StoreConfig, SystemClock,
    TransactionRecord,
};

use crate::reducer::Reducer;

fn block_key(block: &BlockRecord) -> String {
    block.hash.to_ascii_lowercase()
}

fn tx_key(tx: &TransactionRecord) -> String {
    tx.hash.to_ascii_lowercase()
}

fn pending_key(pending: &PendingTransaction) -> String {
    pending.tx.hash.to_ascii_lowercase()
}

// ─── State ────────────────────────────────────────────────────────────────────

/// Everything the chain store holds. Read it through [`crate::selectors::chain`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    pub(crate) is_connected: bool,
    pub(crate) last_connected_at: Option<i64>,
    pub(crate) latest_block: Option<BlockRecord>,
    pub(crate) recent_blocks: BoundedFifo<BlockRecord, String>,
    pub(crate) latest_transaction: Option<TransactionRecord>,
    pub(crate) recent_transactions: BoundedFifo<TransactionRecord, String>,
    pub(crate) pending_transactions: BoundedFifo<PendingTransaction, String>,
}

impl ChainState {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            is_connected: false,
            last_connected_at: None,
            latest_block: None,
            recent_blocks: BoundedFifo::keyed(config.recent_blocks, block_key),
            latest_transaction: None,
            recent_transactions: BoundedFifo::keyed(config.recent_transactions, tx_key),
            pending_transactions: BoundedFifo::keyed(config.pending_transactions, pending_key),
        }
    }
}

// ─── Commands ────────────────────────────────────────────────────────────────

/// One mutation of the chain store, as sent by the ingestion boundary.
#[derive(Debug, Clone)]
pub enum ChainCommand {
    SetConnected(bool),
    Block(BlockRecord),
    Transaction(TransactionRecord),
    PendingTransaction(TransactionRecord),
    RemovePendingTransaction(String),
    CleanExpiredPending { ttl_ms: u64 },
    Reset,
}

// ─── Store ────────────────────────────────────────────────────────────────────

/// The process-wide chain store.
pub struct ChainStore {
    state: ChainState,
    clock: Arc<dyn Clock>,
    monotonic_latest: bool,
}

impl ChainStore {
    /// Store stamped with wall-clock time.
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ChainState::new(config),
            clock,
            monotonic_latest: config.monotonic_latest,
        }
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// Set the connection flag.
    ///
    /// Going up stamps `last_connected_at`; going down clears it.
    pub fn set_connected(&mut self, connected: bool) -> bool {
        if self.state.is_connected == connected {
            return false;
        }
        let now = self.clock.now_ms();
        self.state.is_connected = connected;
        self.state.last_connected_at = connected.then_some(now);
        info!(connected, "chain store connection changed");
        true
    }

    /// Ingest a confirmed block.
    ///
    /// A block whose hash is already in `recent_blocks` is ignored. Otherwise
    /// it becomes the latest block and the store is marked connected.
    pub fn set_latest_block(&mut self, block: BlockRecord) -> bool {
        if self.state.recent_blocks.contains_key(&block_key(&block)) {
            debug!(hash = %block.hash, "duplicate block ignored");
            return false;
        }
        if self.monotonic_latest {
            if let Some(latest) = &self.state.latest_block {
                if block.number < latest.number {
                    debug!(
                        number = %block.number,
                        latest = %latest.number,
                        "stale block rejected"
                    );
                    return false;
                }
            }
        }

        self.state.recent_blocks.push(block.clone());
        self.state.latest_block = Some(block);
        self.set_connected(true);
        true
    }

    /// Ingest a confirmed transaction; closes its pending lifecycle.
    pub fn set_latest_transaction(&mut self, tx: TransactionRecord) -> bool {
        let key = tx_key(&tx);
        if self.state.recent_transactions.contains_key(&key) {
            debug!(hash = %tx.hash, "duplicate transaction ignored");
            return false;
        }

        let confirmed = self
            .state
            .pending_transactions
            .remove_where(|p| pending_key(p) == key);
        if confirmed > 0 {
            debug!(hash = %tx.hash, "pending transaction confirmed");
        }

        self.state.recent_transactions.push(tx.clone());
        self.state.latest_transaction = Some(tx);
        true
    }

    /// Track a transaction seen in the mempool.
    ///
    /// Ignored if it is already pending or already confirmed.
    pub fn add_pending_transaction(&mut self, tx: TransactionRecord) -> bool {
        if self.state.recent_transactions.contains_key(&tx_key(&tx)) {
            debug!(hash = %tx.hash, "pending notification for confirmed transaction ignored");
            return false;
        }
        let pending = PendingTransaction {
            tx,
            seen_at: self.clock.now_ms(),
        };
        self.state.pending_transactions.push(pending).is_stored()
    }

    pub fn remove_pending_transaction(&mut self, hash: &str) -> bool {
        self.state
            .pending_transactions
            .remove_where(|p| p.tx.hash.eq_ignore_ascii_case(hash))
            > 0
    }

    /// Drop every pending entry older than `ttl_ms`. Returns how many were dropped.
    ///
    /// The store never schedules this itself.
    pub fn clean_expired_pending_transactions(&mut self, ttl_ms: u64) -> usize {
        let now = self.clock.now_ms();
        let expired = self
            .state
            .pending_transactions
            .remove_where(|p| p.is_expired(now, ttl_ms));
        if expired > 0 {
            debug!(expired, ttl_ms, "expired pending transactions dropped");
        }
        expired
    }

    /// Back to the initial empty, disconnected state.
    pub fn reset(&mut self) {
        let state = &mut self.state;
        state.is_connected = false;
        state.last_connected_at = None;
        state.latest_block = None;
        state.recent_blocks.clear();
        state.latest_transaction = None;
        state.recent_transactions.clear();
        state.pending_transactions.clear();
        info!("chain store reset");
    }
}

impl Reducer for ChainStore {
    type Command = ChainCommand;
    type State = ChainState;

    fn apply(&mut self, command: ChainCommand) -> bool {
        match command {
            ChainCommand::SetConnected(connected) => self.set_connected(connected),
            ChainCommand::Block(block) => self.set_latest_block(block),
            ChainCommand::Transaction(tx) => self.set_latest_transaction(tx),
            ChainCommand::PendingTransaction(tx) => self.add_pending_transaction(tx),
            ChainCommand::RemovePendingTransaction(hash) => self.remove_pending_transaction(&hash),
            ChainCommand::CleanExpiredPending { ttl_ms } => {
                self.clean_expired_pending_transactions(ttl_ms) > 0
            }
            ChainCommand::Reset => {
                self.reset();
                true
            }
        }
    }

    fn state(&self) -> &ChainState {
        &self.state
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
