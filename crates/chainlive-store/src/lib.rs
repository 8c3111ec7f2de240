//! chainlive-store — the realtime state layer.
//!
//! # Architecture
//!
//! ```text
//! ChainCommand ─────► ChainStore      (latest block/tx, recent lists, pending lifecycle)
//! ConsensusCommand ─► ConsensusStore  (recent blocks/errors/forks/validator changes)
//!                          └── stats::summarize_blocks / stats::compute_health
//! LogCommand ───────► LogStore        (one per live log subscription)
//!
//! readers ──► selectors::{chain, consensus} (pure functions over state)
//! ```
//!
//! Every store is a plain synchronous reducer: one command in, state updated
//! to completion, no I/O. Wrapping a store for multi-threaded use is the
//! job of `chainlive-sync`.

pub mod chain_store;
pub mod consensus_store;
pub mod log_store;
pub mod reducer;
pub mod selectors;
pub mod stats;

pub use chain_store::{ChainCommand, ChainState, ChainStore};
pub use consensus_store::{ConnectionState, ConsensusCommand, ConsensusState, ConsensusStore};
pub use log_store::{unseen_logs, LogCommand, LogState, LogStore};
pub use reducer::Reducer;
pub use selectors::FeedStatus;
pub use stats::{ConsensusStats, ErrorsBySeverity, HealthStatus, NetworkHealth};
