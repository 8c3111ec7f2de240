//! chainlive-core — foundation for the ChainLive realtime state layer.
//!
//! # Architecture
//!
//! ```text
//! subscription boundary ──► typed events (chain / consensus / log)
//!                                 │
//!                                 ▼
//!                           BoundedFifo      (newest-first, optional identity key)
//!                                 │
//!                                 ▼
//!             ChainStore · ConsensusStore · LogStore   (chainlive-store)
//! ```
//!
//! This crate holds everything the stores share: the event records, the
//! lenient wide-integer parsing used by every string-encoded chain value,
//! the ring-buffer primitive, the clock abstraction and configuration.

pub mod chain;
pub mod clock;
pub mod config;
pub mod consensus;
pub mod error;
pub mod log;
pub mod numeric;
pub mod ring;

pub use chain::{BlockRecord, PendingTransaction, TransactionRecord};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{StoreConfig, StoreConfigBuilder};
pub use consensus::{
    ChainDescriptor, ConsensusBlockEvent, ConsensusErrorEvent, ConsensusErrorType, ForkBranch,
    ForkEvent, Received, Severity, ValidatorChangeEvent, ValidatorChangeType,
};
pub use error::CoreError;
pub use log::{LogFilter, LogKey, LogRecord};
pub use numeric::parse_u256;
pub use ring::{BoundedFifo, PushOutcome};

pub use alloy_primitives::U256;
