//! chainlive-sync — multi-threaded access to the realtime stores.
//!
//! # Architecture
//!
//! ```text
//! subscription channels ──► Dispatcher ──► StoreHandle<ChainStore>      ─┐
//!   (one per topic)            │       ──► StoreHandle<ConsensusStore>  ─┤ single writer task each
//!                              └─────────► StoreHandle<LogStore> × N    ─┘
//!                                                   │
//!                          readers ◄── Arc<State> snapshots (watch channel)
//!
//! spawn_pending_expiry ── periodic CleanExpiredPending ──► chain handle
//! ```
//!
//! Each store is owned by exactly one writer task, so commands are applied
//! one at a time in send order. Readers never wait on the writer: they get
//! the last published snapshot.

pub mod dispatcher;
pub mod error;
pub mod expiry;
pub mod handle;
pub mod realtime;

pub use dispatcher::{Dispatcher, SubscriptionId, SubscriptionMessage, Topic};
pub use error::SyncError;
pub use expiry::spawn_pending_expiry;
pub use handle::{spawn_store, StoreHandle};
pub use realtime::Realtime;
