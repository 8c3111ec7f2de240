//! Routes subscription messages to the store that owns them.
//!
//! One ingestion task per feed decodes `(topic, payload)` pairs and hands
//! them to the [`Dispatcher`]. Decoding happens here, at the boundary, so
//! the stores only ever see well-typed commands.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chainlive_core::{ForkBranch, LogFilter, LogRecord};
use chainlive_store::{
    ChainCommand, ChainStore, ConsensusCommand, ConsensusStore, LogCommand, LogStore,
};

use crate::error::SyncError;
use crate::handle::{spawn_store, StoreHandle};

// ─── Topic ────────────────────────────────────────────────────────────────────

/// Subscription channel a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    Blocks,
    Transactions,
    PendingTransactions,
    Logs,
    ConsensusBlocks,
    ConsensusErrors,
    Forks,
    ForkResolutions,
    ValidatorChanges,
    ChainConfig,
    Connection,
}

impl Topic {
    pub const ALL: [Topic; 11] = [
        Self::Blocks,
        Self::Transactions,
        Self::PendingTransactions,
        Self::Logs,
        Self::ConsensusBlocks,
        Self::ConsensusErrors,
        Self::Forks,
        Self::ForkResolutions,
        Self::ValidatorChanges,
        Self::ChainConfig,
        Self::Connection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Transactions => "transactions",
            Self::PendingTransactions => "pendingTransactions",
            Self::Logs => "logs",
            Self::ConsensusBlocks => "consensusBlocks",
            Self::ConsensusErrors => "consensusErrors",
            Self::Forks => "forks",
            Self::ForkResolutions => "forkResolutions",
            Self::ValidatorChanges => "validatorChanges",
            Self::ChainConfig => "chainConfig",
            Self::Connection => "connection",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SyncError::UnknownTopic(s.to_string()))
    }
}

// ─── Wire messages ────────────────────────────────────────────────────────────

/// One captured subscription message: `{"topic": "...", "payload": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionMessage {
    pub topic: String,
    #[serde(default)]
    pub payload: Value,
}

/// Which feed a `connection` message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Feed {
    Chain,
    Consensus,
}

#[derive(Debug, Deserialize)]
struct ConnectionMessage {
    feed: Feed,
    connected: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForkResolutionMessage {
    fork_block_number: u64,
    winning_chain: ForkBranch,
}

/// A unique log subscription ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Dispatcher ───────────────────────────────────────────────────────────────

type LogHandles = HashMap<SubscriptionId, StoreHandle<LogStore>>;

/// Routes decoded subscription payloads to the chain, consensus and log stores.
#[derive(Clone)]
pub struct Dispatcher {
    chain: StoreHandle<ChainStore>,
    consensus: StoreHandle<ConsensusStore>,
    logs: Arc<Mutex<LogHandles>>,
    log_capacity: usize,
}

impl Dispatcher {
    pub fn new(
        chain: StoreHandle<ChainStore>,
        consensus: StoreHandle<ConsensusStore>,
        log_capacity: usize,
    ) -> Self {
        Self {
            chain,
            consensus,
            logs: Arc::new(Mutex::new(HashMap::new())),
            log_capacity,
        }
    }

    pub fn chain(&self) -> &StoreHandle<ChainStore> {
        &self.chain
    }

    pub fn consensus(&self) -> &StoreHandle<ConsensusStore> {
        &self.consensus
    }

    /// Start a log store for a new subscription and register it for fan-out.
    ///
    /// Re-opening an existing id replaces the previous store.
    pub fn open_log_subscription(
        &self,
        id: impl Into<SubscriptionId>,
        filter: LogFilter,
    ) -> StoreHandle<LogStore> {
        let id = id.into();
        let (handle, _task) = spawn_store(LogStore::with_filter(self.log_capacity, filter));
        tracing::info!(subscription = %id, "log subscription opened");
        self.lock_logs().insert(id, handle.clone());
        handle
    }

    /// Drop a log subscription. Its writer task stops once the caller's
    /// handles are gone too.
    pub fn close_log_subscription(&self, id: &SubscriptionId) -> Result<(), SyncError> {
        match self.lock_logs().remove(id) {
            Some(_) => {
                tracing::info!(subscription = %id, "log subscription closed");
                Ok(())
            }
            None => Err(SyncError::UnknownSubscription(id.to_string())),
        }
    }

    pub fn log_subscription(&self, id: &SubscriptionId) -> Option<StoreHandle<LogStore>> {
        self.lock_logs().get(id).cloned()
    }

    /// Number of open log subscriptions.
    pub fn log_subscription_count(&self) -> usize {
        self.lock_logs().len()
    }

    /// Decode and route a raw `{"topic", "payload"}` message.
    pub fn dispatch_message(&self, message: SubscriptionMessage) -> Result<(), SyncError> {
        let topic = Topic::from_str(&message.topic)?;
        self.dispatch(topic, message.payload)
    }

    /// Decode `payload` according to `topic` and send it to the owning store.
    pub fn dispatch(&self, topic: Topic, payload: Value) -> Result<(), SyncError> {
        match topic {
            Topic::Blocks => {
                let block = decode(topic, payload)?;
                self.chain.send(ChainCommand::Block(block))
            }
            Topic::Transactions => {
                let tx = decode(topic, payload)?;
                self.chain.send(ChainCommand::Transaction(tx))
            }
            Topic::PendingTransactions => {
                let tx = decode(topic, payload)?;
                self.chain.send(ChainCommand::PendingTransaction(tx))
            }
            Topic::Logs => {
                let log: LogRecord = decode(topic, payload)?;
                for handle in self.lock_logs().values() {
                    if let Err(e) = handle.send(LogCommand::Ingest(log.clone())) {
                        tracing::debug!(error = %e, "skipping stopped log store");
                    }
                }
                Ok(())
            }
            Topic::ConsensusBlocks => {
                let block = decode(topic, payload)?;
                self.consensus.send(ConsensusCommand::Block(block))
            }
            Topic::ConsensusErrors => {
                let error = decode(topic, payload)?;
                self.consensus.send(ConsensusCommand::Error(error))
            }
            Topic::Forks => {
                let fork = decode(topic, payload)?;
                self.consensus.send(ConsensusCommand::Fork(fork))
            }
            Topic::ForkResolutions => {
                let msg: ForkResolutionMessage = decode(topic, payload)?;
                self.consensus.send(ConsensusCommand::ForkResolution {
                    fork_block_number: msg.fork_block_number,
                    winning_chain: msg.winning_chain,
                })
            }
            Topic::ValidatorChanges => {
                let change = decode(topic, payload)?;
                self.consensus.send(ConsensusCommand::ValidatorChange(change))
            }
            Topic::ChainConfig => {
                tracing::debug!("ignoring chainConfig message");
                Ok(())
            }
            Topic::Connection => {
                let msg: ConnectionMessage = decode(topic, payload)?;
                match msg.feed {
                    Feed::Chain => self.chain.send(ChainCommand::SetConnected(msg.connected)),
                    Feed::Consensus => self.consensus.send(ConsensusCommand::ConnectionStatus {
                        connected: msg.connected,
                        error: msg.error,
                    }),
                }
            }
        }
    }

    /// Wait until every store has applied everything dispatched so far.
    pub async fn flush(&self) -> Result<(), SyncError> {
        self.chain.flush().await?;
        self.consensus.flush().await?;
        let logs: Vec<_> = self.lock_logs().values().cloned().collect();
        for handle in logs {
            handle.flush().await?;
        }
        Ok(())
    }

    fn lock_logs(&self) -> MutexGuard<'_, LogHandles> {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode<T: DeserializeOwned>(topic: Topic, payload: Value) -> Result<T, SyncError> {
    serde_json::from_value(payload).map_err(|e| {
        tracing::warn!(%topic, error = %e, "dropping malformed payload");
        SyncError::Decode {
            topic,
            reason: e.to_string(),
        }
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
