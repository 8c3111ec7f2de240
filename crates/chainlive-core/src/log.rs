//! Contract event logs.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::numeric::{lenient_u256, lenient_u256_opt};

/// A raw (undecoded) contract log from the `logs` subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Emitting contract address.
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(with = "lenient_u256")]
    pub block_number: U256,
    pub transaction_hash: String,
    #[serde(default, with = "lenient_u256_opt")]
    pub transaction_index: Option<U256>,
    #[serde(with = "lenient_u256")]
    pub log_index: U256,
    /// Set when the log was dropped by a reorg.
    #[serde(default)]
    pub removed: bool,
}

impl LogRecord {
    /// Display/merge key: `(transaction_hash, log_index)`.
    pub fn key(&self) -> LogKey {
        LogKey {
            transaction_hash: self.transaction_hash.to_ascii_lowercase(),
            log_index: self.log_index,
        }
    }

    /// Event signature hash, if any.
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(String::as_str)
    }
}

/// Composite identity of a log within the chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogKey {
    pub transaction_hash: String,
    #[serde(with = "lenient_u256")]
    pub log_index: U256,
}

// ─── LogFilter ────────────────────────────────────────────────────────────────

/// Address/topic filter for a log subscription.
///
/// Matching follows `eth_subscribe("logs")`: an empty address list matches
/// every address; `topics[i] == None` is a wildcard for position `i`.
/// Comparisons are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub topics: Vec<Option<String>>,
}

impl LogFilter {
    /// Filter for a single contract address.
    pub fn address(addr: impl Into<String>) -> Self {
        Self {
            addresses: vec![addr.into()],
            ..Default::default()
        }
    }

    /// Require `topic` at the next topic position.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(Some(topic.into()));
        self
    }

    /// Accept any value at the next topic position.
    pub fn any_topic(mut self) -> Self {
        self.topics.push(None);
        self
    }

    pub fn matches(&self, log: &LogRecord) -> bool {
        let address_ok = self.addresses.is_empty()
            || self
                .addresses
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&log.address));
        if !address_ok {
            return false;
        }
        self.topics.iter().enumerate().all(|(i, wanted)| match wanted {
            None => true,
            Some(wanted) => log
                .topics
                .get(i)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
        })
    }
}
