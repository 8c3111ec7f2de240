//! Confirmed blocks, transactions and pending transactions.
//!
//! All chain quantities arrive as decimal strings and are held as [`U256`];
//! see [`crate::numeric`] for the coercion rules.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::numeric::{lenient_u256, lenient_u256_opt};

// ─── BlockRecord ─────────────────────────────────────────────────────────────

/// A block as delivered by the `blocks` subscription.
///
/// Identity is `hash`; ordering is `number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    #[serde(with = "lenient_u256")]
    pub number: U256,
    /// Block hash (`0x…`).
    pub hash: String,
    #[serde(default)]
    pub parent_hash: Option<String>,
    /// Unix timestamp (seconds).
    #[serde(with = "lenient_u256")]
    pub timestamp: U256,
    #[serde(default)]
    pub miner: Option<String>,
    #[serde(default, with = "lenient_u256_opt")]
    pub gas_used: Option<U256>,
    #[serde(default, with = "lenient_u256_opt")]
    pub gas_limit: Option<U256>,
    #[serde(default, with = "lenient_u256_opt")]
    pub size: Option<U256>,
    #[serde(default, alias = "txCount", with = "lenient_u256")]
    pub transaction_count: U256,

    // EIP-1559
    #[serde(default, with = "lenient_u256_opt")]
    pub base_fee_per_gas: Option<U256>,
    // Shanghai
    #[serde(default)]
    pub withdrawals_root: Option<String>,
    // EIP-4844 / Cancun
    #[serde(default, with = "lenient_u256_opt")]
    pub blob_gas_used: Option<U256>,
    #[serde(default, with = "lenient_u256_opt")]
    pub excess_blob_gas: Option<U256>,
    #[serde(default)]
    pub parent_beacon_block_root: Option<String>,
}

impl BlockRecord {
    /// Minimal block with the identity and ordering fields set.
    pub fn new(number: u64, hash: impl Into<String>) -> Self {
        Self {
            number: U256::from(number),
            hash: hash.into(),
            parent_hash: None,
            timestamp: U256::ZERO,
            miner: None,
            gas_used: None,
            gas_limit: None,
            size: None,
            transaction_count: U256::ZERO,
            base_fee_per_gas: None,
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
        }
    }

    /// Gas used as a percentage of the gas limit, if both are known.
    pub fn gas_utilization(&self) -> Option<f64> {
        let used = self.gas_used?;
        let limit = self.gas_limit?;
        if limit.is_zero() {
            return None;
        }
        let used: f64 = used.to_string().parse().ok()?;
        let limit: f64 = limit.to_string().parse().ok()?;
        Some(used / limit * 100.0)
    }
}

// ─── TransactionRecord ──────────────────────────────────────────────────────

/// A transaction from the `transactions` or `pendingTransactions` feed.
///
/// The same logical transaction is first seen pending and later confirmed;
/// both observations share `hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    pub from: String,
    /// `None` for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default, with = "lenient_u256")]
    pub value: U256,
    #[serde(default, with = "lenient_u256")]
    pub gas: U256,
    #[serde(default, with = "lenient_u256_opt")]
    pub gas_price: Option<U256>,
    #[serde(default, with = "lenient_u256_opt")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, with = "lenient_u256_opt")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default, with = "lenient_u256")]
    pub nonce: U256,
    #[serde(default, rename = "type", with = "lenient_u256_opt")]
    pub tx_type: Option<U256>,
    #[serde(default)]
    pub input: Option<String>,
    /// Set once the transaction is mined.
    #[serde(default, with = "lenient_u256_opt")]
    pub block_number: Option<U256>,
    #[serde(default)]
    pub block_hash: Option<String>,

    // Fee delegation
    #[serde(default)]
    pub fee_payer: Option<String>,
    #[serde(default, with = "lenient_u256_opt")]
    pub fee_ratio: Option<U256>,
}

impl TransactionRecord {
    pub fn new(hash: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            from: from.into(),
            to: None,
            value: U256::ZERO,
            gas: U256::ZERO,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            nonce: U256::ZERO,
            tx_type: None,
            input: None,
            block_number: None,
            block_hash: None,
            fee_payer: None,
            fee_ratio: None,
        }
    }

    /// Returns `true` for contract-creation transactions.
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Returns `true` if a fee payer other than the sender is attached.
    pub fn is_fee_delegated(&self) -> bool {
        self.fee_payer.is_some()
    }
}

// ─── PendingTransaction ─────────────────────────────────────────────────────

/// A transaction that has been seen in the mempool but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    #[serde(flatten)]
    pub tx: TransactionRecord,
    /// Capture time (ms since epoch), used for TTL expiry.
    pub seen_at: i64,
}

impl PendingTransaction {
    /// Returns `true` if this entry is older than `ttl_ms` at `now_ms`.
    ///
    /// A TTL beyond `i64::MAX` milliseconds never expires anything.
    pub fn is_expired(&self, now_ms: i64, ttl_ms: u64) -> bool {
        let ttl = i64::try_from(ttl_ms).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.seen_at) > ttl
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
