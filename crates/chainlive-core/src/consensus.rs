//! Consensus telemetry events: per-block round data, consensus errors,
//! forks and validator-set changes.
//!
//! Unlike chain records these arrive as plain JSON numbers.

use std::ops::Deref;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::numeric::lenient_u256;

// ─── Received<T> ──────────────────────────────────────────────────────────────

/// An event plus the store-local time it was ingested.
///
/// `received_at` is not part of the wire event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Received<T> {
    #[serde(flatten)]
    pub event: T,
    pub received_at: i64,
}

impl<T> Received<T> {
    pub fn new(event: T, received_at: i64) -> Self {
        Self { event, received_at }
    }
}

impl<T> Deref for Received<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.event
    }
}

// ─── ConsensusBlockEvent ─────────────────────────────────────────────────────

/// Consensus data for one finalized block. Identity key: `block_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusBlockEvent {
    pub block_number: u64,
    pub block_hash: String,
    pub timestamp: u64,
    pub round: u32,
    #[serde(default)]
    pub prev_round: u32,
    pub round_changed: bool,
    pub proposer: String,
    #[serde(default)]
    pub validator_count: u32,
    #[serde(default)]
    pub prepare_count: u32,
    #[serde(default)]
    pub commit_count: u32,
    /// Percentage of the validator set that signed, 0–100.
    pub participation_rate: f64,
    #[serde(default)]
    pub missed_validator_rate: f64,
    #[serde(default)]
    pub is_epoch_boundary: bool,
}

// ─── ConsensusErrorEvent ─────────────────────────────────────────────────────

/// Category of a consensus error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusErrorType {
    RoundChange,
    MissedValidators,
    LowParticipation,
    ProposerTimeout,
    #[serde(other)]
    Unknown,
}

/// Severity of a consensus error, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Critical and high severities are surfaced as high priority.
    pub fn is_high_priority(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A consensus anomaly. Errors form a log: no identity key, no dedup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusErrorEvent {
    pub block_number: u64,
    #[serde(default)]
    pub block_hash: String,
    pub timestamp: u64,
    pub error_type: ConsensusErrorType,
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub expected_signers: u32,
    #[serde(default)]
    pub actual_signers: u32,
    #[serde(default)]
    pub participation_rate: f64,
    #[serde(default)]
    pub consensus_impacted: bool,
}

// ─── ForkEvent ────────────────────────────────────────────────────────────────

/// One side of a fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub hash: String,
    pub height: u64,
    /// Cumulative weight (difficulty / stake) of this branch.
    #[serde(default, with = "lenient_u256")]
    pub weight: U256,
}

/// Which of the two competing chains won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkBranch {
    Chain1,
    Chain2,
}

/// A detected fork.
///
/// Created unresolved; later only `resolved` and `winning_chain` change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkEvent {
    pub fork_block_number: u64,
    pub fork_block_hash: String,
    pub chain1: ChainDescriptor,
    pub chain2: ChainDescriptor,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub winning_chain: Option<ForkBranch>,
    /// Detection time (ms since epoch).
    pub detected_at: i64,
    /// Blocks between the fork point and detection.
    #[serde(default)]
    pub detection_lag: u64,
}

// ─── ValidatorChangeEvent ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidatorChangeType {
    Added,
    Removed,
    Rotated,
    #[serde(other)]
    Unknown,
}

/// A change in the active validator set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorChangeEvent {
    pub block_number: u64,
    #[serde(default)]
    pub block_hash: String,
    pub timestamp: u64,
    pub epoch: u64,
    #[serde(default)]
    pub is_epoch_boundary: bool,
    pub change_type: ValidatorChangeType,
    pub previous_count: u32,
    pub new_count: u32,
}

impl ValidatorChangeEvent {
    /// Signed change in validator count.
    pub fn delta(&self) -> i64 {
        i64::from(self.new_count) - i64::from(self.previous_count)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
