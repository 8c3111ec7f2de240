//! Read-side selectors: pure functions from store state to a derived value.
//!
//! Readers never reach into state fields directly; they call these.

use serde::Serialize;

/// What a reader should show for a feed.
///
/// Separates "still loading" from "connected but nothing yet" from "down".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FeedStatus {
    /// Never connected and no data yet.
    Loading,
    /// Connected, but no data has arrived.
    AwaitingData,
    /// Connected with data.
    Live,
    /// Disconnected after having been up (or with an error).
    Disconnected { error: Option<String> },
}

pub mod chain {
    //! Selectors over [`ChainState`].

    use chainlive_core::{BlockRecord, PendingTransaction, TransactionRecord, U256};

    use super::FeedStatus;
    use crate::chain_store::ChainState;

    pub fn latest_block(state: &ChainState) -> Option<&BlockRecord> {
        state.latest_block.as_ref()
    }

    /// Newest first.
    pub fn recent_blocks(state: &ChainState) -> impl Iterator<Item = &BlockRecord> {
        state.recent_blocks.iter()
    }

    /// Height of the latest block.
    pub fn latest_height(state: &ChainState) -> Option<U256> {
        state.latest_block.as_ref().map(|b| b.number)
    }

    pub fn is_connected(state: &ChainState) -> bool {
        state.is_connected
    }

    pub fn last_connected_at(state: &ChainState) -> Option<i64> {
        state.last_connected_at
    }

    pub fn latest_transaction(state: &ChainState) -> Option<&TransactionRecord> {
        state.latest_transaction.as_ref()
    }

    /// Newest first.
    pub fn recent_transactions(state: &ChainState) -> impl Iterator<Item = &TransactionRecord> {
        state.recent_transactions.iter()
    }

    /// Newest first.
    pub fn pending_transactions(state: &ChainState) -> impl Iterator<Item = &PendingTransaction> {
        state.pending_transactions.iter()
    }

    pub fn pending_count(state: &ChainState) -> usize {
        state.pending_transactions.len()
    }

    pub fn feed_status(state: &ChainState) -> FeedStatus {
        match (state.is_connected, state.latest_block.is_some()) {
            (true, true) => FeedStatus::Live,
            (true, false) => FeedStatus::AwaitingData,
            (false, false) => FeedStatus::Loading,
            (false, true) => FeedStatus::Disconnected { error: None },
        }
    }
}

pub mod consensus {
    //! Selectors over [`ConsensusState`].

    use chainlive_core::{
        ConsensusBlockEvent, ConsensusErrorEvent, ForkEvent, Received, ValidatorChangeEvent,
    };

    use super::FeedStatus;
    use crate::consensus_store::{ConnectionState, ConsensusState};
    use crate::stats::{ConsensusStats, NetworkHealth};

    pub fn connection(state: &ConsensusState) -> &ConnectionState {
        &state.connection
    }

    pub fn latest_block(state: &ConsensusState) -> Option<&Received<ConsensusBlockEvent>> {
        state.latest_block.as_ref()
    }

    pub fn recent_blocks(
        state: &ConsensusState,
    ) -> impl Iterator<Item = &Received<ConsensusBlockEvent>> {
        state.recent_blocks.iter()
    }

    pub fn recent_errors(
        state: &ConsensusState,
    ) -> impl Iterator<Item = &Received<ConsensusErrorEvent>> {
        state.recent_errors.iter()
    }

    pub fn recent_forks(state: &ConsensusState) -> impl Iterator<Item = &Received<ForkEvent>> {
        state.recent_forks.iter()
    }

    pub fn recent_validator_changes(
        state: &ConsensusState,
    ) -> impl Iterator<Item = &Received<ValidatorChangeEvent>> {
        state.recent_validator_changes.iter()
    }

    pub fn stats(state: &ConsensusState) -> &ConsensusStats {
        &state.stats
    }

    pub fn network_health(state: &ConsensusState) -> &NetworkHealth {
        &state.network_health
    }

    /// Errors with critical or high severity, newest first.
    pub fn high_priority_errors(state: &ConsensusState) -> Vec<&Received<ConsensusErrorEvent>> {
        state
            .recent_errors
            .iter()
            .filter(|e| e.severity.is_high_priority())
            .collect()
    }

    pub fn unresolved_forks(state: &ConsensusState) -> Vec<&Received<ForkEvent>> {
        state.recent_forks.iter().filter(|f| !f.resolved).collect()
    }

    pub fn epoch_boundary_blocks(state: &ConsensusState) -> Vec<&Received<ConsensusBlockEvent>> {
        state
            .recent_blocks
            .iter()
            .filter(|b| b.is_epoch_boundary)
            .collect()
    }

    pub fn round_changed_blocks(state: &ConsensusState) -> Vec<&Received<ConsensusBlockEvent>> {
        state
            .recent_blocks
            .iter()
            .filter(|b| b.round_changed)
            .collect()
    }

    pub fn feed_status(state: &ConsensusState) -> FeedStatus {
        let conn = &state.connection;
        if conn.is_connected {
            if state.latest_block.is_some() {
                FeedStatus::Live
            } else {
                FeedStatus::AwaitingData
            }
        } else if conn.connection_error.is_some() || conn.last_connected_at.is_some() {
            FeedStatus::Disconnected {
                error: conn.connection_error.clone(),
            }
        } else {
            FeedStatus::Loading
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chainlive_core::{
        BlockRecord, ConsensusBlockEvent, ConsensusErrorEvent, ConsensusErrorType, ManualClock,
        Severity, StoreConfig,
    };

    use super::*;
    use crate::{ChainStore, ConsensusStore};

    fn cblock(number: u64, epoch: bool, round_changed: bool) -> ConsensusBlockEvent {
        ConsensusBlockEvent {
            block_number: number,
            block_hash: format!("0x{number:x}"),
            timestamp: 0,
            round: 0,
            prev_round: 0,
            round_changed,
            proposer: "0xp".into(),
            validator_count: 4,
            prepare_count: 4,
            commit_count: 4,
            participation_rate: 100.0,
            missed_validator_rate: 0.0,
            is_epoch_boundary: epoch,
        }
    }

    fn cerror(severity: Severity) -> ConsensusErrorEvent {
        ConsensusErrorEvent {
            block_number: 1,
            block_hash: String::new(),
            timestamp: 0,
            error_type: ConsensusErrorType::LowParticipation,
            severity,
            message: String::new(),
            round: 0,
            expected_signers: 0,
            actual_signers: 0,
            participation_rate: 0.0,
            consensus_impacted: false,
        }
    }

    fn consensus_store() -> ConsensusStore {
        ConsensusStore::with_clock(&StoreConfig::default(), Arc::new(ManualClock::new(0)))
    }

    #[test]
    fn filters_select_matching_entries() {
        let mut s = consensus_store();
        s.set_latest_block(cblock(1, true, false));
        s.set_latest_block(cblock(2, false, true));
        s.set_latest_block(cblock(3, false, false));
        for sev in Severity::ALL {
            s.add_error(cerror(sev));
        }

        let st = s.state();
        let epoch: Vec<u64> = consensus::epoch_boundary_blocks(st)
            .iter()
            .map(|b| b.block_number)
            .collect();
        assert_eq!(epoch, vec![1]);

        let rc: Vec<u64> = consensus::round_changed_blocks(st)
            .iter()
            .map(|b| b.block_number)
            .collect();
        assert_eq!(rc, vec![2]);

        let hp: Vec<Severity> = consensus::high_priority_errors(st)
            .iter()
            .map(|e| e.severity)
            .collect();
        assert_eq!(hp, vec![Severity::High, Severity::Critical]);
    }

    #[test]
    fn chain_feed_status_transitions() {
        let mut s = ChainStore::with_clock(&StoreConfig::default(), Arc::new(ManualClock::new(0)));
        assert_eq!(chain::feed_status(s.state()), FeedStatus::Loading);
        s.set_connected(true);
        assert_eq!(chain::feed_status(s.state()), FeedStatus::AwaitingData);
        s.set_latest_block(BlockRecord::new(1, "0x1"));
        assert_eq!(chain::feed_status(s.state()), FeedStatus::Live);
        s.set_connected(false);
        assert_eq!(
            chain::feed_status(s.state()),
            FeedStatus::Disconnected { error: None }
        );
    }

    #[test]
    fn consensus_feed_status_surfaces_error() {
        let mut s = consensus_store();
        assert_eq!(consensus::feed_status(s.state()), FeedStatus::Loading);
        s.set_connection_status(false, Some("handshake failed".into()));
        assert_eq!(
            consensus::feed_status(s.state()),
            FeedStatus::Disconnected {
                error: Some("handshake failed".into())
            }
        );
        s.set_connection_status(true, None);
        assert_eq!(consensus::feed_status(s.state()), FeedStatus::AwaitingData);
    }
}
