//! Consensus store — per-block consensus telemetry, errors, forks and
//! validator-set changes, plus the statistics and health derived from them.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use chainlive_core::{
    BoundedFifo, Clock, ConsensusBlockEvent, ConsensusErrorEvent, ForkBranch, ForkEvent, Received,
    StoreConfig, SystemClock, ValidatorChangeEvent,
};

use crate::reducer::Reducer;
use crate::stats::{self, ConsensusStats, NetworkHealth};

fn block_number_key(block: &Received<ConsensusBlockEvent>) -> u64 {
    block.block_number
}

// ─── State ────────────────────────────────────────────────────────────────────

/// Connection flags of the consensus feed.
///
/// `last_connected_at` survives a disconnect so readers can show when the
/// feed was last alive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub is_connected: bool,
    pub last_connected_at: Option<i64>,
    pub connection_error: Option<String>,
}

/// Everything the consensus store holds. Read it through [`crate::selectors::consensus`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusState {
    pub(crate) connection: ConnectionState,
    pub(crate) latest_block: Option<Received<ConsensusBlockEvent>>,
    pub(crate) recent_blocks: BoundedFifo<Received<ConsensusBlockEvent>, u64>,
    pub(crate) recent_errors: BoundedFifo<Received<ConsensusErrorEvent>>,
    pub(crate) recent_forks: BoundedFifo<Received<ForkEvent>>,
    pub(crate) recent_validator_changes: BoundedFifo<Received<ValidatorChangeEvent>>,
    pub(crate) stats: ConsensusStats,
    pub(crate) network_health: NetworkHealth,
}

impl ConsensusState {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            connection: ConnectionState::default(),
            latest_block: None,
            recent_blocks: BoundedFifo::keyed(config.consensus_recent_blocks, block_number_key),
            recent_errors: BoundedFifo::new(config.consensus_recent_errors),
            recent_forks: BoundedFifo::new(config.consensus_recent_forks),
            recent_validator_changes: BoundedFifo::new(
                config.consensus_recent_validator_changes,
            ),
            stats: ConsensusStats::default(),
            network_health: NetworkHealth::default(),
        }
    }
}

// ─── Commands ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum ConsensusCommand {
    ConnectionStatus {
        connected: bool,
        error: Option<String>,
    },
    Block(ConsensusBlockEvent),
    Error(ConsensusErrorEvent),
    Fork(ForkEvent),
    ForkResolution {
        fork_block_number: u64,
        winning_chain: ForkBranch,
    },
    ValidatorChange(ValidatorChangeEvent),
    ClearAll,
}

// ─── Store ────────────────────────────────────────────────────────────────────

/// The process-wide consensus store.
pub struct ConsensusStore {
    state: ConsensusState,
    clock: Arc<dyn Clock>,
    monotonic_latest: bool,
}

impl ConsensusStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ConsensusState::new(config),
            clock,
            monotonic_latest: config.monotonic_latest,
        }
    }

    pub fn state(&self) -> &ConsensusState {
        &self.state
    }

    /// Connecting stamps `last_connected_at` and clears any error;
    /// disconnecting records `error` and leaves `last_connected_at` alone.
    pub fn set_connection_status(&mut self, connected: bool, error: Option<String>) -> bool {
        let before = self.state.connection.clone();
        let connection = &mut self.state.connection;
        if connected {
            if !connection.is_connected {
                connection.last_connected_at = Some(self.clock.now_ms());
            }
            connection.is_connected = true;
            connection.connection_error = None;
        } else {
            connection.is_connected = false;
            connection.connection_error = error;
        }

        let changed = *connection != before;
        if changed {
            match &connection.connection_error {
                Some(reason) => warn!(%reason, "consensus feed disconnected"),
                None => info!(connected, "consensus feed connection changed"),
            }
        }
        changed
    }

    /// Ingest consensus data for one block, then recompute stats and health.
    ///
    /// A block number already in the recent window is ignored.
    pub fn set_latest_block(&mut self, block: ConsensusBlockEvent) -> bool {
        if self.state.recent_blocks.contains_key(&block.block_number) {
            debug!(block_number = block.block_number, "duplicate consensus block ignored");
            return false;
        }
        if self.monotonic_latest {
            if let Some(latest) = &self.state.latest_block {
                if block.block_number < latest.block_number {
                    debug!(
                        block_number = block.block_number,
                        latest = latest.block_number,
                        "stale consensus block rejected"
                    );
                    return false;
                }
            }
        }

        let received = Received::new(block, self.clock.now_ms());
        self.state.recent_blocks.push(received.clone());
        self.state.latest_block = Some(received);
        self.recompute();
        true
    }

    /// Append a consensus error. Errors are never deduplicated.
    pub fn add_error(&mut self, error: ConsensusErrorEvent) -> bool {
        let severity = error.severity;
        debug!(
            block_number = error.block_number,
            %severity,
            error_type = ?error.error_type,
            "consensus error recorded"
        );
        let received = Received::new(error, self.clock.now_ms());
        self.state.recent_errors.push(received);
        self.state.stats.error_count += 1;
        self.state.stats.errors_by_severity.increment(severity);
        self.recompute();
        true
    }

    pub fn add_fork(&mut self, fork: ForkEvent) -> bool {
        info!(
            fork_block_number = fork.fork_block_number,
            resolved = fork.resolved,
            "fork recorded"
        );
        let received = Received::new(fork, self.clock.now_ms());
        self.state.recent_forks.push(received);
        true
    }

    /// Mark the fork at `fork_block_number` resolved in favour of `winning_chain`.
    ///
    /// Only that entry's `resolved` and `winning_chain` change. Returns
    /// `false` if no such fork is held.
    pub fn update_fork_resolution(
        &mut self,
        fork_block_number: u64,
        winning_chain: ForkBranch,
    ) -> bool {
        match self
            .state
            .recent_forks
            .find_mut(|f| f.fork_block_number == fork_block_number)
        {
            Some(fork) => {
                fork.event.resolved = true;
                fork.event.winning_chain = Some(winning_chain);
                info!(fork_block_number, ?winning_chain, "fork resolved");
                true
            }
            None => {
                debug!(fork_block_number, "resolution for unknown fork ignored");
                false
            }
        }
    }

    pub fn add_validator_change(&mut self, change: ValidatorChangeEvent) -> bool {
        debug!(
            block_number = change.block_number,
            epoch = change.epoch,
            delta = change.delta(),
            "validator set changed"
        );
        let received = Received::new(change, self.clock.now_ms());
        self.state.recent_validator_changes.push(received);
        true
    }

    /// Drop all data and derived state. Connection state is kept.
    pub fn clear_all(&mut self) {
        let state = &mut self.state;
        state.latest_block = None;
        state.recent_blocks.clear();
        state.recent_errors.clear();
        state.recent_forks.clear();
        state.recent_validator_changes.clear();
        state.stats = ConsensusStats::default();
        state.network_health = NetworkHealth::default();
        info!("consensus store cleared");
    }

    fn recompute(&mut self) {
        let state = &mut self.state;
        let summary = stats::summarize_blocks(state.recent_blocks.iter().map(|b| &b.event));
        state.stats = stats::with_block_summary(&state.stats, summary);
        state.network_health =
            stats::compute_health(&summary, state.recent_errors.iter().map(|e| &e.event));
    }
}

impl Reducer for ConsensusStore {
    type Command = ConsensusCommand;
    type State = ConsensusState;

    fn apply(&mut self, command: ConsensusCommand) -> bool {
        match command {
            ConsensusCommand::ConnectionStatus { connected, error } => {
                self.set_connection_status(connected, error)
            }
            ConsensusCommand::Block(block) => self.set_latest_block(block),
            ConsensusCommand::Error(error) => self.add_error(error),
            ConsensusCommand::Fork(fork) => self.add_fork(fork),
            ConsensusCommand::ForkResolution {
                fork_block_number,
                winning_chain,
            } => self.update_fork_resolution(fork_block_number, winning_chain),
            ConsensusCommand::ValidatorChange(change) => self.add_validator_change(change),
            ConsensusCommand::ClearAll => {
                self.clear_all();
                true
            }
        }
    }

    fn state(&self) -> &ConsensusState {
        &self.state
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::consensus as sel;
    use crate::stats::INITIAL_HEALTH_SCORE;
    use chainlive_core::{
        ChainDescriptor, ConsensusErrorType, ManualClock, Severity, ValidatorChangeType, U256,
    };

    fn store() -> (ConsensusStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (
            ConsensusStore::with_clock(&StoreConfig::default(), clock.clone()),
            clock,
        )
    }

    fn cblock(number: u64, participation: f64, round_changed: bool) -> ConsensusBlockEvent {
        ConsensusBlockEvent {
            block_number: number,
            block_hash: format!("0x{number:x}"),
            timestamp: number * 2,
            round: u32::from(round_changed),
            prev_round: 0,
            round_changed,
            proposer: "0xproposer".into(),
            validator_count: 4,
            prepare_count: 4,
            commit_count: 4,
            participation_rate: participation,
            missed_validator_rate: 100.0 - participation,
            is_epoch_boundary: number % 10 == 0,
        }
    }

    fn cerror(number: u64, severity: Severity) -> ConsensusErrorEvent {
        ConsensusErrorEvent {
            block_number: number,
            block_hash: format!("0x{number:x}"),
            timestamp: number * 2,
            error_type: ConsensusErrorType::MissedValidators,
            severity,
            message: "validators missed commit".into(),
            round: 0,
            expected_signers: 4,
            actual_signers: 2,
            participation_rate: 50.0,
            consensus_impacted: severity == Severity::Critical,
        }
    }

    fn fork(number: u64) -> ForkEvent {
        ForkEvent {
            fork_block_number: number,
            fork_block_hash: format!("0x{number:x}"),
            chain1: ChainDescriptor {
                hash: "0xaaa".into(),
                height: number + 2,
                weight: U256::from(10u64),
            },
            chain2: ChainDescriptor {
                hash: "0xbbb".into(),
                height: number + 1,
                weight: U256::from(9u64),
            },
            resolved: false,
            winning_chain: None,
            detected_at: 0,
            detection_lag: 2,
        }
    }

    fn validator_change(number: u64) -> ValidatorChangeEvent {
        ValidatorChangeEvent {
            block_number: number,
            block_hash: format!("0x{number:x}"),
            timestamp: 0,
            epoch: number / 10,
            is_epoch_boundary: true,
            change_type: ValidatorChangeType::Added,
            previous_count: 4,
            new_count: 5,
        }
    }

    #[test]
    fn stats_recomputed_on_block() {
        let (mut s, _) = store();
        s.set_latest_block(cblock(1, 90.0, false));
        s.set_latest_block(cblock(2, 80.0, true));
        let stats = sel::stats(s.state());
        assert_eq!(stats.total_blocks, 2);
        assert_eq!(stats.round_changes, 1);
        assert_eq!(stats.average_participation, 85.0);
        assert_eq!(sel::network_health(s.state()).participation_rate, 85.0);
    }

    #[test]
    fn duplicate_block_number_is_noop() {
        let (mut s, _) = store();
        assert!(s.set_latest_block(cblock(7, 100.0, false)));
        let mut again = cblock(7, 10.0, true);
        again.block_hash = "0xother".into();
        assert!(!s.set_latest_block(again));
        assert_eq!(sel::stats(s.state()).total_blocks, 1);
        assert_eq!(sel::latest_block(s.state()).unwrap().participation_rate, 100.0);
    }

    #[test]
    fn latest_block_is_stamped() {
        let (mut s, clock) = store();
        clock.set(9_999);
        s.set_latest_block(cblock(1, 100.0, false));
        assert_eq!(sel::latest_block(s.state()).unwrap().received_at, 9_999);
    }

    #[test]
    fn recent_blocks_bounded_by_max() {
        let (mut s, _) = store();
        for n in 0..150 {
            s.set_latest_block(cblock(n, 100.0, false));
        }
        assert_eq!(sel::recent_blocks(s.state()).count(), 100);
        assert_eq!(sel::stats(s.state()).total_blocks, 100);
        assert_eq!(sel::recent_blocks(s.state()).next().unwrap().block_number, 149);
    }

    #[test]
    fn critical_error_lowers_health() {
        let (mut s, _) = store();
        s.set_latest_block(cblock(1, 100.0, false));
        let before = sel::network_health(s.state()).score;
        s.add_error(cerror(1, Severity::Critical));
        let after = sel::network_health(s.state()).score;
        assert!(after < before);

        let stats = sel::stats(s.state());
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.errors_by_severity.critical, 1);
    }

    #[test]
    fn errors_are_not_deduplicated() {
        let (mut s, _) = store();
        s.add_error(cerror(3, Severity::Low));
        s.add_error(cerror(3, Severity::Low));
        assert_eq!(sel::recent_errors(s.state()).count(), 2);
        assert_eq!(sel::stats(s.state()).errors_by_severity.low, 2);
    }

    #[test]
    fn recent_errors_bounded_but_counters_cumulative() {
        let (mut s, _) = store();
        for n in 0..60 {
            s.add_error(cerror(n, Severity::Medium));
        }
        assert_eq!(sel::recent_errors(s.state()).count(), 50);
        assert_eq!(sel::stats(s.state()).error_count, 60);
    }

    #[test]
    fn fork_resolution_isolates_mutation() {
        let (mut s, _) = store();
        s.add_fork(fork(100));
        s.add_fork(fork(200));
        let untouched_before = sel::recent_forks(s.state())
            .find(|f| f.fork_block_number == 200)
            .cloned()
            .unwrap();

        assert!(s.update_fork_resolution(100, ForkBranch::Chain1));

        let resolved = sel::recent_forks(s.state())
            .find(|f| f.fork_block_number == 100)
            .unwrap();
        assert!(resolved.resolved);
        assert_eq!(resolved.winning_chain, Some(ForkBranch::Chain1));
        assert_eq!(resolved.chain1, fork(100).chain1);

        let untouched = sel::recent_forks(s.state())
            .find(|f| f.fork_block_number == 200)
            .unwrap();
        assert_eq!(*untouched, untouched_before);
        assert!(!untouched.resolved);

        let unresolved: Vec<u64> = sel::unresolved_forks(s.state())
            .iter()
            .map(|f| f.fork_block_number)
            .collect();
        assert_eq!(unresolved, vec![200]);
    }

    #[test]
    fn resolving_unknown_fork_is_noop() {
        let (mut s, _) = store();
        s.add_fork(fork(1));
        assert!(!s.update_fork_resolution(2, ForkBranch::Chain2));
        assert_eq!(sel::unresolved_forks(s.state()).len(), 1);
    }

    #[test]
    fn forks_are_bounded_newest_first() {
        let (mut s, _) = store();
        for n in 0..25 {
            s.add_fork(fork(n));
        }
        let numbers: Vec<u64> = sel::recent_forks(s.state())
            .map(|f| f.fork_block_number)
            .collect();
        assert_eq!(numbers, (5..25).rev().collect::<Vec<_>>());

        // fork 3 fell off the old end
        assert!(!s.update_fork_resolution(3, ForkBranch::Chain1));
        assert!(s.update_fork_resolution(24, ForkBranch::Chain1));
        assert_eq!(sel::unresolved_forks(s.state()).len(), 19);
    }

    #[test]
    fn forks_do_not_touch_health() {
        let (mut s, _) = store();
        s.add_fork(fork(1));
        assert_eq!(sel::network_health(s.state()).score, INITIAL_HEALTH_SCORE);
        assert_eq!(sel::stats(s.state()).error_count, 0);
    }

    #[test]
    fn validator_changes_are_bounded() {
        let (mut s, _) = store();
        for n in 0..60 {
            s.add_validator_change(validator_change(n));
        }
        assert_eq!(sel::recent_validator_changes(s.state()).count(), 50);
    }

    #[test]
    fn connection_asymmetry() {
        let (mut s, clock) = store();
        assert!(s.set_connection_status(true, None));
        assert_eq!(sel::connection(s.state()).last_connected_at, Some(1_000));

        clock.advance(500);
        assert!(s.set_connection_status(false, Some("socket closed".into())));
        let conn = sel::connection(s.state());
        assert!(!conn.is_connected);
        assert_eq!(conn.last_connected_at, Some(1_000));
        assert_eq!(conn.connection_error.as_deref(), Some("socket closed"));

        assert!(s.set_connection_status(true, None));
        let conn = sel::connection(s.state());
        assert_eq!(conn.last_connected_at, Some(1_500));
        assert!(conn.connection_error.is_none());
    }

    #[test]
    fn clear_all_preserves_connection() {
        let (mut s, _) = store();
        s.set_connection_status(true, None);
        s.set_latest_block(cblock(1, 50.0, true));
        s.add_error(cerror(1, Severity::High));
        s.add_fork(fork(1));
        s.add_validator_change(validator_change(1));

        s.clear_all();

        let st = s.state();
        assert!(sel::connection(st).is_connected);
        assert!(sel::latest_block(st).is_none());
        assert_eq!(sel::recent_blocks(st).count(), 0);
        assert_eq!(sel::recent_errors(st).count(), 0);
        assert_eq!(sel::recent_forks(st).count(), 0);
        assert_eq!(sel::recent_validator_changes(st).count(), 0);
        assert_eq!(*sel::stats(st), ConsensusStats::default());
        assert_eq!(*sel::network_health(st), NetworkHealth::default());
    }

    #[test]
    fn monotonic_latest_rejects_older_block() {
        let config = StoreConfig {
            monotonic_latest: true,
            ..StoreConfig::default()
        };
        let mut s = ConsensusStore::with_clock(&config, Arc::new(ManualClock::new(0)));
        s.set_latest_block(cblock(10, 100.0, false));
        assert!(!s.set_latest_block(cblock(9, 100.0, false)));
        assert_eq!(sel::latest_block(s.state()).unwrap().block_number, 10);
    }
}
