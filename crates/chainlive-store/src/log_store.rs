//! Log store — one bounded buffer of contract logs per live subscription.
//!
//! The store does not deduplicate. Callers that merge the live buffer with
//! paginated history own that step; [`unseen_logs`] does the set difference
//! on `(transaction_hash, log_index)`.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use chainlive_core::{BoundedFifo, LogFilter, LogKey, LogRecord, StoreConfig};

use crate::reducer::Reducer;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogState {
    logs: BoundedFifo<LogRecord>,
    filter: LogFilter,
    live: bool,
}

impl LogState {
    /// Buffered logs, newest first.
    pub fn logs(&self) -> impl Iterator<Item = &LogRecord> {
        self.logs.iter()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

#[derive(Debug, Clone)]
pub enum LogCommand {
    Ingest(LogRecord),
    Clear,
    SetFilter(LogFilter),
    SetLive(bool),
}

/// Live log buffer for a single subscription. Not shared between views.
pub struct LogStore {
    state: LogState,
}

impl LogStore {
    /// Buffer of `capacity` logs accepting every address and topic.
    pub fn new(capacity: usize) -> Self {
        Self::with_filter(capacity, LogFilter::default())
    }

    pub fn with_filter(capacity: usize, filter: LogFilter) -> Self {
        Self {
            state: LogState {
                logs: BoundedFifo::new(capacity),
                filter,
                live: true,
            },
        }
    }

    pub fn from_config(config: &StoreConfig, filter: LogFilter) -> Self {
        Self::with_filter(config.log_capacity, filter)
    }

    pub fn state(&self) -> &LogState {
        &self.state
    }

    /// Prepend `log` if live updates are on and it matches the filter.
    pub fn ingest(&mut self, log: LogRecord) -> bool {
        if !self.state.live {
            return false;
        }
        if !self.state.filter.matches(&log) {
            debug!(address = %log.address, "log outside subscription filter skipped");
            return false;
        }
        self.state.logs.push(log);
        true
    }

    pub fn clear_logs(&mut self) -> bool {
        let had_logs = !self.state.logs.is_empty();
        self.state.logs.clear();
        had_logs
    }

    /// Switch the watched target. The buffer is emptied.
    pub fn set_filter(&mut self, filter: LogFilter) -> bool {
        self.state.filter = filter;
        self.state.logs.clear();
        true
    }

    /// Pause or resume live updates. Resuming after a pause starts from an
    /// empty buffer.
    pub fn set_live(&mut self, live: bool) -> bool {
        if self.state.live == live {
            return false;
        }
        if live {
            self.state.logs.clear();
        }
        self.state.live = live;
        true
    }
}

impl Reducer for LogStore {
    type Command = LogCommand;
    type State = LogState;

    fn apply(&mut self, command: LogCommand) -> bool {
        match command {
            LogCommand::Ingest(log) => self.ingest(log),
            LogCommand::Clear => self.clear_logs(),
            LogCommand::SetFilter(filter) => self.set_filter(filter),
            LogCommand::SetLive(live) => self.set_live(live),
        }
    }

    fn state(&self) -> &LogState {
        &self.state
    }
}

/// Live logs whose key does not appear in `historical`, in input order.
pub fn unseen_logs<'a>(
    live: impl IntoIterator<Item = &'a LogRecord>,
    historical: &[LogRecord],
) -> Vec<&'a LogRecord> {
    let seen: HashSet<LogKey> = historical.iter().map(LogRecord::key).collect();
    live.into_iter()
        .filter(|log| !seen.contains(&log.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainlive_core::U256;

    fn log(address: &str, tx: &str, index: u64) -> LogRecord {
        LogRecord {
            address: address.into(),
            topics: vec!["0xtopic".into()],
            data: "0x".into(),
            block_number: U256::from(1u64),
            transaction_hash: tx.into(),
            transaction_index: Some(U256::ZERO),
            log_index: U256::from(index),
            removed: false,
        }
    }

    #[test]
    fn ingest_is_bounded_and_not_deduplicated() {
        let mut s = LogStore::new(3);
        s.ingest(log("0xc", "0x1", 0));
        s.ingest(log("0xc", "0x1", 0));
        assert_eq!(s.state().len(), 2);

        for i in 1..=5 {
            s.ingest(log("0xc", "0x2", i));
        }
        assert_eq!(s.state().len(), 3);
        let indexes: Vec<U256> = s.state().logs().map(|l| l.log_index).collect();
        assert_eq!(
            indexes,
            vec![U256::from(5u64), U256::from(4u64), U256::from(3u64)]
        );
    }

    #[test]
    fn filter_skips_other_contracts() {
        let mut s = LogStore::with_filter(10, LogFilter::address("0xWatched"));
        assert!(s.ingest(log("0xwatched", "0x1", 0)));
        assert!(!s.ingest(log("0xother", "0x1", 1)));
        assert_eq!(s.state().len(), 1);
    }

    #[test]
    fn changing_filter_clears() {
        let mut s = LogStore::new(10);
        s.ingest(log("0xa", "0x1", 0));
        s.set_filter(LogFilter::address("0xb"));
        assert!(s.state().is_empty());
        assert_eq!(s.state().filter(), &LogFilter::address("0xb"));
    }

    #[test]
    fn live_toggle_pauses_then_restarts_empty() {
        let mut s = LogStore::new(10);
        s.ingest(log("0xa", "0x1", 0));
        assert!(s.set_live(false));
        assert!(!s.ingest(log("0xa", "0x1", 1)));
        assert_eq!(s.state().len(), 1);

        assert!(s.set_live(true));
        assert!(s.state().is_empty());
        assert!(s.ingest(log("0xa", "0x1", 2)));
    }

    #[test]
    fn clear_logs_empties_buffer() {
        let mut s = LogStore::new(10);
        assert!(!s.clear_logs());
        s.ingest(log("0xa", "0x1", 0));
        assert!(s.clear_logs());
        assert!(s.state().is_empty());
    }

    #[test]
    fn unseen_logs_is_set_difference_on_key() {
        let historical = vec![log("0xa", "0x1", 0), log("0xa", "0x1", 1)];
        let mut s = LogStore::new(10);
        s.ingest(log("0xa", "0x1", 1)); // already paginated
        s.ingest(log("0xa", "0x2", 0)); // new
        let fresh = unseen_logs(s.state().logs(), &historical);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].transaction_hash, "0x2");
    }
}
