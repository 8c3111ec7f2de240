//! Replay a captured JSON-lines subscription feed through the realtime stores.
//!
//! Each line is `{"topic": "...", "payload": {...}}` with an optional
//! `"at"` (ms since epoch). When present, `at` moves the store clock before
//! the message is applied, so connection stamps and pending-transaction
//! expiry are reproducible. Blank lines and `#` comments are ignored.

use std::fmt;
use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use chainlive_core::{LogFilter, ManualClock, StoreConfig};
use chainlive_store::selectors::{chain, consensus};
use chainlive_store::{ChainCommand, ConsensusStats, FeedStatus, NetworkHealth};
use chainlive_sync::{Realtime, SubscriptionMessage};

#[derive(Debug, Deserialize)]
struct ReplayLine {
    #[serde(default)]
    at: Option<i64>,
    #[serde(flatten)]
    message: SubscriptionMessage,
}

/// A line that could not be applied.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSummary {
    pub status: FeedStatus,
    /// Decimal block number.
    pub latest_height: Option<String>,
    pub latest_block_hash: Option<String>,
    pub last_connected_at: Option<i64>,
    pub recent_blocks: usize,
    pub recent_transactions: usize,
    pub pending_transactions: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusSummary {
    pub status: FeedStatus,
    pub latest_block_number: Option<u64>,
    pub stats: ConsensusStats,
    pub health: NetworkHealth,
    pub recent_errors: usize,
    pub high_priority_errors: usize,
    pub recent_forks: usize,
    pub unresolved_forks: usize,
    pub validator_changes: usize,
}

/// Result of a replay: counters plus a summary of the final store states.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub lines: usize,
    pub dispatched: usize,
    pub skipped: Vec<SkippedLine>,
    pub chain: ChainSummary,
    pub consensus: ConsensusSummary,
    /// Logs held by the replay's log subscription, if one was opened.
    pub logs: Option<usize>,
}

/// Feed every line of `reader` through a fresh set of stores.
///
/// Malformed lines are recorded in [`ReplayReport::skipped`] and replay
/// continues. I/O failures and a stopped store abort the replay.
pub async fn replay<R: BufRead>(
    reader: R,
    config: &StoreConfig,
    log_filter: Option<LogFilter>,
) -> Result<ReplayReport> {
    let clock = Arc::new(ManualClock::new(0));
    let realtime = Realtime::spawn_with_clock(config, clock.clone())
        .context("invalid store configuration")?;
    let dispatcher = realtime.dispatcher();
    let log_handle = log_filter.map(|f| dispatcher.open_log_subscription("replay", f));

    let mut lines = 0;
    let mut dispatched = 0;
    let mut skipped = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines += 1;

        let parsed: ReplayLine = match serde_json::from_str(trimmed) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping unparseable line");
                skipped.push(SkippedLine {
                    line: line_no,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if let Some(at) = parsed.at {
            // commands already queued must see the old time
            dispatcher.flush().await?;
            clock.set(at);
        }

        match dispatcher.dispatch_message(parsed.message) {
            Ok(()) => dispatched += 1,
            Err(e) if e.is_message_error() => {
                skipped.push(SkippedLine {
                    line: line_no,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e).with_context(|| format!("line {line_no}")),
        }
    }

    dispatcher.chain().send(ChainCommand::CleanExpiredPending {
        ttl_ms: config.pending_ttl_ms,
    })?;
    dispatcher.flush().await?;

    let chain_state = dispatcher.chain().snapshot();
    let consensus_state = dispatcher.consensus().snapshot();
    tracing::info!(lines, dispatched, skipped = skipped.len(), "replay finished");

    Ok(ReplayReport {
        lines,
        dispatched,
        skipped,
        chain: ChainSummary {
            status: chain::feed_status(&chain_state),
            latest_height: chain::latest_height(&chain_state).map(|h| h.to_string()),
            latest_block_hash: chain::latest_block(&chain_state).map(|b| b.hash.clone()),
            last_connected_at: chain::last_connected_at(&chain_state),
            recent_blocks: chain::recent_blocks(&chain_state).count(),
            recent_transactions: chain::recent_transactions(&chain_state).count(),
            pending_transactions: chain::pending_count(&chain_state),
        },
        consensus: ConsensusSummary {
            status: consensus::feed_status(&consensus_state),
            latest_block_number: consensus::latest_block(&consensus_state).map(|b| b.block_number),
            stats: consensus::stats(&consensus_state).clone(),
            health: consensus::network_health(&consensus_state).clone(),
            recent_errors: consensus::recent_errors(&consensus_state).count(),
            high_priority_errors: consensus::high_priority_errors(&consensus_state).len(),
            recent_forks: consensus::recent_forks(&consensus_state).count(),
            unresolved_forks: consensus::unresolved_forks(&consensus_state).len(),
            validator_changes: consensus::recent_validator_changes(&consensus_state).count(),
        },
        logs: log_handle.map(|h| h.snapshot().len()),
    })
}

fn status_label(status: &FeedStatus) -> String {
    match status {
        FeedStatus::Loading => "loading".into(),
        FeedStatus::AwaitingData => "awaiting data".into(),
        FeedStatus::Live => "live".into(),
        FeedStatus::Disconnected { error: Some(e) } => format!("disconnected ({e})"),
        FeedStatus::Disconnected { error: None } => "disconnected".into(),
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "replayed {} lines: {} dispatched, {} skipped",
            self.lines,
            self.dispatched,
            self.skipped.len()
        )?;

        let c = &self.chain;
        writeln!(f, "\nchain:     {}", status_label(&c.status))?;
        writeln!(
            f,
            "  height {}  blocks {}  txs {}  pending {}",
            c.latest_height.as_deref().unwrap_or("-"),
            c.recent_blocks,
            c.recent_transactions,
            c.pending_transactions
        )?;

        let k = &self.consensus;
        writeln!(f, "\nconsensus: {}", status_label(&k.status))?;
        writeln!(
            f,
            "  blocks {}  round changes {}  avg participation {:.1}%",
            k.stats.total_blocks, k.stats.round_changes, k.stats.average_participation
        )?;
        writeln!(
            f,
            "  errors {} ({} high priority)  forks {} ({} unresolved)  validator changes {}",
            k.recent_errors,
            k.high_priority_errors,
            k.recent_forks,
            k.unresolved_forks,
            k.validator_changes
        )?;
        writeln!(f, "  health {:.1} ({})", k.health.score, k.health.status)?;

        if let Some(n) = self.logs {
            writeln!(f, "\nlogs:      {n}")?;
        }

        if !self.skipped.is_empty() {
            writeln!(f, "\nskipped:")?;
            for s in &self.skipped {
                writeln!(f, "  line {}: {}", s.line, s.reason)?;
            }
        }
        Ok(())
    }
}
