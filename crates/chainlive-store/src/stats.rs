//! Derived consensus statistics and the network-health score.
//!
//! Everything here is a pure function of the consensus store's recent
//! blocks and recent errors. The store calls these after every change to
//! either collection; nothing else writes the derived fields.

use serde::Serialize;

use chainlive_core::{ConsensusBlockEvent, ConsensusErrorEvent, Severity};

/// Score before any penalty is applied.
pub const INITIAL_HEALTH_SCORE: f64 = 100.0;

pub const EXCELLENT_THRESHOLD: f64 = 90.0;
pub const GOOD_THRESHOLD: f64 = 75.0;
pub const DEGRADED_THRESHOLD: f64 = 50.0;

/// Penalty weight of each recent error, by severity.
pub fn severity_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 20.0,
        Severity::High => 10.0,
        Severity::Medium => 5.0,
        Severity::Low => 2.0,
    }
}

// ─── Stats ────────────────────────────────────────────────────────────────────

/// Error counters per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorsBySeverity {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl ErrorsBySeverity {
    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    pub fn increment(&mut self, severity: Severity) {
        let slot = match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
        };
        *slot += 1;
    }
}

/// Aggregate consensus statistics.
///
/// Block figures cover the recent-blocks window; error counters are
/// cumulative since the store was last cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusStats {
    pub total_blocks: usize,
    pub round_changes: usize,
    pub average_participation: f64,
    pub error_count: u64,
    pub errors_by_severity: ErrorsBySeverity,
}

/// Block-window figures: total, round changes, mean participation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlockWindowSummary {
    pub total_blocks: usize,
    pub round_changes: usize,
    pub average_participation: f64,
}

pub fn summarize_blocks<'a>(
    blocks: impl IntoIterator<Item = &'a ConsensusBlockEvent>,
) -> BlockWindowSummary {
    let mut total = 0usize;
    let mut round_changes = 0usize;
    let mut participation_sum = 0.0;
    for block in blocks {
        total += 1;
        if block.round_changed {
            round_changes += 1;
        }
        participation_sum += block.participation_rate;
    }
    BlockWindowSummary {
        total_blocks: total,
        round_changes,
        average_participation: if total == 0 {
            0.0
        } else {
            participation_sum / total as f64
        },
    }
}

/// Replace the block figures of `stats`, keeping its error counters.
pub fn with_block_summary(stats: &ConsensusStats, summary: BlockWindowSummary) -> ConsensusStats {
    ConsensusStats {
        total_blocks: summary.total_blocks,
        round_changes: summary.round_changes,
        average_participation: summary.average_participation,
        ..stats.clone()
    }
}

// ─── Health ───────────────────────────────────────────────────────────────────

/// Qualitative health tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Critical,
    Degraded,
    Good,
    Excellent,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= EXCELLENT_THRESHOLD {
            Self::Excellent
        } else if score >= GOOD_THRESHOLD {
            Self::Good
        } else if score >= DEGRADED_THRESHOLD {
            Self::Degraded
        } else {
            Self::Critical
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Degraded => write!(f, "degraded"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Network health derived from recent blocks and recent errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkHealth {
    /// 0–100.
    pub score: f64,
    pub status: HealthStatus,
    pub is_healthy: bool,
    pub participation_rate: f64,
    pub round_change_rate: f64,
}

impl Default for NetworkHealth {
    fn default() -> Self {
        Self {
            score: INITIAL_HEALTH_SCORE,
            status: HealthStatus::from_score(INITIAL_HEALTH_SCORE),
            is_healthy: true,
            participation_rate: 0.0,
            round_change_rate: 0.0,
        }
    }
}

/// Score the network.
///
/// Starts at [`INITIAL_HEALTH_SCORE`] and subtracts:
/// - [`severity_penalty`] for every recent error,
/// - half the participation shortfall from 100%,
/// - 0.3 points per percent of blocks that changed round.
///
/// Block penalties apply only once at least one block has been seen. The
/// result is clamped to 0–100 and rounded to one decimal.
pub fn compute_health<'a>(
    summary: &BlockWindowSummary,
    errors: impl IntoIterator<Item = &'a ConsensusErrorEvent>,
) -> NetworkHealth {
    let round_change_rate = if summary.total_blocks == 0 {
        0.0
    } else {
        summary.round_changes as f64 / summary.total_blocks as f64 * 100.0
    };

    let mut score = INITIAL_HEALTH_SCORE;
    score -= errors
        .into_iter()
        .map(|e| severity_penalty(e.severity))
        .sum::<f64>();
    if summary.total_blocks > 0 {
        score -= (100.0 - summary.average_participation).max(0.0) / 2.0;
        score -= round_change_rate * 0.3;
    }
    let score = (score.clamp(0.0, 100.0) * 10.0).round() / 10.0;

    NetworkHealth {
        score,
        status: HealthStatus::from_score(score),
        is_healthy: score >= GOOD_THRESHOLD,
        participation_rate: summary.average_participation,
        round_change_rate,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chainlive_core::ConsensusErrorType;

    fn cblock(number: u64, participation: f64, round_changed: bool) -> ConsensusBlockEvent {
        ConsensusBlockEvent {
            block_number: number,
            block_hash: format!("0x{number:x}"),
            timestamp: number,
            round: u32::from(round_changed),
            prev_round: 0,
            round_changed,
            proposer: "0xp".into(),
            validator_count: 10,
            prepare_count: 10,
            commit_count: 10,
            participation_rate: participation,
            missed_validator_rate: 100.0 - participation,
            is_epoch_boundary: false,
        }
    }

    fn cerror(severity: Severity) -> ConsensusErrorEvent {
        ConsensusErrorEvent {
            block_number: 1,
            block_hash: "0x1".into(),
            timestamp: 0,
            error_type: ConsensusErrorType::RoundChange,
            severity,
            message: String::new(),
            round: 1,
            expected_signers: 7,
            actual_signers: 5,
            participation_rate: 70.0,
            consensus_impacted: false,
        }
    }

    #[test]
    fn summary_of_two_blocks() {
        let blocks = [cblock(1, 90.0, false), cblock(2, 80.0, true)];
        let s = summarize_blocks(&blocks);
        assert_eq!(s.total_blocks, 2);
        assert_eq!(s.round_changes, 1);
        assert_eq!(s.average_participation, 85.0);
    }

    #[test]
    fn empty_summary_is_zero() {
        let s = summarize_blocks(std::iter::empty());
        assert_eq!(s, BlockWindowSummary::default());
    }

    #[test]
    fn perfect_network_scores_full_marks() {
        let blocks = [cblock(1, 100.0, false), cblock(2, 100.0, false)];
        let h = compute_health(&summarize_blocks(&blocks), std::iter::empty());
        assert_eq!(h.score, 100.0);
        assert_eq!(h.status, HealthStatus::Excellent);
        assert!(h.is_healthy);
    }

    #[test]
    fn penalties_accumulate() {
        let blocks = [cblock(1, 100.0, false), cblock(2, 0.0, true)];
        let summary = summarize_blocks(&blocks);
        let h = compute_health(&summary, std::iter::empty());
        // 100 - 25 (participation) - 15 (round changes)
        assert!((h.score - 60.0).abs() < 1e-9);
        assert_eq!(h.status, HealthStatus::Degraded);
        assert!(!h.is_healthy);
        assert_eq!(h.participation_rate, 50.0);
        assert_eq!(h.round_change_rate, 50.0);

        let errors = [cerror(Severity::Critical)];
        let h2 = compute_health(&summary, &errors);
        assert!(h2.score < h.score);
        assert_eq!(h2.status, HealthStatus::Critical);
    }

    #[test]
    fn critical_hurts_more_than_low() {
        let summary = BlockWindowSummary::default();
        let critical = compute_health(&summary, &[cerror(Severity::Critical)]);
        let low = compute_health(&summary, &[cerror(Severity::Low)]);
        assert!(critical.score < low.score);
    }

    #[test]
    fn score_is_clamped_at_zero() {
        let errors: Vec<_> = (0..10).map(|_| cerror(Severity::Critical)).collect();
        let h = compute_health(&BlockWindowSummary::default(), &errors);
        assert_eq!(h.score, 0.0);
        assert_eq!(h.status, HealthStatus::Critical);
    }

    #[test]
    fn severity_buckets() {
        let mut by = ErrorsBySeverity::default();
        by.increment(Severity::High);
        by.increment(Severity::High);
        by.increment(Severity::Low);
        assert_eq!(by.get(Severity::High), 2);
        assert_eq!(by.get(Severity::Low), 1);
        assert_eq!(by.get(Severity::Critical), 0);
    }

    #[test]
    fn status_tiers() {
        assert_eq!(HealthStatus::from_score(95.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(75.0), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(50.0), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_score(49.9), HealthStatus::Critical);
    }
}
