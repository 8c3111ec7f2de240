//! Replays the captured session in `fixtures/` and checks the final state.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use chainlive_cli::{replay, ReplayReport};
use chainlive_core::{LogFilter, StoreConfig};
use chainlive_store::{FeedStatus, HealthStatus};

fn fixture() -> BufReader<File> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("fixtures")
        .join("explorer_session.jsonl");
    BufReader::new(File::open(path).expect("fixture present"))
}

async fn run(filter: Option<LogFilter>) -> ReplayReport {
    replay(fixture(), &StoreConfig::default(), filter)
        .await
        .expect("replay succeeds")
}

#[tokio::test]
async fn counts_lines_and_skips_malformed() {
    let report = run(None).await;
    assert_eq!(report.lines, 23);
    assert_eq!(report.dispatched, 21);
    let skipped: Vec<usize> = report.skipped.iter().map(|s| s.line).collect();
    assert_eq!(skipped, vec![23, 24]);
}

#[tokio::test]
async fn chain_state_after_session() {
    let report = run(None).await;
    let chain = &report.chain;
    assert_eq!(chain.status, FeedStatus::Live);
    assert_eq!(chain.latest_height.as_deref(), Some("101"));
    assert_eq!(chain.latest_block_hash.as_deref(), Some("0xb101"));
    assert_eq!(chain.last_connected_at, Some(1_700_000_000_000));
    // the uppercase-hash replay of block 101 is a duplicate
    assert_eq!(chain.recent_blocks, 2);
    assert_eq!(chain.recent_transactions, 1);
    // 0xaaa1 was confirmed, 0xbbb2 expired, 0xccc3 is fresh
    assert_eq!(chain.pending_transactions, 1);
}

#[tokio::test]
async fn consensus_state_after_session() {
    let report = run(None).await;
    let c = &report.consensus;
    assert_eq!(c.status, FeedStatus::Live);
    assert_eq!(c.latest_block_number, Some(102));
    assert_eq!(c.stats.total_blocks, 3);
    assert_eq!(c.stats.round_changes, 1);
    assert!((c.stats.average_participation - 90.0).abs() < 1e-9);
    assert_eq!(c.stats.error_count, 2);
    assert_eq!(c.stats.errors_by_severity.high, 1);
    assert_eq!(c.stats.errors_by_severity.low, 1);
    assert_eq!(c.high_priority_errors, 1);
    assert_eq!(c.recent_forks, 2);
    assert_eq!(c.unresolved_forks, 1);
    assert_eq!(c.validator_changes, 1);

    // 100 - 10 - 2 - (100 - 90) / 2 - 33.3 * 0.3
    assert!((c.health.score - 73.0).abs() < 1e-9);
    assert_eq!(c.health.status, HealthStatus::Degraded);
    assert!(!c.health.is_healthy);
}

#[tokio::test]
async fn log_subscription_applies_filter() {
    assert_eq!(run(None).await.logs, None);
    assert_eq!(run(Some(LogFilter::default())).await.logs, Some(2));
    assert_eq!(run(Some(LogFilter::address("0xTOKEN"))).await.logs, Some(1));
}

#[tokio::test]
async fn report_serializes_for_json_output() {
    let report = run(None).await;
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["chain"]["status"]["status"], "live");
    assert_eq!(json["consensus"]["health"]["status"], "degraded");
    assert_eq!(json["skipped"].as_array().unwrap().len(), 2);
}
