//! Library side of the `chainlive` binary, so the replay path can be
//! driven from tests.

pub mod logging;
pub mod replay;

pub use logging::{init_tracing, LogConfig};
pub use replay::{replay, ChainSummary, ConsensusSummary, ReplayReport, SkippedLine};
