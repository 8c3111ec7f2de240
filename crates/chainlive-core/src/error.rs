//! Error types shared by the ChainLive crates.

use thiserror::Error;

/// Errors raised outside the reducers (configuration, call-shape mistakes).
///
/// Store ingestion itself never fails: bad values, duplicates and
/// disconnects all become state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid config field '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl CoreError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
