//! Errors raised at the ingestion boundary.

use thiserror::Error;

use chainlive_core::CoreError;

use crate::dispatcher::Topic;

/// Errors surfaced to whoever feeds the stores.
///
/// Bad field values never get here: they are coerced to zero during
/// decoding. Only a payload whose overall shape is wrong is an error.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("malformed '{topic}' payload: {reason}")]
    Decode { topic: Topic, reason: String },

    #[error("unknown subscription topic: {0}")]
    UnknownTopic(String),

    #[error("unknown log subscription: {0}")]
    UnknownSubscription(String),

    #[error("store writer has stopped")]
    StoreClosed,

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SyncError {
    /// Returns `true` if the error is about one message and the feed can continue.
    pub fn is_message_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::UnknownTopic(_))
    }
}
