//! The seam between a store and whatever serializes access to it.

/// A synchronous state machine driven by commands.
///
/// `apply` runs to completion before returning; readers only ever observe
/// the state between two commands.
pub trait Reducer: Send + 'static {
    type Command: std::fmt::Debug + Send + 'static;
    type State: Clone + Send + Sync + 'static;

    /// Apply one command. Returns `true` if the state changed.
    fn apply(&mut self, command: Self::Command) -> bool;

    /// Current state.
    fn state(&self) -> &Self::State;
}
