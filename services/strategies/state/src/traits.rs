//! State Management Traits
//!
//! Core trait for stateful components that apply events and round-trip
//! through byte snapshots.

use thiserror::Error;

/// Error types for state management operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("A staged update is already open")]
    StageAlreadyOpen,

    #[error("No staged update is open")]
    NoStagedUpdate,

    #[error("Arithmetic underflow applying {change}: {current} - {amount}")]
    Underflow {
        change: &'static str,
        current: u128,
        amount: u128,
    },

    #[error("Arithmetic overflow applying {change}")]
    Overflow { change: &'static str },

    #[error("State validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Snapshot encoding failed: {0}")]
    Snapshot(String),
}

impl From<bincode::Error> for StateError {
    fn from(e: bincode::Error) -> Self {
        StateError::Snapshot(e.to_string())
    }
}

/// Core trait for stateful components that can apply events
pub trait Stateful {
    /// Event type this component can handle
    type Event;

    /// Error type for failed operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Apply an event to update the state
    fn apply_event(&mut self, event: Self::Event) -> Result<(), Self::Error>;

    /// Create a snapshot of the current state
    fn snapshot(&self) -> Vec<u8>;

    /// Restore state from a snapshot
    fn restore(&mut self, snapshot: &[u8]) -> Result<(), Self::Error>;
}
