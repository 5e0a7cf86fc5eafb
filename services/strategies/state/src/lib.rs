//! # Position State Management - Leveraged Position Ledger
//!
//! ## Purpose
//!
//! Tracks the single leveraged position a strategy instance holds: the
//! depositor's principal, the flash loan outstanding inside a callback, the
//! receipt tokens minted by the lending market and the debt carried in that
//! market. Mutations are staged and only become visible on commit, so a unit
//! of work that fails leaves the committed position byte-identical.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Position changes emitted by the strategy's flash-loan
//!   callback handler while a loan is in flight
//! - **Output Destinations**: Strategy controller (sizing withdrawals), tests
//!   (snapshot comparison)
//!
//! ## Architecture Role
//!
//! ```text
//! begin() → apply_event(..)* → commit()   committed position replaced
//!                            ↘ discard()  committed position untouched
//! ```

pub mod position;
pub mod traits;

pub use position::{PositionChange, PositionLedger, StrategyPosition};

// Re-export core traits for convenience
pub use traits::{StateError, Stateful};
