//! # Leverfarm Chain - In-Process Execution Substrate
//!
//! ## Purpose
//!
//! Minimal host ledger the strategy executes against. Tracks token custody per
//! holder, native currency balances, a block clock and an ordered event log,
//! and provides the checkpoint/rollback primitive that gives every public
//! strategy call its all-or-nothing semantics.
//!
//! ## Integration Points
//!
//! - **Protocols**: flash-loan vault, lending market and swap venue move tokens
//!   through [`TokenLedger`] and read the [`BlockClock`] for interest accrual
//! - **Strategy**: wraps each public entry point in [`Checkpoint`]s so a failed
//!   unit leaves no trace in custody, events or collaborator state
//!
//! ## Architecture Role
//!
//! ```text
//! Strategy Entry → [Checkpoint::take] → Vault / Market / Venue → Ok → commit
//!                                               ↓
//!                                              Err → [Checkpoint::restore]
//! ```

pub mod checkpoint;
pub mod clock;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod native;
pub mod state;
pub mod types;

pub use checkpoint::{atomically, Checkpoint};
pub use clock::BlockClock;
pub use errors::ChainError;
pub use events::{EventLog, LogRecord};
pub use ledger::TokenLedger;
pub use native::{NativeBalances, NativeReceiver};
pub use state::ChainState;
pub use types::{amount_to_decimal, decimal_to_amount_ceil, decimal_to_amount_floor, Address, Amount};
