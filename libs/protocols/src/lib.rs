//! # Leverfarm Protocols - External Collaborator Seams
//!
//! ## Purpose
//!
//! Trait boundaries for the three services a leveraged yield strategy talks
//! to, and deterministic in-memory implementations of each:
//!
//! - **Flash-loan vault** ([`FlashLoanVault`]): lends a token for the duration
//!   of one callback and fails the whole unit unless its balance is restored
//!   plus fee
//! - **Lending market** ([`LendingMarket`]): accepts supply, mints receipt
//!   tokens, lends against them, accrues interest and rewards per block
//! - **Swap venue** ([`SwapVenue`]): exchanges one token for another at a
//!   constant-product quote with a caller-supplied output floor
//!
//! ## Architecture Role
//!
//! ```text
//! Strategy ──flash_loan──▶ Vault ──receive_flash_loan──▶ Strategy callback
//!                                                          │
//!                                   Lending Market ◀── supply / borrow / repay / redeem
//!                                   Swap Venue     ◀── swap off-asset proceeds
//! ```
//!
//! All implementations are `Clone` so the host can checkpoint and restore
//! them alongside the chain state.

pub mod errors;
pub mod market;
pub mod swap;
pub mod vault;

pub use errors::ProtocolError;
pub use market::{InMemoryLendingMarket, LendingMarket, MarketParams, Redemption};
pub use swap::{ConstantProductVenue, SwapVenue};
pub use vault::{FlashLoanReceiver, FlashLoanRequest, FlashLoanVault, InMemoryVault};
