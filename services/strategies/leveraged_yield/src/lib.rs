//! # Leveraged Yield Strategy - Flash-Loan Boosted Lending Position
//!
//! ## Purpose
//!
//! Opens and unwinds a leveraged supply position in a lending market inside a
//! single flash-loan callback. On deposit the strategy borrows from the vault,
//! supplies principal plus loan to the market and borrows the loan back from
//! the market against that collateral to repay the vault. On withdraw it
//! borrows again to clear the market debt (or, once no debt is left, skips
//! the loan), redeems the matching receipt tokens, sells reward tokens if the redemption alone cannot repay the
//! vault, and forwards profit and rewards to the owner.
//!
//! ## Integration Points
//!
//! - **Flash-loan vault**: [`protocols::FlashLoanVault`], calls back into the
//!   handler with the borrowed funds
//! - **Lending market**: [`protocols::LendingMarket`], supply/borrow/repay/redeem
//! - **Swap venue**: [`protocols::SwapVenue`], off-asset proceeds and reward sales
//! - **Position ledger**: [`state_position::PositionLedger`], staged updates
//!   committed only after the vault accepts repayment
//!
//! ## Architecture Role
//!
//! ```text
//! Owner ──deposit/withdraw──▶ [Controller] ──flash_loan──▶ Vault
//!                                  │                         │
//!                             atomic unit          receive_flash_loan
//!                                  │                         ▼
//!                                  │                    [Handler] ──▶ Market / Venue
//!                                  ▼                         │
//!                     commit ledger, emit events ◀── repaid ─┘
//! ```
//!
//! Any failure anywhere in the unit restores the chain state, the vault, the
//! market and the venue, discards the staged position, and settles the
//! callback state machine back to `Idle`.

pub mod callback;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod guard;
pub mod handler;
pub mod logging;
pub mod simulation;

pub use callback::{CallbackData, CallbackGuard, CallbackState};
pub use config::{LeveragedYieldConfig, SimulationConfig, StrategyConfig};
pub use controller::{plan_leverage, LeveragePlan, LeveragedYieldFarm};
pub use error::{Result, StrategyError};
pub use events::{Deposited, FlashLoanUsed, StrategyEvent, TokenRecovered, Withdrawn};
pub use guard::OwnerConfig;
pub use simulation::{Balances, Deployment, SimulatedFarm};
