//! # Leverfarm AMM Library - Swap Quoting Mathematics
//!
//! ## Purpose
//!
//! Exact constant-product arithmetic used by the swap venue to price the
//! unwind leg of the strategy: converting off-asset redemption proceeds and
//! reward tokens back into the base asset. All calculations use `Decimal` so
//! quotes and slippage floors carry no floating-point error.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Pool reserves held by the swap venue, trade sizes from the
//!   strategy's callback handler
//! - **Output Destinations**: Swap venue execution, slippage floors for `min_out`
//!
//! ## Architecture Role
//!
//! ```text
//! Reward / Off-Asset Proceeds → [V2Math quote] → [Slippage floor] → Swap Venue
//! ```

pub mod pool_traits;
pub mod v2_math;

pub use pool_traits::AmmPool;
pub use v2_math::{V2Math, V2PoolState, BPS_DENOMINATOR};

/// Common types for AMM calculations
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
