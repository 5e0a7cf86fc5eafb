//! Uniswap V2 style constant-product math with exact calculations
//!
//! Preserves full precision using Decimal type for accurate quotes and
//! slippage floors.

use anyhow::{anyhow, bail, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Basis point denominator (10_000 = 100%)
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Pool reserves and fee structure for V2 AMMs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V2PoolState {
    pub reserve_in: Decimal,
    pub reserve_out: Decimal,
    pub fee_bps: u32, // Fee in basis points (30 = 0.3%)
}

/// V2 AMM math functions with zero precision loss
pub struct V2Math;

impl V2Math {
    /// Calculate exact output amount using the x*y=k formula
    ///
    /// # Arguments
    /// * `amount_in` - Input token amount (in token base units)
    /// * `reserve_in` - Input token reserve
    /// * `reserve_out` - Output token reserve
    /// * `fee_bps` - Fee in basis points (30 = 0.3%)
    pub fn calculate_output_amount(
        amount_in: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
        fee_bps: u32,
    ) -> Result<Decimal> {
        if amount_in <= dec!(0) {
            bail!("Input amount must be positive");
        }
        if reserve_in <= dec!(0) || reserve_out <= dec!(0) {
            bail!("Reserves must be positive");
        }
        if fee_bps >= BPS_DENOMINATOR {
            bail!("Fee must be below 100%");
        }

        let fee_multiplier = Decimal::from(BPS_DENOMINATOR - fee_bps) / Decimal::from(BPS_DENOMINATOR);
        let amount_in_after_fee = amount_in * fee_multiplier;

        // output = reserve_out * amount_in_after_fee / (reserve_in + amount_in_after_fee)
        // Share is taken first so 18-decimal reserves stay inside Decimal's range
        let denominator = reserve_in
            .checked_add(amount_in_after_fee)
            .ok_or_else(|| anyhow!("Reserve overflow"))?;
        let share = amount_in_after_fee / denominator;

        reserve_out
            .checked_mul(share)
            .ok_or_else(|| anyhow!("Output overflow"))
    }

    /// Calculate required input amount for a desired output (reverse calculation)
    pub fn calculate_input_amount(
        amount_out: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
        fee_bps: u32,
    ) -> Result<Decimal> {
        if amount_out <= dec!(0) {
            bail!("Output amount must be positive");
        }
        if amount_out >= reserve_out {
            bail!("Insufficient liquidity: output exceeds reserves");
        }
        if fee_bps >= BPS_DENOMINATOR {
            bail!("Fee must be below 100%");
        }

        // input = reserve_in * amount_out / (reserve_out - amount_out) / (1 - fee)
        let ratio = amount_out / (reserve_out - amount_out);
        let fee_divisor = Decimal::from(BPS_DENOMINATOR) / Decimal::from(BPS_DENOMINATOR - fee_bps);
        let input = reserve_in
            .checked_mul(ratio)
            .and_then(|v| v.checked_mul(fee_divisor))
            .ok_or_else(|| anyhow!("Input overflow"))?;

        // Add 1 to round up (ensures sufficient input)
        Ok(input.floor() + dec!(1))
    }

    /// Price impact of a trade as a percentage
    pub fn calculate_price_impact(
        amount_in: Decimal,
        reserve_in: Decimal,
        reserve_out: Decimal,
    ) -> Result<Decimal> {
        if amount_in <= dec!(0) || reserve_in <= dec!(0) || reserve_out <= dec!(0) {
            bail!("Invalid inputs for price impact calculation");
        }

        let price_before = reserve_out / reserve_in;

        let new_reserve_in = reserve_in + amount_in;
        let new_reserve_out =
            reserve_out - Self::calculate_output_amount(amount_in, reserve_in, reserve_out, 0)?;
        let price_after = new_reserve_out / new_reserve_in;

        Ok((price_before - price_after).abs() / price_before * dec!(100))
    }

    /// Marginal price of the input token in output units, before fees and impact
    pub fn spot_price(reserve_in: Decimal, reserve_out: Decimal) -> Result<Decimal> {
        if reserve_in <= dec!(0) || reserve_out <= dec!(0) {
            bail!("Reserves must be positive");
        }
        reserve_out
            .checked_div(reserve_in)
            .ok_or_else(|| anyhow!("Spot price overflow"))
    }

    /// Lowest acceptable output for an expected output under a slippage tolerance
    pub fn minimum_output(expected_output: Decimal, max_slippage_bps: u32) -> Result<Decimal> {
        if max_slippage_bps > BPS_DENOMINATOR {
            bail!("Slippage tolerance must be <= 10000 bps");
        }
        if expected_output < dec!(0) {
            bail!("Expected output must be non-negative");
        }
        let buffer = Decimal::from(max_slippage_bps) / Decimal::from(BPS_DENOMINATOR);
        Ok(expected_output * (Decimal::ONE - buffer))
    }
}
