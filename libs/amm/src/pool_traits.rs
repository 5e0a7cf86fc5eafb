//! Quoting interface the swap venue prices trades through

use crate::{Decimal, V2Math, V2PoolState};
use anyhow::Result;

/// A pool oriented in the direction of one trade (`in` → `out`)
pub trait AmmPool {
    /// Output received for `amount_in`, after the pool fee
    fn quote_out(&self, amount_in: Decimal) -> Result<Decimal>;

    /// Smallest input whose output covers `amount_out`
    fn quote_in(&self, amount_out: Decimal) -> Result<Decimal>;

    /// Percentage the marginal price moves if `amount_in` is traded
    fn price_impact(&self, amount_in: Decimal) -> Result<Decimal>;

    /// Marginal `out` per `in` at current reserves
    fn spot_price(&self) -> Result<Decimal>;
}

impl AmmPool for V2PoolState {
    fn quote_out(&self, amount_in: Decimal) -> Result<Decimal> {
        V2Math::calculate_output_amount(amount_in, self.reserve_in, self.reserve_out, self.fee_bps)
    }

    fn quote_in(&self, amount_out: Decimal) -> Result<Decimal> {
        V2Math::calculate_input_amount(amount_out, self.reserve_in, self.reserve_out, self.fee_bps)
    }

    fn price_impact(&self, amount_in: Decimal) -> Result<Decimal> {
        V2Math::calculate_price_impact(amount_in, self.reserve_in, self.reserve_out)
    }

    fn spot_price(&self) -> Result<Decimal> {
        V2Math::spot_price(self.reserve_in, self.reserve_out)
    }
}
