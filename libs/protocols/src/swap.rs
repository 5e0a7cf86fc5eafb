//! Swap venue
//!
//! Constant-product pools keyed by token pair. Reserves are tracked per pool
//! while the tokens themselves sit in the venue's custody on the chain ledger.

use crate::errors::ProtocolError;
use amm::{AmmPool, V2PoolState};
use chain::{amount_to_decimal, decimal_to_amount_ceil, decimal_to_amount_floor, Address, Amount, ChainState};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub trait SwapVenue {
    fn address(&self) -> Address;

    fn supports(&self, from: Address, to: Address) -> bool;

    /// Output the venue would pay for `amount_in` right now
    fn quote(&self, from: Address, to: Address, amount_in: Amount) -> Result<Amount, ProtocolError>;

    /// Marginal price of `from` in units of `to`, ignoring fees and price impact
    fn spot_price(&self, from: Address, to: Address) -> Result<Decimal, ProtocolError>;

    /// Input of `from` needed to receive at least `amount_out` of `to`
    fn quote_input(&self, from: Address, to: Address, amount_out: Amount) -> Result<Amount, ProtocolError>;

    /// Exchange `amount_in` of `from` held by `trader` for `to`.
    /// Fails with `SlippageExceeded` when the output would be below `min_out`.
    fn swap(
        &mut self,
        chain: &mut ChainState,
        trader: Address,
        from: Address,
        to: Address,
        amount_in: Amount,
        min_out: Amount,
    ) -> Result<Amount, ProtocolError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PoolReserves {
    reserve0: Amount,
    reserve1: Amount,
    fee_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantProductVenue {
    address: Address,
    pools: BTreeMap<(Address, Address), PoolReserves>,
}

/// Canonical (token0, token1) ordering plus whether `from` is token0
fn pair_key(from: Address, to: Address) -> ((Address, Address), bool) {
    if from < to {
        ((from, to), true)
    } else {
        ((to, from), false)
    }
}

impl ConstantProductVenue {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            pools: BTreeMap::new(),
        }
    }

    /// Seed a pool with liquidity taken from `provider`
    pub fn add_liquidity(
        &mut self,
        chain: &mut ChainState,
        provider: Address,
        token_a: (Address, Amount),
        token_b: (Address, Amount),
        fee_bps: u32,
    ) -> Result<(), ProtocolError> {
        if token_a.1 == 0 || token_b.1 == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        chain.transfer(token_a.0, provider, self.address, token_a.1)?;
        chain.transfer(token_b.0, provider, self.address, token_b.1)?;

        let (key, a_is_token0) = pair_key(token_a.0, token_b.0);
        let (added0, added1) = if a_is_token0 {
            (token_a.1, token_b.1)
        } else {
            (token_b.1, token_a.1)
        };
        let pool = self.pools.entry(key).or_insert(PoolReserves {
            reserve0: 0,
            reserve1: 0,
            fee_bps,
        });
        pool.reserve0 = pool.reserve0.saturating_add(added0);
        pool.reserve1 = pool.reserve1.saturating_add(added1);
        info!(token0 = ?key.0, token1 = ?key.1, added0, added1, "liquidity added");
        Ok(())
    }

    /// Reserves as (reserve of `from`, reserve of `to`)
    pub fn reserves(&self, from: Address, to: Address) -> Option<(Amount, Amount)> {
        let (key, from_is_token0) = pair_key(from, to);
        self.pools.get(&key).map(|p| {
            if from_is_token0 {
                (p.reserve0, p.reserve1)
            } else {
                (p.reserve1, p.reserve0)
            }
        })
    }

    fn pool_state(&self, from: Address, to: Address) -> Result<V2PoolState, ProtocolError> {
        let (key, _) = pair_key(from, to);
        let pool = self
            .pools
            .get(&key)
            .ok_or(ProtocolError::UnknownPool { from, to })?;
        let (reserve_in, reserve_out) = self
            .reserves(from, to)
            .ok_or(ProtocolError::UnknownPool { from, to })?;
        Ok(V2PoolState {
            reserve_in: amount_to_decimal(reserve_in)?,
            reserve_out: amount_to_decimal(reserve_out)?,
            fee_bps: pool.fee_bps,
        })
    }
}

impl SwapVenue for ConstantProductVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn supports(&self, from: Address, to: Address) -> bool {
        from != to && self.pools.contains_key(&pair_key(from, to).0)
    }

    fn quote(&self, from: Address, to: Address, amount_in: Amount) -> Result<Amount, ProtocolError> {
        if amount_in == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        let pool = self.pool_state(from, to)?;
        let out = pool.quote_out(amount_to_decimal(amount_in)?)?;
        Ok(decimal_to_amount_floor(out)?)
    }

    fn spot_price(&self, from: Address, to: Address) -> Result<Decimal, ProtocolError> {
        Ok(self.pool_state(from, to)?.spot_price()?)
    }

    fn quote_input(&self, from: Address, to: Address, amount_out: Amount) -> Result<Amount, ProtocolError> {
        if amount_out == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        let pool = self.pool_state(from, to)?;
        let needed = pool.quote_in(amount_to_decimal(amount_out)?)?;
        Ok(decimal_to_amount_ceil(needed)?)
    }

    fn swap(
        &mut self,
        chain: &mut ChainState,
        trader: Address,
        from: Address,
        to: Address,
        amount_in: Amount,
        min_out: Amount,
    ) -> Result<Amount, ProtocolError> {
        let quoted = self.quote(from, to, amount_in)?;
        if quoted == 0 || quoted < min_out {
            return Err(ProtocolError::SlippageExceeded { min_out, quoted });
        }
        let impact = self.pool_state(from, to)?.price_impact(amount_to_decimal(amount_in)?)?;

        chain.transfer(from, trader, self.address, amount_in)?;
        chain.transfer(to, self.address, trader, quoted)?;

        let (key, from_is_token0) = pair_key(from, to);
        let pool = self
            .pools
            .get_mut(&key)
            .ok_or(ProtocolError::UnknownPool { from, to })?;
        if from_is_token0 {
            pool.reserve0 = pool.reserve0.saturating_add(amount_in);
            pool.reserve1 = pool.reserve1.saturating_sub(quoted);
        } else {
            pool.reserve1 = pool.reserve1.saturating_add(amount_in);
            pool.reserve0 = pool.reserve0.saturating_sub(quoted);
        }
        debug!(?trader, ?from, ?to, amount_in, quoted, price_impact_pct = %impact, "swapped");
        Ok(quoted)
    }
}
