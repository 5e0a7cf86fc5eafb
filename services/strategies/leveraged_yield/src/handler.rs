//! Flash-loan callback handler
//!
//! Everything the strategy does with borrowed funds happens here, inside the
//! vault's callback. The handler owns the lending market, the swap venue and
//! the position ledger so the vault can call back into it while the
//! controller still holds the vault.

use crate::callback::{CallbackData, CallbackGuard};
use crate::config::StrategyConfig;
use crate::error::{Result, StrategyError};
use crate::{log_supply, log_swap, log_unwind};
use amm::V2Math;
use chain::{amount_to_decimal, decimal_to_amount_floor, Address, Amount, ChainError, ChainState};
use protocols::{FlashLoanReceiver, FlashLoanRequest, LendingMarket, ProtocolError, SwapVenue};
use state_position::{PositionChange, PositionLedger, Stateful};
use tracing::debug;

pub(crate) fn mul_div_floor(value: Amount, numerator: Amount, denominator: Amount) -> Result<Amount> {
    let scaled = value
        .checked_mul(numerator)
        .ok_or(ChainError::Overflow { context: "pro-rata share" })?;
    Ok(scaled / denominator)
}

pub(crate) fn mul_div_ceil(value: Amount, numerator: Amount, denominator: Amount) -> Result<Amount> {
    let scaled = value
        .checked_mul(numerator)
        .ok_or(ChainError::Overflow { context: "pro-rata share" })?;
    Ok(scaled.div_ceil(denominator))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmCore<M, S> {
    pub(crate) address: Address,
    pub(crate) config: StrategyConfig,
    pub(crate) market: M,
    pub(crate) venue: S,
    pub(crate) ledger: PositionLedger,
    pub(crate) guard: CallbackGuard,
}

impl<M: LendingMarket, S: SwapVenue> FarmCore<M, S> {
    pub(crate) fn new(
        address: Address,
        owner: Address,
        vault: Address,
        config: StrategyConfig,
        market: M,
        venue: S,
    ) -> Self {
        Self {
            address,
            config,
            market,
            venue,
            ledger: PositionLedger::new(owner),
            guard: CallbackGuard::new(vault),
        }
    }

    /// Supply principal plus the loan, then borrow the loan back from the
    /// market so the vault can be repaid.
    fn open_leveraged(&mut self, chain: &mut ChainState, request: &FlashLoanRequest, principal: Amount) -> Result<()> {
        let supplied = principal
            .checked_add(request.amount)
            .ok_or(ChainError::Overflow { context: "leveraged supply" })?;

        let receipt_minted = self.market.supply(chain, self.address, supplied)?;
        self.ledger.apply_event(PositionChange::Supplied {
            principal,
            receipt_minted,
        })?;

        self.market.borrow(chain, self.address, request.amount)?;
        self.ledger.apply_event(PositionChange::MarketBorrowed {
            amount: request.amount,
        })?;

        log_supply!(
            "Supplied {} ({} principal + {} flash), minted {} receipt",
            supplied,
            principal,
            request.amount,
            receipt_minted
        );
        Ok(())
    }

    /// Repay market debt with the loan, redeem the matching share of the
    /// position and convert whatever is needed into the base asset.
    fn unwind(&mut self, chain: &mut ChainState, request: &FlashLoanRequest, principal: Amount) -> Result<()> {
        let debt = self.market.borrow_balance_current(chain, self.address)?;
        let debt_repaid = request.amount.min(debt);
        if debt_repaid > 0 {
            self.market.repay_borrow(chain, self.address, debt_repaid)?;
            self.ledger.apply_event(PositionChange::MarketRepaid {
                amount: debt_repaid,
            })?;
        }

        self.redeem_share(chain, principal)?;
        self.cover_shortfall_with_rewards(chain, request.required_repayment)?;
        log_unwind!("Unwound {} principal, {} market debt repaid", principal, debt_repaid);
        Ok(())
    }

    /// Redeem the receipt tokens backing `principal` from the staged
    /// position and swap off-asset proceeds into the base asset. The market
    /// refuses the redemption if it would leave debt under-collateralised.
    pub(crate) fn redeem_share(&mut self, chain: &mut ChainState, principal: Amount) -> Result<()> {
        let position = self.ledger.staged()?.clone();
        if principal == 0 || principal > position.principal {
            return Err(StrategyError::WithdrawExceedsPrincipal {
                requested: principal,
                principal: position.principal,
            });
        }
        let receipt_burned = if principal == position.principal {
            position.receipt_balance
        } else {
            mul_div_floor(position.receipt_balance, principal, position.principal)?
        };
        if receipt_burned == 0 {
            return Err(StrategyError::InvalidAmount {
                reason: format!("withdrawal of {principal} redeems no receipt tokens"),
            });
        }

        let redemption = self.market.redeem(chain, self.address, receipt_burned)?;
        self.ledger.apply_event(PositionChange::Redeemed {
            principal,
            receipt_burned,
        })?;
        debug!(
            receipt_burned,
            redeemed = redemption.amount,
            reward = ?redemption.reward,
            "receipt share redeemed"
        );

        if redemption.asset != self.config.base_asset && redemption.amount > 0 {
            self.swap_into_base(chain, redemption.asset, redemption.amount)?;
        }
        Ok(())
    }

    /// Lowest output accepted for selling `amount_in` of `from`: its value at
    /// the pool's marginal price before the trade, less the tolerance. Fees
    /// and price impact both count against the tolerance.
    fn slippage_floor(&self, from: Address, amount_in: Amount) -> Result<Amount> {
        let spot = self.venue.spot_price(from, self.config.base_asset)?;
        let reference = amount_to_decimal(amount_in)?
            .checked_mul(spot)
            .ok_or(ChainError::Overflow { context: "slippage reference" })?;
        let floor = V2Math::minimum_output(reference, self.config.max_slippage_bps).map_err(ProtocolError::from)?;
        Ok(decimal_to_amount_floor(floor)?)
    }

    fn swap_into_base(&mut self, chain: &mut ChainState, from: Address, amount_in: Amount) -> Result<Amount> {
        let base = self.config.base_asset;
        let min_out = self.slippage_floor(from, amount_in)?;
        let received = self
            .venue
            .swap(chain, self.address, from, base, amount_in, min_out)?;
        log_swap!("Swapped {} of {:?} into {} base (floor {})", amount_in, from, received, min_out);
        Ok(received)
    }

    /// Sell just enough reward tokens to reach `required` base, if any are
    /// held and the venue can price them. Returns the reward amount sold.
    fn cover_shortfall_with_rewards(&mut self, chain: &mut ChainState, required: Amount) -> Result<Amount> {
        let base = self.config.base_asset;
        let available = chain.balance_of(base, self.address);
        if available >= required {
            return Ok(0);
        }
        let Some(reward) = self.market.reward_token() else {
            return Ok(0);
        };
        let held = chain.balance_of(reward, self.address);
        if held == 0 || !self.venue.supports(reward, base) {
            return Ok(0);
        }

        // One unit of margin absorbs rounding in the output quote
        let shortfall = required - available + 1;
        // A shortfall beyond the pool's depth cannot be quoted; sell everything
        let needed = self.venue.quote_input(reward, base, shortfall).unwrap_or(held);
        let amount_in = needed.min(held);
        self.swap_into_base(chain, reward, amount_in)?;
        Ok(amount_in)
    }

    fn repay(&mut self, chain: &mut ChainState, vault: Address, request: &FlashLoanRequest) -> Result<()> {
        let available = chain.balance_of(request.asset, self.address);
        if available < request.required_repayment {
            return Err(StrategyError::InsufficientRepayment {
                asset: request.asset,
                required: request.required_repayment,
                available,
            });
        }
        chain.transfer(request.asset, self.address, vault, request.required_repayment)?;
        self.ledger.apply_event(PositionChange::FlashRepaid {
            amount: request.amount,
        })?;
        Ok(())
    }
}

impl<M: LendingMarket, S: SwapVenue> FlashLoanReceiver for FarmCore<M, S> {
    type Error = StrategyError;

    fn address(&self) -> Address {
        self.address
    }

    fn receive_flash_loan(
        &mut self,
        chain: &mut ChainState,
        caller: Address,
        request: &FlashLoanRequest,
        data: &[u8],
    ) -> Result<()> {
        self.guard.enter(caller, request)?;
        let operation = CallbackData::decode(data)?;

        self.ledger.apply_event(PositionChange::FlashBorrowed {
            amount: request.amount,
        })?;
        match operation {
            CallbackData::Deposit { principal } => self.open_leveraged(chain, request, principal)?,
            CallbackData::Withdraw { principal } => self.unwind(chain, request, principal)?,
            CallbackData::RoundTrip => {
                debug!(asset = ?request.asset, amount = request.amount, "returning loan untouched");
            }
        }

        self.repay(chain, caller, request)?;
        self.guard.mark_repaid();
        Ok(())
    }
}
