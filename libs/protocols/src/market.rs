//! Lending market
//!
//! Compound-style money market for a single underlying asset. Suppliers
//! receive receipt tokens at the current exchange rate; the exchange rate,
//! the borrow index and the reward index all grow per block.

use crate::errors::ProtocolError;
use chain::{
    amount_to_decimal, decimal_to_amount_ceil, decimal_to_amount_floor, Address, Amount,
    BlockClock, ChainError, ChainState,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Proceeds of a redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub asset: Address,
    pub amount: Amount,
    /// Reward token and amount paid out alongside the redemption
    pub reward: Option<(Address, Amount)>,
}

pub trait LendingMarket {
    fn address(&self) -> Address;

    /// Asset accepted for supply and lent to borrowers
    fn underlying(&self) -> Address;

    /// Token minted to suppliers
    fn receipt_token(&self) -> Address;

    fn reward_token(&self) -> Option<Address>;

    fn collateral_factor_bps(&self) -> u32;

    /// Bring interest and reward indexes up to `clock`
    fn accrue(&mut self, clock: &BlockClock) -> Result<(), ProtocolError>;

    /// Supply `amount` of the underlying, returning receipt tokens minted
    fn supply(
        &mut self,
        chain: &mut ChainState,
        supplier: Address,
        amount: Amount,
    ) -> Result<Amount, ProtocolError>;

    fn borrow(
        &mut self,
        chain: &mut ChainState,
        borrower: Address,
        amount: Amount,
    ) -> Result<(), ProtocolError>;

    fn repay_borrow(
        &mut self,
        chain: &mut ChainState,
        borrower: Address,
        amount: Amount,
    ) -> Result<(), ProtocolError>;

    /// Outstanding debt including interest accrued up to the current block
    fn borrow_balance_current(
        &mut self,
        chain: &ChainState,
        account: Address,
    ) -> Result<Amount, ProtocolError>;

    /// Underlying value of the account's receipt tokens at the stored rate
    fn underlying_balance(&self, chain: &ChainState, account: Address) -> Result<Amount, ProtocolError>;

    /// Burn `receipt_amount` receipt tokens for underlying and pay out accrued rewards
    fn redeem(
        &mut self,
        chain: &mut ChainState,
        redeemer: Address,
        receipt_amount: Amount,
    ) -> Result<Redemption, ProtocolError>;
}

/// Static market parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketParams {
    pub address: Address,
    pub underlying: Address,
    pub receipt_token: Address,
    pub reward_token: Option<Address>,
    /// Share of collateral value that may be borrowed (8000 = 80%)
    pub collateral_factor_bps: u32,
    /// Underlying units per receipt unit at launch
    pub initial_exchange_rate: Decimal,
    pub supply_rate_per_block: Decimal,
    pub borrow_rate_per_block: Decimal,
    /// Reward units accrued per receipt unit per block
    pub reward_speed_per_block: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AccountState {
    borrow_principal: Amount,
    borrow_index: Decimal,
    reward_index: Decimal,
    reward_accrued: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryLendingMarket {
    params: MarketParams,
    exchange_rate: Decimal,
    borrow_index: Decimal,
    reward_index: Decimal,
    accrual_block: u64,
    accounts: BTreeMap<Address, AccountState>,
}

/// `index × (1 + rate × blocks)`, `None` on overflow
fn grown(index: Decimal, rate: Decimal, blocks: Decimal) -> Option<Decimal> {
    rate.checked_mul(blocks)
        .and_then(|growth| Decimal::ONE.checked_add(growth))
        .and_then(|factor| index.checked_mul(factor))
}

impl InMemoryLendingMarket {
    pub fn new(params: MarketParams, clock: &BlockClock) -> Self {
        Self {
            exchange_rate: params.initial_exchange_rate,
            params,
            borrow_index: Decimal::ONE,
            reward_index: Decimal::ZERO,
            accrual_block: clock.number,
            accounts: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> &MarketParams {
        &self.params
    }

    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }

    /// Underlying cash held by the market
    pub fn cash(&self, chain: &ChainState) -> Amount {
        chain.balance_of(self.params.underlying, self.params.address)
    }

    fn receipt_balance(&self, chain: &ChainState, account: Address) -> Amount {
        chain.balance_of(self.params.receipt_token, account)
    }

    fn account_mut(&mut self, account: Address) -> &mut AccountState {
        let borrow_index = self.borrow_index;
        let reward_index = self.reward_index;
        self.accounts.entry(account).or_insert(AccountState {
            borrow_principal: 0,
            borrow_index,
            reward_index,
            reward_accrued: Decimal::ZERO,
        })
    }

    /// Credit rewards earned by the account's receipt balance since its last touch
    fn distribute_rewards(&mut self, chain: &ChainState, account: Address) -> Result<(), ProtocolError> {
        let held = amount_to_decimal(self.receipt_balance(chain, account))?;
        let global = self.reward_index;
        let state = self.account_mut(account);
        let earned = held
            .checked_mul(global - state.reward_index)
            .and_then(|earned| earned.checked_add(state.reward_accrued))
            .ok_or(ChainError::Overflow { context: "reward distribution" })?;
        state.reward_accrued = earned;
        state.reward_index = global;
        Ok(())
    }

    fn stored_borrow_balance(&self, account: Address) -> Result<Amount, ProtocolError> {
        let Some(state) = self.accounts.get(&account) else {
            return Ok(0);
        };
        if state.borrow_principal == 0 {
            return Ok(0);
        }
        let principal = amount_to_decimal(state.borrow_principal)?;
        Ok(decimal_to_amount_ceil(
            principal * self.borrow_index / state.borrow_index,
        )?)
    }

    fn set_borrow_balance(&mut self, account: Address, balance: Amount) {
        let index = self.borrow_index;
        let state = self.account_mut(account);
        state.borrow_principal = balance;
        state.borrow_index = index;
    }

    fn collateral_value(&self, receipt: Amount) -> Result<Decimal, ProtocolError> {
        Ok(amount_to_decimal(receipt)? * self.exchange_rate)
    }

    fn borrow_limit(&self, receipt: Amount) -> Result<Amount, ProtocolError> {
        let factor = Decimal::from(self.params.collateral_factor_bps) / dec!(10000);
        Ok(decimal_to_amount_floor(self.collateral_value(receipt)? * factor)?)
    }

    fn ensure_cash(&self, chain: &ChainState, requested: Amount) -> Result<(), ProtocolError> {
        let available = self.cash(chain);
        if requested > available {
            return Err(ProtocolError::InsufficientLiquidity {
                asset: self.params.underlying,
                requested,
                available,
            });
        }
        Ok(())
    }

    fn pay_rewards(
        &mut self,
        chain: &mut ChainState,
        holder: Address,
    ) -> Result<Option<(Address, Amount)>, ProtocolError> {
        let Some(reward_token) = self.params.reward_token else {
            return Ok(None);
        };
        self.distribute_rewards(chain, holder)?;

        let accrued = self.account_mut(holder).reward_accrued;
        let owed = decimal_to_amount_floor(accrued)?;
        let reserve = chain.balance_of(reward_token, self.params.address);
        let paid = owed.min(reserve);
        if paid == 0 {
            return Ok(None);
        }

        chain.transfer(reward_token, self.params.address, holder, paid)?;
        let state = self.account_mut(holder);
        state.reward_accrued -= amount_to_decimal(paid)?;
        debug!(?holder, paid, "rewards paid");
        Ok(Some((reward_token, paid)))
    }
}

impl LendingMarket for InMemoryLendingMarket {
    fn address(&self) -> Address {
        self.params.address
    }

    fn underlying(&self) -> Address {
        self.params.underlying
    }

    fn receipt_token(&self) -> Address {
        self.params.receipt_token
    }

    fn reward_token(&self) -> Option<Address> {
        self.params.reward_token
    }

    fn collateral_factor_bps(&self) -> u32 {
        self.params.collateral_factor_bps
    }

    fn accrue(&mut self, clock: &BlockClock) -> Result<(), ProtocolError> {
        let elapsed = clock.number.saturating_sub(self.accrual_block);
        if elapsed == 0 {
            return Ok(());
        }
        let blocks = Decimal::from(elapsed);
        // All three indexes move together or not at all
        let exchange_rate = grown(self.exchange_rate, self.params.supply_rate_per_block, blocks)
            .ok_or(ChainError::Overflow { context: "exchange rate accrual" })?;
        let borrow_index = grown(self.borrow_index, self.params.borrow_rate_per_block, blocks)
            .ok_or(ChainError::Overflow { context: "borrow index accrual" })?;
        let reward_index = self
            .params
            .reward_speed_per_block
            .checked_mul(blocks)
            .and_then(|delta| self.reward_index.checked_add(delta))
            .ok_or(ChainError::Overflow { context: "reward index accrual" })?;

        self.exchange_rate = exchange_rate;
        self.borrow_index = borrow_index;
        self.reward_index = reward_index;
        self.accrual_block = clock.number;
        debug!(
            blocks = elapsed,
            exchange_rate = %self.exchange_rate,
            borrow_index = %self.borrow_index,
            "market accrued"
        );
        Ok(())
    }

    fn supply(
        &mut self,
        chain: &mut ChainState,
        supplier: Address,
        amount: Amount,
    ) -> Result<Amount, ProtocolError> {
        if amount == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        self.accrue(&chain.clock)?;
        self.distribute_rewards(chain, supplier)?;

        let minted = decimal_to_amount_floor(amount_to_decimal(amount)? / self.exchange_rate)?;
        if minted == 0 {
            return Err(ProtocolError::ZeroAmount);
        }

        chain.transfer(self.params.underlying, supplier, self.params.address, amount)?;
        chain.tokens.mint(self.params.receipt_token, supplier, minted)?;
        info!(?supplier, amount, minted, "supplied");
        Ok(minted)
    }

    fn borrow(
        &mut self,
        chain: &mut ChainState,
        borrower: Address,
        amount: Amount,
    ) -> Result<(), ProtocolError> {
        if amount == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        self.accrue(&chain.clock)?;

        let debt = self
            .stored_borrow_balance(borrower)?
            .checked_add(amount)
            .ok_or(chain::ChainError::Overflow { context: "borrow" })?;
        let limit = self.borrow_limit(self.receipt_balance(chain, borrower))?;
        if debt > limit {
            return Err(ProtocolError::InsufficientCollateral {
                account: borrower,
                debt,
                limit,
            });
        }
        self.ensure_cash(chain, amount)?;

        self.set_borrow_balance(borrower, debt);
        chain.transfer(self.params.underlying, self.params.address, borrower, amount)?;
        info!(?borrower, amount, debt, "borrowed");
        Ok(())
    }

    fn repay_borrow(
        &mut self,
        chain: &mut ChainState,
        borrower: Address,
        amount: Amount,
    ) -> Result<(), ProtocolError> {
        if amount == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        self.accrue(&chain.clock)?;

        let debt = self.stored_borrow_balance(borrower)?;
        if amount > debt {
            return Err(ProtocolError::RepayExceedsDebt {
                account: borrower,
                amount,
                debt,
            });
        }

        chain.transfer(self.params.underlying, borrower, self.params.address, amount)?;
        self.set_borrow_balance(borrower, debt - amount);
        info!(?borrower, amount, remaining = debt - amount, "repaid borrow");
        Ok(())
    }

    fn borrow_balance_current(
        &mut self,
        chain: &ChainState,
        account: Address,
    ) -> Result<Amount, ProtocolError> {
        self.accrue(&chain.clock)?;
        self.stored_borrow_balance(account)
    }

    fn underlying_balance(&self, chain: &ChainState, account: Address) -> Result<Amount, ProtocolError> {
        Ok(decimal_to_amount_floor(
            self.collateral_value(self.receipt_balance(chain, account))?,
        )?)
    }

    fn redeem(
        &mut self,
        chain: &mut ChainState,
        redeemer: Address,
        receipt_amount: Amount,
    ) -> Result<Redemption, ProtocolError> {
        if receipt_amount == 0 {
            return Err(ProtocolError::ZeroAmount);
        }
        self.accrue(&chain.clock)?;
        self.distribute_rewards(chain, redeemer)?;

        let held = self.receipt_balance(chain, redeemer);
        if receipt_amount > held {
            return Err(ProtocolError::RedeemExceedsBalance {
                account: redeemer,
                requested: receipt_amount,
                available: held,
            });
        }

        let debt = self.stored_borrow_balance(redeemer)?;
        let limit = self.borrow_limit(held - receipt_amount)?;
        if debt > limit {
            return Err(ProtocolError::InsufficientCollateral {
                account: redeemer,
                debt,
                limit,
            });
        }

        let amount = decimal_to_amount_floor(self.collateral_value(receipt_amount)?)?;
        self.ensure_cash(chain, amount)?;

        chain.tokens.burn(self.params.receipt_token, redeemer, receipt_amount)?;
        chain.transfer(self.params.underlying, self.params.address, redeemer, amount)?;
        let reward = self.pay_rewards(chain, redeemer)?;
        info!(?redeemer, receipt_amount, amount, ?reward, "redeemed");

        Ok(Redemption {
            asset: self.params.underlying,
            amount,
            reward,
        })
    }
}
