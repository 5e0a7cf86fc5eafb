//! Strategy controller
//!
//! Public entry points of the leveraged yield farm. Each call is one atomic
//! unit: the chain state and all three collaborators are checkpointed on
//! entry and restored if anything fails, the position ledger discards its
//! stage, and the callback state machine is settled back to `Idle`.

use crate::callback::{CallbackData, CallbackState};
use crate::config::StrategyConfig;
use crate::error::{Result, StrategyError};
use crate::events::{emit, Deposited, FlashLoanUsed, TokenRecovered, Withdrawn};
use crate::guard::{reject_native, OwnerConfig};
use crate::handler::{mul_div_ceil, FarmCore};
use crate::{log_execution, log_profit, log_rollback, log_success, log_unwind};
use amm::BPS_DENOMINATOR;
use chain::{atomically, Address, Amount, ChainError, ChainState, Checkpoint, NativeReceiver};
use protocols::{FlashLoanReceiver, FlashLoanRequest, FlashLoanVault, LendingMarket, SwapVenue};
use serde::{Deserialize, Serialize};
use state_position::{PositionLedger, StrategyPosition};

/// Sizing of one leveraged deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeveragePlan {
    pub principal: Amount,
    pub flash_amount: Amount,
    /// `principal + flash_amount`
    pub total_supply: Amount,
}

/// Borrow sizing for a fixed leverage multiple, bounded by the usable collateral factor
pub fn plan_leverage(amount: Amount, config: &StrategyConfig, collateral_factor_bps: u32) -> Result<LeveragePlan> {
    let total_supply = amount
        .checked_mul(Amount::from(config.leverage_bps))
        .ok_or(ChainError::Overflow { context: "leverage sizing" })?
        / Amount::from(BPS_DENOMINATOR);
    let flash_amount = total_supply.saturating_sub(amount);
    if flash_amount == 0 {
        return Err(StrategyError::InvalidAmount {
            reason: format!("deposit of {amount} is too small to lever"),
        });
    }

    let usable_bps = collateral_factor_bps.saturating_sub(config.collateral_buffer_bps);
    let borrowed_share = flash_amount
        .checked_mul(Amount::from(BPS_DENOMINATOR))
        .ok_or(ChainError::Overflow { context: "leverage sizing" })?;
    let allowed = total_supply
        .checked_mul(Amount::from(usable_bps))
        .ok_or(ChainError::Overflow { context: "leverage sizing" })?;
    if borrowed_share > allowed {
        return Err(StrategyError::InvalidConfig {
            reason: format!(
                "leverage {} bps exceeds collateral factor {} bps less buffer {} bps",
                config.leverage_bps, collateral_factor_bps, config.collateral_buffer_bps
            ),
        });
    }

    Ok(LeveragePlan {
        principal: amount,
        flash_amount,
        total_supply,
    })
}

pub struct LeveragedYieldFarm<V, M, S> {
    owner: OwnerConfig,
    vault: V,
    core: FarmCore<M, S>,
}

impl<V, M, S> LeveragedYieldFarm<V, M, S>
where
    V: FlashLoanVault + Clone,
    M: LendingMarket + Clone,
    S: SwapVenue + Clone,
{
    pub fn new(
        address: Address,
        owner: OwnerConfig,
        config: StrategyConfig,
        vault: V,
        market: M,
        venue: S,
    ) -> Result<Self> {
        let invalid = |e: anyhow::Error| StrategyError::InvalidConfig {
            reason: format!("{e:#}"),
        };
        config.validate().map_err(invalid)?;
        if config.base_asset != market.underlying() {
            return Err(StrategyError::InvalidConfig {
                reason: format!(
                    "base asset {:?} is not the market underlying {:?}",
                    config.base_asset,
                    market.underlying()
                ),
            });
        }
        config
            .check_against_collateral_factor(market.collateral_factor_bps())
            .map_err(invalid)?;

        let core = FarmCore::new(address, owner.owner, vault.address(), config, market, venue);
        Ok(Self { owner, vault, core })
    }

    pub fn address(&self) -> Address {
        self.core.address
    }

    pub fn owner(&self) -> Address {
        self.owner.owner
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.core.config
    }

    /// Committed position; staged changes are never visible here
    pub fn position(&self) -> &StrategyPosition {
        self.core.ledger.committed()
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.core.ledger
    }

    pub fn callback_state(&self) -> CallbackState {
        self.core.guard.state()
    }

    pub fn last_outcome(&self) -> Option<CallbackState> {
        self.core.guard.last_outcome()
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn market(&self) -> &M {
        &self.core.market
    }

    pub fn venue(&self) -> &S {
        &self.core.venue
    }

    pub fn plan_deposit(&self, amount: Amount) -> Result<LeveragePlan> {
        plan_leverage(amount, &self.core.config, self.core.market.collateral_factor_bps())
    }

    /// Run `op` as one unit; on failure every collaborator and the chain
    /// return to their state at entry.
    fn atomic_unit<T>(
        &mut self,
        chain: &mut ChainState,
        operation: &'static str,
        op: impl FnOnce(&mut Self, &mut ChainState) -> Result<T>,
    ) -> Result<T> {
        let chain_checkpoint = Checkpoint::take(chain);
        let vault_checkpoint = Checkpoint::take(&self.vault);
        let market_checkpoint = Checkpoint::take(&self.core.market);
        let venue_checkpoint = Checkpoint::take(&self.core.venue);

        let result = op(self, chain);
        if let Err(e) = &result {
            chain_checkpoint.restore(chain);
            vault_checkpoint.restore(&mut self.vault);
            market_checkpoint.restore(&mut self.core.market);
            venue_checkpoint.restore(&mut self.core.venue);
            self.core.ledger.discard();
            log_rollback!("{} rolled back: {}", operation, e);
        }
        self.core.guard.settle(result.is_ok());
        result
    }

    /// Ask the vault for `amount` of `asset` and run `data` in its callback
    fn flash(
        &mut self,
        chain: &mut ChainState,
        asset: Address,
        amount: Amount,
        data: CallbackData,
    ) -> Result<FlashLoanRequest> {
        let encoded = data.encode()?;
        self.core.guard.request(asset, amount)?;
        self.core.ledger.begin()?;
        log_execution!("Requesting flash loan of {} {:?} for {:?}", amount, asset, data);

        let request = self
            .vault
            .flash_loan(chain, &mut self.core, asset, amount, &encoded)?;
        emit(
            chain,
            self.core.address,
            &FlashLoanUsed {
                asset: request.asset,
                amount: request.amount,
                fee: request.fee,
            },
        )?;
        Ok(request)
    }

    /// Lever `amount` of base asset already held by the strategy into the market
    pub fn deposit(&mut self, chain: &mut ChainState, caller: Address, amount: Amount) -> Result<Deposited> {
        self.owner.ensure_owner(caller)?;
        if amount == 0 {
            return Err(StrategyError::InvalidAmount {
                reason: "deposit amount must be non-zero".to_string(),
            });
        }
        let plan = self.plan_deposit(amount)?;

        let base = self.core.config.base_asset;
        let held = chain.balance_of(base, self.core.address);
        if held < amount {
            return Err(ChainError::InsufficientBalance {
                token: base,
                holder: self.core.address,
                needed: amount,
                available: held,
            }
            .into());
        }

        self.atomic_unit(chain, "deposit", |farm, chain| {
            let base = farm.core.config.base_asset;
            let request = farm.flash(chain, base, plan.flash_amount, CallbackData::Deposit { principal: amount })?;

            let before = farm.core.ledger.committed().clone();
            let after = farm.core.ledger.staged()?.clone();
            let event = Deposited {
                owner: farm.owner.owner,
                principal: amount,
                flash_amount: request.amount,
                supplied: plan.total_supply,
                receipt_minted: after.receipt_balance - before.receipt_balance,
                market_borrowed: after.market_debt - before.market_debt,
            };
            emit(chain, farm.core.address, &event)?;
            farm.core.ledger.commit()?;

            log_success!(
                "Deposited {} at {} bps leverage, position principal {}",
                amount,
                farm.core.config.leverage_bps,
                farm.position().principal
            );
            Ok(event)
        })
    }

    /// Unwind the share of the position backing `amount` of principal and
    /// forward all base and reward proceeds to the owner
    pub fn withdraw(&mut self, chain: &mut ChainState, caller: Address, amount: Amount) -> Result<Withdrawn> {
        self.owner.ensure_owner(caller)?;
        if amount == 0 {
            return Err(StrategyError::InvalidAmount {
                reason: "withdraw amount must be non-zero".to_string(),
            });
        }
        let position = self.position().clone();
        if amount > position.principal {
            return Err(StrategyError::WithdrawExceedsPrincipal {
                requested: amount,
                principal: position.principal,
            });
        }

        self.atomic_unit(chain, "withdraw", |farm, chain| {
            let debt = farm
                .core
                .market
                .borrow_balance_current(chain, farm.core.address)?;
            let flash_amount = if amount == position.principal {
                debt
            } else {
                mul_div_ceil(debt, amount, position.principal)?
            };
            let base = farm.core.config.base_asset;

            // Debt already cleared by an earlier partial withdraw: nothing to
            // flash-borrow, the receipt share is redeemed directly
            let debt_repaid = if flash_amount == 0 {
                farm.core.ledger.begin()?;
                farm.core.redeem_share(chain, amount)?;
                log_unwind!("Redeemed {} principal without market debt", amount);
                0
            } else {
                farm.flash(chain, base, flash_amount, CallbackData::Withdraw { principal: amount })?
                    .amount
            };
            let after = farm.core.ledger.staged()?.clone();

            let owner = farm.owner.owner;
            let base_returned = chain.tokens.transfer_all(base, farm.core.address, owner)?;
            let reward_returned = match farm.core.market.reward_token() {
                Some(reward) => chain.tokens.transfer_all(reward, farm.core.address, owner)?,
                None => 0,
            };

            let event = Withdrawn {
                owner,
                principal: amount,
                debt_repaid,
                receipt_redeemed: position.receipt_balance - after.receipt_balance,
                base_returned,
                reward_returned,
            };
            emit(chain, farm.core.address, &event)?;
            farm.core.ledger.commit()?;

            log_profit!(
                "Withdrew {} principal: {} base and {} reward returned to owner",
                amount,
                base_returned,
                reward_returned
            );
            Ok(event)
        })
    }

    /// Borrow the vault's entire balance of `token` and hand it straight
    /// back. The strategy must already hold the vault's fee.
    pub fn flash_full_liquidity(
        &mut self,
        chain: &mut ChainState,
        caller: Address,
        token: Address,
    ) -> Result<FlashLoanUsed> {
        self.owner.ensure_owner(caller)?;
        let amount = self.vault.max_flash_loan(chain, token);
        if amount == 0 {
            return Err(StrategyError::InvalidAmount {
                reason: format!("vault holds no {token:?} to lend"),
            });
        }

        self.atomic_unit(chain, "flash_full_liquidity", |farm, chain| {
            let request = farm.flash(chain, token, amount, CallbackData::RoundTrip)?;
            // The position never moved; nothing to commit
            farm.core.ledger.discard();
            log_success!("Flash loan of {} {:?} returned with fee {}", request.amount, token, request.fee);
            Ok(FlashLoanUsed {
                asset: request.asset,
                amount: request.amount,
                fee: request.fee,
            })
        })
    }

    /// Send the strategy's entire balance of `token` to the owner
    pub fn withdraw_token(&mut self, chain: &mut ChainState, caller: Address, token: Address) -> Result<Amount> {
        self.owner.ensure_owner(caller)?;
        let (strategy, to) = (self.core.address, self.owner.owner);
        // Only the chain changes; no collaborator or ledger state is involved
        atomically(chain, |chain| -> Result<Amount> {
            let amount = chain.tokens.transfer_all(token, strategy, to)?;
            emit(chain, strategy, &TokenRecovered { token, to, amount })?;
            log_success!("Recovered {} of {:?} to owner", amount, token);
            Ok(amount)
        })
    }

    /// Callback entry point. Only honoured while a loan this strategy
    /// requested is in flight; direct calls fail as unauthorized.
    pub fn receive_flash_loan(
        &mut self,
        chain: &mut ChainState,
        caller: Address,
        request: &FlashLoanRequest,
        data: &[u8],
    ) -> Result<()> {
        self.atomic_unit(chain, "receive_flash_loan", |farm, chain| {
            farm.core.receive_flash_loan(chain, caller, request, data)
        })
    }

    /// Bare native-currency transfers always fail
    pub fn receive_native(&mut self, sender: Address, value: Amount) -> Result<()> {
        Err(reject_native(sender, value))
    }
}

impl<V, M, S> NativeReceiver for LeveragedYieldFarm<V, M, S> {
    fn address(&self) -> Address {
        self.core.address
    }

    fn receive_native(&mut self, sender: Address, value: Amount) -> std::result::Result<(), ChainError> {
        Err(ChainError::NativeTransferRejected {
            recipient: self.core.address,
            reason: reject_native(sender, value).to_string(),
        })
    }
}
