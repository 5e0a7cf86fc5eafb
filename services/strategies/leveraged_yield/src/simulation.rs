//! In-memory deployment
//!
//! Builds a funded chain, a vault, a lending market with rewards and a
//! reward/base pool from [`SimulationConfig`], and deploys the strategy
//! against them. Used by the binary and the integration tests.

use crate::config::{LeveragedYieldConfig, SimulationConfig};
use crate::controller::LeveragedYieldFarm;
use crate::error::Result;
use crate::events::{Deposited, Withdrawn};
use crate::guard::OwnerConfig;
use crate::log_blocks;
use anyhow::Context;
use chain::{Address, Amount, BlockClock, ChainError, ChainState};
use protocols::{ConstantProductVenue, InMemoryLendingMarket, InMemoryVault, MarketParams};
use serde::Serialize;
use tracing::info;

pub type SimulatedFarm = LeveragedYieldFarm<InMemoryVault, InMemoryLendingMarket, ConstantProductVenue>;

/// Token balances of one holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Balances {
    pub base: Amount,
    pub receipt: Amount,
    pub reward: Amount,
}

pub struct Deployment {
    pub chain: ChainState,
    pub farm: SimulatedFarm,
    pub config: LeveragedYieldConfig,
}

fn market_params(sim: &SimulationConfig) -> MarketParams {
    MarketParams {
        address: sim.market,
        underlying: sim.base_token,
        receipt_token: sim.market,
        reward_token: Some(sim.reward_token),
        collateral_factor_bps: sim.collateral_factor_bps,
        initial_exchange_rate: sim.initial_exchange_rate,
        supply_rate_per_block: sim.supply_rate_per_block,
        borrow_rate_per_block: sim.borrow_rate_per_block,
        reward_speed_per_block: sim.reward_speed_per_block,
    }
}

impl Deployment {
    pub fn new(config: LeveragedYieldConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid leveraged yield configuration")?;
        let sim = &config.simulation;
        let mut chain = ChainState::new(BlockClock::default());

        chain.tokens.mint(sim.base_token, sim.vault, sim.vault_liquidity)?;
        chain.tokens.mint(sim.base_token, sim.market, sim.market_cash)?;
        chain
            .tokens
            .mint(sim.reward_token, sim.market, sim.market_reward_reserve)?;
        chain.tokens.mint(sim.base_token, sim.owner, sim.owner_funds)?;

        let market = InMemoryLendingMarket::new(market_params(sim), &chain.clock);
        let vault = InMemoryVault::new(sim.vault, sim.flash_fee_bps);

        let mut venue = ConstantProductVenue::new(sim.venue);
        let lp = sim.liquidity_provider;
        chain.tokens.mint(sim.reward_token, lp, sim.venue_reward_reserve)?;
        chain.tokens.mint(sim.base_token, lp, sim.venue_base_reserve)?;
        venue
            .add_liquidity(
                &mut chain,
                lp,
                (sim.reward_token, sim.venue_reward_reserve),
                (sim.base_token, sim.venue_base_reserve),
                sim.venue_fee_bps,
            )
            .context("seeding reward/base pool")?;

        let farm = LeveragedYieldFarm::new(
            sim.strategy_address,
            OwnerConfig::new(sim.owner),
            config.strategy,
            vault,
            market,
            venue,
        )?;

        info!(strategy = ?sim.strategy_address, owner = ?sim.owner, "deployment ready");
        Ok(Self { chain, farm, config })
    }

    pub fn owner(&self) -> Address {
        self.config.simulation.owner
    }

    pub fn strategy(&self) -> Address {
        self.farm.address()
    }

    pub fn balances(&self, holder: Address) -> Balances {
        let sim = &self.config.simulation;
        Balances {
            base: self.chain.balance_of(sim.base_token, holder),
            receipt: self.chain.balance_of(sim.market, holder),
            reward: self.chain.balance_of(sim.reward_token, holder),
        }
    }

    /// Owner moves base asset into the strategy's custody
    pub fn fund_strategy(&mut self, amount: Amount) -> std::result::Result<(), ChainError> {
        let owner = self.owner();
        let strategy = self.strategy();
        self.chain
            .transfer(self.config.simulation.base_token, owner, strategy, amount)
    }

    /// Fund `amount + headroom` and lever `amount` into the market
    pub fn deposit(&mut self, amount: Amount, headroom: Amount) -> Result<Deposited> {
        let funded = amount
            .checked_add(headroom)
            .ok_or(ChainError::Overflow { context: "deposit funding" })?;
        self.fund_strategy(funded)?;
        let owner = self.owner();
        self.farm.deposit(&mut self.chain, owner, amount)
    }

    pub fn withdraw(&mut self, amount: Amount) -> Result<Withdrawn> {
        let owner = self.owner();
        self.farm.withdraw(&mut self.chain, owner, amount)
    }

    /// Advance the clock by `blocks` at the configured block interval
    pub fn mine(&mut self, blocks: u64) {
        let interval = self.config.simulation.block_interval_secs;
        self.chain.mine(blocks, interval);
        log_blocks!("Mined {} blocks, now at block {}", blocks, self.chain.clock.number);
    }
}
