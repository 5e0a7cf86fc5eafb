//! # Leveraged Yield Configuration - Strategy and Deployment Parameters
//!
//! ## Purpose
//!
//! Single source for the strategy's leverage policy and for the in-memory
//! deployment the binary and tests execute against. Supports JSON file
//! loading, environment variable overrides and validation, with defaults
//! modelled on a USDC market paying WELL rewards.
//!
//! ## Integration Points
//!
//! - **Input Sources**: JSON configuration files, `LYF_*` environment variables, CLI
//! - **Output Destinations**: Strategy controller (leverage, buffer, slippage),
//!   simulation builder (addresses, rates, liquidity seeds)
//! - **Validation**: Leverage must fit under the collateral factor minus buffer
//!
//! ## Architecture Role
//!
//! ```text
//! Environment Variables → [Configuration Loading] → StrategyConfig   → Controller
//! JSON Config Files            ↓                  → SimulationConfig → Deployment
//!                      Parameter Validation
//! ```

use amm::BPS_DENOMINATOR;
use anyhow::{bail, Context};
use chain::{Address, Amount};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for the leveraged yield strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeveragedYieldConfig {
    pub strategy: StrategyConfig,
    pub simulation: SimulationConfig,
}

/// Leverage and unwind policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Asset borrowed from the vault and supplied to the market
    pub base_asset: Address,
    /// Supplied size relative to principal (30_000 = 3x)
    pub leverage_bps: u32,
    /// Headroom kept below the market's collateral factor
    pub collateral_buffer_bps: u32,
    /// Maximum slippage accepted when swapping into the base asset (50 = 0.5%)
    pub max_slippage_bps: u32,
}

/// Parameters of the in-memory deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub owner: Address,
    pub strategy_address: Address,
    /// Funds the market, vault and venue at setup
    pub liquidity_provider: Address,

    pub base_token: Address,
    /// Lending market; also the address of its receipt token
    pub market: Address,
    pub reward_token: Address,
    pub vault: Address,
    pub venue: Address,

    pub collateral_factor_bps: u32,
    pub initial_exchange_rate: Decimal,
    pub supply_rate_per_block: Decimal,
    pub borrow_rate_per_block: Decimal,
    /// Reward base units per receipt unit per block
    pub reward_speed_per_block: Decimal,
    pub flash_fee_bps: u32,

    pub vault_liquidity: Amount,
    pub market_cash: Amount,
    pub market_reward_reserve: Amount,
    pub venue_base_reserve: Amount,
    pub venue_reward_reserve: Amount,
    pub venue_fee_bps: u32,
    pub owner_funds: Amount,
    pub block_interval_secs: u64,
}

/// A constant that fails to parse becomes the zero address, which
/// `validate` rejects
fn address(hex: &str) -> Address {
    hex.parse().unwrap_or_default()
}

impl Default for LeveragedYieldConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            base_asset: address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), // USDC on Base
            leverage_bps: 30_000,
            collateral_buffer_bps: 500,
            max_slippage_bps: 50,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            owner: address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            strategy_address: address("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            liquidity_provider: address("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
            base_token: address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            market: address("0xEdc817A28E8B93B03976FBd4a3dDBc9f7D176c22"), // mUSDC
            reward_token: address("0xA88594D404727625A9437C3f886C7643872296AE"), // WELL
            vault: address("0xBA12222222228d8Ba445958a75a0704d566BF2C8"),
            venue: address("0xcF77a3Ba9A5CA399B7c97c74d54e5b1Beb874E43"),
            collateral_factor_bps: 8_000,
            initial_exchange_rate: dec!(0.02),
            supply_rate_per_block: dec!(0.0000001),
            borrow_rate_per_block: dec!(0.00000012),
            reward_speed_per_block: dec!(1000000),
            flash_fee_bps: 0,
            vault_liquidity: 10_000_000_000_000,     // 10M USDC
            market_cash: 50_000_000_000_000,         // 50M USDC
            market_reward_reserve: 1_000_000 * 10u128.pow(18),
            venue_base_reserve: 1_000_000_000_000, // 1M USDC
            venue_reward_reserve: 50_000_000 * 10u128.pow(18),
            venue_fee_bps: 30,
            owner_funds: 100_000_000_000, // 100k USDC
            block_interval_secs: 2,
        }
    }
}

impl StrategyConfig {
    /// Largest leverage the collateral factor allows once the buffer is kept:
    /// `(leverage - 1) / leverage <= collateral_factor - buffer`
    pub fn check_against_collateral_factor(&self, collateral_factor_bps: u32) -> anyhow::Result<()> {
        let usable = collateral_factor_bps
            .checked_sub(self.collateral_buffer_bps)
            .context("collateral_buffer_bps exceeds the collateral factor")?;
        let borrowed_share = u64::from(self.leverage_bps.saturating_sub(BPS_DENOMINATOR)) * u64::from(BPS_DENOMINATOR);
        let allowed = u64::from(self.leverage_bps) * u64::from(usable);
        if borrowed_share > allowed {
            bail!(
                "leverage_bps {} needs more than {} bps of collateral factor",
                self.leverage_bps,
                usable
            );
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.leverage_bps <= BPS_DENOMINATOR {
            bail!("leverage_bps must be above {} (1x)", BPS_DENOMINATOR);
        }
        if self.collateral_buffer_bps >= BPS_DENOMINATOR {
            bail!("collateral_buffer_bps must be below 10000");
        }
        if self.max_slippage_bps > BPS_DENOMINATOR {
            bail!("max_slippage_bps must be <= 10000 (100%)");
        }
        if self.base_asset.is_zero() {
            bail!("base_asset must be set");
        }
        Ok(())
    }
}

impl LeveragedYieldConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `LYF_*` environment variables when present and parseable
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("LYF_LEVERAGE_BPS") {
            if let Ok(bps) = value.parse::<u32>() {
                self.strategy.leverage_bps = bps;
            }
        }

        if let Ok(value) = std::env::var("LYF_COLLATERAL_BUFFER_BPS") {
            if let Ok(bps) = value.parse::<u32>() {
                self.strategy.collateral_buffer_bps = bps;
            }
        }

        if let Ok(value) = std::env::var("LYF_MAX_SLIPPAGE_BPS") {
            if let Ok(bps) = value.parse::<u32>() {
                self.strategy.max_slippage_bps = bps;
            }
        }

        if let Ok(value) = std::env::var("LYF_BASE_ASSET") {
            if let Ok(asset) = value.parse::<Address>() {
                self.strategy.base_asset = asset;
            }
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("writing config {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        self.strategy.validate()?;

        let sim = &self.simulation;
        if self.strategy.base_asset != sim.base_token {
            bail!("base_asset must be the lending market's underlying token");
        }
        if sim.collateral_factor_bps > BPS_DENOMINATOR {
            bail!("collateral_factor_bps must be <= 10000");
        }
        self.strategy
            .check_against_collateral_factor(sim.collateral_factor_bps)?;

        if sim.flash_fee_bps >= BPS_DENOMINATOR || sim.venue_fee_bps >= BPS_DENOMINATOR {
            bail!("fees must be below 10000 bps");
        }
        if sim.initial_exchange_rate <= Decimal::ZERO {
            bail!("initial_exchange_rate must be positive");
        }
        if sim.supply_rate_per_block < Decimal::ZERO
            || sim.borrow_rate_per_block < Decimal::ZERO
            || sim.reward_speed_per_block < Decimal::ZERO
        {
            bail!("market rates must be non-negative");
        }
        if sim.block_interval_secs == 0 {
            bail!("block_interval_secs must be positive");
        }
        sim.check_addresses()
    }
}

impl SimulationConfig {
    fn named_addresses(&self) -> [(&'static str, Address); 8] {
        [
            ("owner", self.owner),
            ("strategy_address", self.strategy_address),
            ("liquidity_provider", self.liquidity_provider),
            ("base_token", self.base_token),
            ("market", self.market),
            ("reward_token", self.reward_token),
            ("vault", self.vault),
            ("venue", self.venue),
        ]
    }

    /// Every participant needs its own non-zero address
    pub fn check_addresses(&self) -> anyhow::Result<()> {
        let named = self.named_addresses();
        for (i, (name, address)) in named.iter().enumerate() {
            if address.is_zero() {
                bail!("{name} must not be the zero address");
            }
            if let Some((other, _)) = named[..i].iter().find(|(_, a)| a == address) {
                bail!("{name} and {other} share address {address:?}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = LeveragedYieldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy.base_asset, config.simulation.base_token);
    }

    #[test]
    fn test_default_addresses_parse_and_are_distinct() {
        let config = LeveragedYieldConfig::default();
        assert!(!config.strategy.base_asset.is_zero());
        assert!(config.simulation.check_addresses().is_ok());
        assert_eq!(
            config.simulation.vault,
            "0xBA12222222228d8Ba445958a75a0704d566BF2C8".parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_zero_or_shared_address_rejected() {
        let mut config = LeveragedYieldConfig::default();
        config.simulation.venue = address("0xnot-an-address");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("venue must not be the zero address"));

        let mut config = LeveragedYieldConfig::default();
        config.simulation.vault = config.simulation.market;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vault and market"));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leveraged_yield.json");

        let mut config = LeveragedYieldConfig::default();
        config.strategy.leverage_bps = 25_000;
        config.save_to_file(&path).unwrap();

        let loaded = LeveragedYieldConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = LeveragedYieldConfig::from_file("/nonexistent/lyf.json").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/lyf.json"));
    }

    #[test]
    fn test_leverage_beyond_collateral_factor_rejected() {
        let mut strategy = StrategyConfig::default();
        // 5x needs 80% borrowed share; only 75% usable
        strategy.leverage_bps = 50_000;
        assert!(strategy.check_against_collateral_factor(8_000).is_err());

        strategy.leverage_bps = 40_000;
        assert!(strategy.check_against_collateral_factor(8_000).is_ok());
    }

    #[test]
    fn test_unlevered_config_rejected() {
        let mut config = LeveragedYieldConfig::default();
        config.strategy.leverage_bps = 10_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("LYF_LEVERAGE_BPS", "20000");
        std::env::set_var("LYF_MAX_SLIPPAGE_BPS", "not-a-number");

        let config = LeveragedYieldConfig::from_env();

        assert_eq!(config.strategy.leverage_bps, 20_000);
        assert_eq!(config.strategy.max_slippage_bps, 50);

        // Cleanup
        std::env::remove_var("LYF_LEVERAGE_BPS");
        std::env::remove_var("LYF_MAX_SLIPPAGE_BPS");
    }
}
