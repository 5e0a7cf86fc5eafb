//! Failed operations leave no trace: chain, collaborators and ledger all
//! return to their state before the call

use leveraged_yield::{CallbackState, Deployment, LeveragedYieldConfig, StrategyError};
use protocols::ProtocolError;
use proptest::prelude::*;
use rust_decimal_macros::dec;
use state_position::Stateful;

const USDC: u128 = 1_000_000;

fn with_flash_fee(fee_bps: u32) -> Deployment {
    let mut config = LeveragedYieldConfig::default();
    config.simulation.flash_fee_bps = fee_bps;
    Deployment::new(config).unwrap()
}

#[test]
fn test_unrepayable_deposit_rolls_back() {
    let mut d = with_flash_fee(9);
    let owner = d.owner();
    let base = d.config.simulation.base_token;
    d.fund_strategy(1_000 * USDC).unwrap();

    let chain_before = d.chain.clone();
    let ledger_before = d.farm.ledger().snapshot();
    let vault_before = d.farm.vault().clone();
    let market_before = d.farm.market().clone();

    // 2000 borrowed back from the market cannot cover 2000 plus a 1.8 fee
    let err = d.farm.deposit(&mut d.chain, owner, 1_000 * USDC).unwrap_err();
    assert_eq!(
        err,
        StrategyError::InsufficientRepayment {
            asset: base,
            required: 2_001_800_000,
            available: 2_000_000_000,
        }
    );

    assert_eq!(d.chain, chain_before);
    assert_eq!(d.farm.ledger().snapshot(), ledger_before);
    assert_eq!(d.farm.vault(), &vault_before);
    assert_eq!(d.farm.market(), &market_before);
    assert_eq!(d.farm.vault().loans_served(), 0);
    assert!(!d.farm.ledger().is_staging());
    assert_eq!(d.farm.callback_state(), CallbackState::Idle);
    assert_eq!(d.farm.last_outcome(), Some(CallbackState::Reverted));
    assert_eq!(d.balances(d.strategy()).base, 1_000 * USDC);
}

#[test]
fn test_unrepayable_withdraw_rolls_back() {
    let mut config = LeveragedYieldConfig::default();
    config.simulation.supply_rate_per_block = dec!(0);
    config.simulation.borrow_rate_per_block = dec!(0.01);
    config.simulation.reward_speed_per_block = dec!(0);
    let mut d = Deployment::new(config).unwrap();
    let base = d.config.simulation.base_token;

    d.deposit(1_000 * USDC, 0).unwrap();
    d.mine(100);

    let chain_before = d.chain.clone();
    let ledger_before = d.farm.ledger().snapshot();
    let market_before = d.farm.market().clone();
    let venue_before = d.farm.venue().clone();

    // Debt doubled to 4000 while the collateral redeems 3000 and there are no rewards to sell
    let err = d.withdraw(1_000 * USDC).unwrap_err();
    assert_eq!(
        err,
        StrategyError::InsufficientRepayment {
            asset: base,
            required: 4_000 * USDC,
            available: 3_000 * USDC,
        }
    );

    assert_eq!(d.chain, chain_before);
    assert_eq!(d.farm.ledger().snapshot(), ledger_before);
    assert_eq!(d.farm.market(), &market_before);
    assert_eq!(d.farm.venue(), &venue_before);
    assert_eq!(d.farm.vault().loans_served(), 1);
    assert_eq!(d.farm.position().principal, 1_000 * USDC);
    assert_eq!(d.farm.last_outcome(), Some(CallbackState::Reverted));
    assert_eq!(d.farm.callback_state(), CallbackState::Idle);
}

#[test]
fn test_failed_deposit_keeps_existing_position() {
    let mut config = LeveragedYieldConfig::default();
    config.simulation.flash_fee_bps = 9;
    let mut d = Deployment::new(config).unwrap();
    let owner = d.owner();

    d.deposit(1_000 * USDC, 2 * USDC).unwrap();
    let committed = d.farm.position().clone();
    let ledger_before = d.farm.ledger().snapshot();

    // Leftover headroom of 0.2 cannot pay the 0.45 fee on a 500 flash loan
    d.fund_strategy(250 * USDC).unwrap();
    assert!(d.farm.deposit(&mut d.chain, owner, 250 * USDC).is_err());

    assert_eq!(d.farm.position(), &committed);
    assert_eq!(d.farm.ledger().snapshot(), ledger_before);
    assert_eq!(d.farm.ledger().revision(), 1);
}

/// Debt outgrows the collateral by 20 USDC and the reward pool is only 21 USDC deep
fn shallow_reward_pool(max_slippage_bps: u32) -> Deployment {
    let mut config = LeveragedYieldConfig::default();
    config.strategy.max_slippage_bps = max_slippage_bps;
    config.simulation.supply_rate_per_block = dec!(0);
    config.simulation.borrow_rate_per_block = dec!(0.0051);
    config.simulation.reward_speed_per_block = dec!(1000000000);
    config.simulation.venue_base_reserve = 21 * USDC;
    config.simulation.venue_reward_reserve = 100 * 10u128.pow(18);
    let mut d = Deployment::new(config).unwrap();
    d.deposit(1_000 * USDC, 0).unwrap();
    d.mine(100);
    d
}

#[test]
fn test_reward_sale_beyond_slippage_rolls_back_withdraw() {
    let mut d = shallow_reward_pool(50);
    let sim = d.config.simulation.clone();

    let chain_before = d.chain.clone();
    let ledger_before = d.farm.ledger().snapshot();
    let market_before = d.farm.market().clone();
    let venue_before = d.farm.venue().clone();

    // Selling ~2006 WELL worth ~421 USDC at the pool's marginal price yields ~20 USDC
    let err = d.withdraw(1_000 * USDC).unwrap_err();
    let StrategyError::Protocol(ProtocolError::SlippageExceeded { min_out, quoted }) = err else {
        panic!("expected slippage rejection, got {err:?}");
    };
    assert!(quoted > 20 * USDC);
    assert!(min_out > 400 * USDC);

    assert_eq!(d.chain, chain_before);
    assert_eq!(d.farm.ledger().snapshot(), ledger_before);
    assert_eq!(d.farm.market(), &market_before);
    assert_eq!(d.farm.venue(), &venue_before);
    assert_eq!(d.farm.position().principal, 1_000 * USDC);
    assert_eq!(d.chain.balance_of(sim.base_token, sim.vault), sim.vault_liquidity);
    assert_eq!(d.farm.last_outcome(), Some(CallbackState::Reverted));
}

#[test]
fn test_full_slippage_tolerance_accepts_the_same_sale() {
    let mut d = shallow_reward_pool(10_000);
    let sim = d.config.simulation.clone();

    let withdrawn = d.withdraw(1_000 * USDC).unwrap();
    assert_eq!(withdrawn.debt_repaid, 3_020 * USDC);
    assert!(!d.farm.position().is_open());

    let (_, base_left) = d.farm.venue().reserves(sim.reward_token, sim.base_token).unwrap();
    assert!(base_left < USDC);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_round_trip_conserves_owner_funds(amount in 1u128..=10_000) {
        let mut d = with_flash_fee(0);
        let owner = d.owner();
        let sim = d.config.simulation.clone();
        let principal = amount * USDC;

        d.deposit(principal, 0).unwrap();
        prop_assert_eq!(d.farm.position().principal, principal);
        prop_assert_eq!(d.balances(owner).base, sim.owner_funds - principal);

        let withdrawn = d.withdraw(principal).unwrap();
        prop_assert_eq!(withdrawn.base_returned, principal);
        prop_assert_eq!(d.balances(owner).base, sim.owner_funds);
        prop_assert_eq!(d.chain.balance_of(sim.base_token, sim.vault), sim.vault_liquidity);
        prop_assert_eq!(d.chain.balance_of(sim.base_token, sim.market), sim.market_cash);
        prop_assert!(!d.farm.position().is_open());
    }

    #[test]
    fn prop_failed_deposit_is_byte_identical(amount in 1u128..=10_000, fee_bps in 1u32..=100) {
        let mut d = with_flash_fee(fee_bps);
        let owner = d.owner();
        let principal = amount * USDC;
        d.fund_strategy(principal).unwrap();

        let chain_before = d.chain.clone();
        let ledger_before = d.farm.ledger().snapshot();
        let vault_before = d.farm.vault().clone();

        let err = d.farm.deposit(&mut d.chain, owner, principal).unwrap_err();
        let is_repayment = matches!(err, StrategyError::InsufficientRepayment { .. });
        prop_assert!(is_repayment);
        prop_assert_eq!(&d.chain, &chain_before);
        prop_assert_eq!(d.farm.ledger().snapshot(), ledger_before);
        prop_assert_eq!(d.farm.vault(), &vault_before);
        prop_assert_eq!(d.farm.callback_state(), CallbackState::Idle);
    }
}
