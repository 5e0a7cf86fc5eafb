//! Owner gate, native-currency rejection, token recovery and callback guarding

use chain::{Address, ChainError};
use leveraged_yield::{
    CallbackData, CallbackState, Deployment, LeveragedYieldConfig, StrategyError, StrategyEvent, TokenRecovered,
};
use protocols::FlashLoanRequest;
use state_position::Stateful;

const USDC: u128 = 1_000_000;

fn deployment() -> Deployment {
    Deployment::new(LeveragedYieldConfig::default()).unwrap()
}

fn stranger() -> Address {
    Address::repeat_byte(0x66)
}

#[test]
fn test_native_transfer_always_rejected() {
    let mut d = deployment();
    let sender = d.owner();
    let one_eth = 1_000_000_000_000_000_000u128;
    d.chain.native.credit(sender, one_eth).unwrap();
    let before = d.chain.clone();

    let err = d.chain.send_native(sender, &mut d.farm, one_eth).unwrap_err();
    assert!(matches!(err, ChainError::NativeTransferRejected { .. }));
    assert_eq!(d.chain, before);
    assert_eq!(d.chain.native.balance_of(d.strategy()), 0);

    assert_eq!(
        d.farm.receive_native(sender, 0),
        Err(StrategyError::NativeTransferRejected { sender, value: 0 })
    );
}

#[test]
fn test_native_rejected_while_position_open() {
    let mut d = deployment();
    d.deposit(100 * USDC, 0).unwrap();
    let sender = stranger();
    d.chain.native.credit(sender, 5).unwrap();

    assert!(d.chain.send_native(sender, &mut d.farm, 5).is_err());
    assert_eq!(d.chain.native.balance_of(sender), 5);
}

#[test]
fn test_withdraw_token_returns_stray_balance_to_owner() {
    let mut d = deployment();
    let owner = d.owner();
    let base = d.config.simulation.base_token;
    let owner_start = d.balances(owner).base;

    d.fund_strategy(USDC).unwrap();
    assert_eq!(d.balances(d.strategy()).base, USDC);

    let strategy = d.strategy();
    let recovered = d.farm.withdraw_token(&mut d.chain, owner, base).unwrap();
    assert_eq!(recovered, USDC);
    assert_eq!(d.balances(strategy).base, 0);
    assert_eq!(d.balances(owner).base, owner_start);

    let record = d.chain.events.filter(strategy, TokenRecovered::NAME).next().unwrap();
    let event: TokenRecovered = record.decode().unwrap();
    assert_eq!(event, TokenRecovered { token: base, to: owner, amount: USDC });
}

#[test]
fn test_withdraw_token_for_arbitrary_token() {
    let mut d = deployment();
    let owner = d.owner();
    let strategy = d.strategy();
    let airdrop = Address::repeat_byte(0xAD);
    d.chain.tokens.mint(airdrop, strategy, 42_000).unwrap();

    assert_eq!(d.farm.withdraw_token(&mut d.chain, owner, airdrop).unwrap(), 42_000);
    assert_eq!(d.chain.balance_of(airdrop, strategy), 0);
    assert_eq!(d.chain.balance_of(airdrop, owner), 42_000);

    // Nothing left: recovery of an empty balance moves nothing
    assert_eq!(d.farm.withdraw_token(&mut d.chain, owner, airdrop).unwrap(), 0);
}

#[test]
fn test_withdraw_token_leaves_position_untouched() {
    let mut d = deployment();
    let owner = d.owner();
    d.deposit(100 * USDC, 0).unwrap();
    let snapshot = d.farm.ledger().snapshot();

    let stray = d.config.simulation.reward_token;
    d.chain.tokens.mint(stray, d.strategy(), 7).unwrap();
    d.farm.withdraw_token(&mut d.chain, owner, stray).unwrap();

    assert_eq!(d.farm.ledger().snapshot(), snapshot);
}

#[test]
fn test_non_owner_rejected_everywhere() {
    let mut d = deployment();
    let base = d.config.simulation.base_token;
    d.fund_strategy(USDC).unwrap();
    let before = d.chain.clone();

    assert_eq!(
        d.farm.withdraw_token(&mut d.chain, stranger(), base),
        Err(StrategyError::NotOwner { caller: stranger() })
    );
    assert_eq!(
        d.farm.deposit(&mut d.chain, stranger(), USDC),
        Err(StrategyError::NotOwner { caller: stranger() })
    );
    assert_eq!(
        d.farm.withdraw(&mut d.chain, stranger(), USDC),
        Err(StrategyError::NotOwner { caller: stranger() })
    );
    assert_eq!(d.chain, before);
    assert_eq!(d.balances(d.strategy()).base, USDC);
}

#[test]
fn test_callback_without_request_is_unauthorized() {
    let mut d = deployment();
    let sim = d.config.simulation.clone();
    let request = FlashLoanRequest::new(sim.base_token, 1_000 * USDC, 0).unwrap();
    let data = CallbackData::Deposit { principal: 100 * USDC }.encode().unwrap();
    let before = d.chain.clone();

    // Even the vault's own address cannot call back without an outstanding loan
    let err = d
        .farm
        .receive_flash_loan(&mut d.chain, sim.vault, &request, &data)
        .unwrap_err();
    assert_eq!(
        err,
        StrategyError::UnauthorizedCallback {
            caller: sim.vault,
            state: CallbackState::Idle,
        }
    );

    let err = d
        .farm
        .receive_flash_loan(&mut d.chain, stranger(), &request, &data)
        .unwrap_err();
    assert!(matches!(err, StrategyError::UnauthorizedCallback { .. }));

    assert_eq!(d.chain, before);
    assert_eq!(d.farm.callback_state(), CallbackState::Idle);
    assert!(!d.farm.position().is_open());
}

#[test]
fn test_unauthorized_callback_after_completed_operation() {
    let mut d = deployment();
    d.deposit(100 * USDC, 0).unwrap();
    let sim = d.config.simulation.clone();

    // Replaying the exact loan the deposit used is still refused
    let request = FlashLoanRequest::new(sim.base_token, 200 * USDC, 0).unwrap();
    let data = CallbackData::Deposit { principal: 100 * USDC }.encode().unwrap();
    assert!(matches!(
        d.farm.receive_flash_loan(&mut d.chain, sim.vault, &request, &data),
        Err(StrategyError::UnauthorizedCallback {
            state: CallbackState::Idle,
            ..
        })
    ));
    assert_eq!(d.farm.position().principal, 100 * USDC);
}
