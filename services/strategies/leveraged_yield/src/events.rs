//! Events the strategy writes to the chain event log

use chain::{Address, Amount, ChainError, ChainState};
use serde::{Deserialize, Serialize};

pub trait StrategyEvent: Serialize {
    const NAME: &'static str;
}

/// Emitted on every flash loan the strategy completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashLoanUsed {
    pub asset: Address,
    pub amount: Amount,
    pub fee: Amount,
}

impl StrategyEvent for FlashLoanUsed {
    const NAME: &'static str = "FlashLoan";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposited {
    pub owner: Address,
    pub principal: Amount,
    pub flash_amount: Amount,
    /// Principal plus flash loan handed to the lending market
    pub supplied: Amount,
    pub receipt_minted: Amount,
    pub market_borrowed: Amount,
}

impl StrategyEvent for Deposited {
    const NAME: &'static str = "Deposited";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawn {
    pub owner: Address,
    pub principal: Amount,
    pub debt_repaid: Amount,
    pub receipt_redeemed: Amount,
    /// Base asset forwarded to the owner after the loan was repaid
    pub base_returned: Amount,
    pub reward_returned: Amount,
}

impl StrategyEvent for Withdrawn {
    const NAME: &'static str = "Withdrawn";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecovered {
    pub token: Address,
    pub to: Address,
    pub amount: Amount,
}

impl StrategyEvent for TokenRecovered {
    const NAME: &'static str = "TokenRecovered";
}

pub fn emit<E: StrategyEvent>(chain: &mut ChainState, emitter: Address, event: &E) -> Result<(), ChainError> {
    chain.emit(emitter, E::NAME, event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_loan_event_payload() {
        let mut chain = ChainState::default();
        let emitter = Address::repeat_byte(0x5E);
        let asset = Address::repeat_byte(0x01);
        emit(&mut chain, emitter, &FlashLoanUsed { asset, amount: 7, fee: 0 }).unwrap();

        let record = chain.events.filter(emitter, FlashLoanUsed::NAME).next().unwrap();
        let decoded: FlashLoanUsed = record.decode().unwrap();
        assert_eq!(decoded.asset, asset);
        assert_eq!(decoded.amount, 7);
        assert_eq!(record.block, chain.clock.number);
    }
}
