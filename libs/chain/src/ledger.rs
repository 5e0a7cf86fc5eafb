//! Token custody ledger
//!
//! ERC20-style balances keyed by `(token, holder)`. Storage is ordered so two
//! ledgers holding the same balances compare equal regardless of history.

use crate::errors::ChainError;
use crate::types::{Address, Amount};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: BTreeMap<(Address, Address), Amount>,
    supply: BTreeMap<Address, Amount>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> Amount {
        self.balances.get(&(token, holder)).copied().unwrap_or(0)
    }

    pub fn total_supply(&self, token: Address) -> Amount {
        self.supply.get(&token).copied().unwrap_or(0)
    }

    /// Create `amount` new units of `token` in `to`'s custody
    pub fn mint(&mut self, token: Address, to: Address, amount: Amount) -> Result<(), ChainError> {
        let supply = self
            .total_supply(token)
            .checked_add(amount)
            .ok_or(ChainError::Overflow { context: "mint supply" })?;
        let balance = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(ChainError::Overflow { context: "mint balance" })?;
        self.supply.insert(token, supply);
        self.set_balance(token, to, balance);
        debug!(?token, ?to, amount, "mint");
        Ok(())
    }

    /// Destroy `amount` units of `token` held by `from`
    pub fn burn(&mut self, token: Address, from: Address, amount: Amount) -> Result<(), ChainError> {
        let balance = self.debit_amount(token, from, amount)?;
        self.set_balance(token, from, balance);
        let supply = self.total_supply(token).saturating_sub(amount);
        self.supply.insert(token, supply);
        debug!(?token, ?from, amount, "burn");
        Ok(())
    }

    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), ChainError> {
        if from == to || amount == 0 {
            // Still validate the sender holds the amount
            self.debit_amount(token, from, amount)?;
            return Ok(());
        }
        let from_balance = self.debit_amount(token, from, amount)?;
        let to_balance = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(ChainError::Overflow { context: "transfer" })?;
        self.set_balance(token, from, from_balance);
        self.set_balance(token, to, to_balance);
        debug!(?token, ?from, ?to, amount, "transfer");
        Ok(())
    }

    /// Move the holder's entire balance of `token`, returning the amount moved
    pub fn transfer_all(&mut self, token: Address, from: Address, to: Address) -> Result<Amount, ChainError> {
        let amount = self.balance_of(token, from);
        self.transfer(token, from, to, amount)?;
        Ok(amount)
    }

    fn debit_amount(&self, token: Address, holder: Address, amount: Amount) -> Result<Amount, ChainError> {
        let available = self.balance_of(token, holder);
        available
            .checked_sub(amount)
            .ok_or(ChainError::InsufficientBalance {
                token,
                holder,
                needed: amount,
                available,
            })
    }

    fn set_balance(&mut self, token: Address, holder: Address, amount: Amount) {
        if amount == 0 {
            self.balances.remove(&(token, holder));
        } else {
            self.balances.insert((token, holder), amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_transfer_moves_balance() {
        let mut ledger = TokenLedger::new();
        let usdc = addr(1);
        ledger.mint(usdc, addr(2), 1_000).unwrap();
        ledger.transfer(usdc, addr(2), addr(3), 400).unwrap();

        assert_eq!(ledger.balance_of(usdc, addr(2)), 600);
        assert_eq!(ledger.balance_of(usdc, addr(3)), 400);
        assert_eq!(ledger.total_supply(usdc), 1_000);
    }

    #[test]
    fn test_overdraft_rejected_without_mutation() {
        let mut ledger = TokenLedger::new();
        let usdc = addr(1);
        ledger.mint(usdc, addr(2), 100).unwrap();
        let before = ledger.clone();

        let err = ledger.transfer(usdc, addr(2), addr(3), 101).unwrap_err();
        assert_eq!(
            err,
            ChainError::InsufficientBalance {
                token: usdc,
                holder: addr(2),
                needed: 101,
                available: 100,
            }
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_zero_balances_do_not_affect_equality() {
        let mut a = TokenLedger::new();
        let mut b = TokenLedger::new();
        let token = addr(9);
        a.mint(token, addr(1), 5).unwrap();
        b.mint(token, addr(1), 5).unwrap();
        a.transfer(token, addr(1), addr(2), 5).unwrap();
        a.transfer(token, addr(2), addr(1), 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_transfer_all_and_burn() {
        let mut ledger = TokenLedger::new();
        let token = addr(4);
        ledger.mint(token, addr(1), 77).unwrap();
        assert_eq!(ledger.transfer_all(token, addr(1), addr(2)).unwrap(), 77);
        assert_eq!(ledger.balance_of(token, addr(1)), 0);

        ledger.burn(token, addr(2), 7).unwrap();
        assert_eq!(ledger.total_supply(token), 70);
        assert!(ledger.burn(token, addr(2), 71).is_err());
    }
}
