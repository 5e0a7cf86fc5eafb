//! Flash-loan vault
//!
//! The vault lends `amount` of an asset to a receiver, calls the receiver back
//! within the same unit, and requires its balance to be restored plus fee by
//! the time the callback returns. A shortfall fails the whole unit and the
//! vault restores the chain state it was handed.

use crate::errors::ProtocolError;
use amm::BPS_DENOMINATOR;
use chain::{Address, Amount, ChainState, Checkpoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Terms of one in-flight loan, handed to the receiver and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashLoanRequest {
    pub asset: Address,
    pub amount: Amount,
    pub fee: Amount,
    /// `amount + fee`
    pub required_repayment: Amount,
}

impl FlashLoanRequest {
    pub fn new(asset: Address, amount: Amount, fee: Amount) -> Result<Self, ProtocolError> {
        let required_repayment = amount.checked_add(fee).ok_or(chain::ChainError::Overflow {
            context: "flash loan repayment",
        })?;
        Ok(Self {
            asset,
            amount,
            fee,
            required_repayment,
        })
    }
}

/// Contract able to accept a flash loan callback
pub trait FlashLoanReceiver {
    type Error: From<ProtocolError>;

    fn address(&self) -> Address;

    /// Called by the vault after the borrowed funds have been transferred.
    /// `caller` is the vault's own address.
    fn receive_flash_loan(
        &mut self,
        chain: &mut ChainState,
        caller: Address,
        request: &FlashLoanRequest,
        data: &[u8],
    ) -> Result<(), Self::Error>;
}

pub trait FlashLoanVault {
    fn address(&self) -> Address;

    fn flash_fee(&self, asset: Address, amount: Amount) -> Result<Amount, ProtocolError>;

    fn max_flash_loan(&self, chain: &ChainState, asset: Address) -> Amount;

    /// Lend `amount` of `asset` to `receiver` for the duration of its callback
    fn flash_loan<R: FlashLoanReceiver>(
        &mut self,
        chain: &mut ChainState,
        receiver: &mut R,
        asset: Address,
        amount: Amount,
        data: &[u8],
    ) -> Result<FlashLoanRequest, R::Error>;
}

/// Balancer-style vault holding liquidity in the chain ledger under its own address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryVault {
    address: Address,
    fee_bps: u32,
    loans_served: u64,
    fees_collected: BTreeMap<Address, Amount>,
}

impl InMemoryVault {
    pub fn new(address: Address, fee_bps: u32) -> Self {
        Self {
            address,
            fee_bps,
            loans_served: 0,
            fees_collected: BTreeMap::new(),
        }
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }

    pub fn loans_served(&self) -> u64 {
        self.loans_served
    }

    pub fn fees_collected(&self, asset: Address) -> Amount {
        self.fees_collected.get(&asset).copied().unwrap_or(0)
    }

    fn execute<R: FlashLoanReceiver>(
        &mut self,
        chain: &mut ChainState,
        receiver: &mut R,
        asset: Address,
        amount: Amount,
        data: &[u8],
    ) -> Result<FlashLoanRequest, R::Error> {
        if amount == 0 {
            return Err(ProtocolError::ZeroAmount.into());
        }

        let balance_before = chain.balance_of(asset, self.address);
        if amount > balance_before {
            return Err(ProtocolError::InsufficientLiquidity {
                asset,
                requested: amount,
                available: balance_before,
            }
            .into());
        }

        let fee = self.flash_fee(asset, amount)?;
        let request = FlashLoanRequest::new(asset, amount, fee)?;

        chain
            .transfer(asset, self.address, receiver.address(), amount)
            .map_err(ProtocolError::from)?;
        debug!(?asset, amount, fee, receiver = ?receiver.address(), "flash loan disbursed");

        receiver.receive_flash_loan(chain, self.address, &request, data)?;

        let balance_after = chain.balance_of(asset, self.address);
        let lent_out_balance = balance_before - amount;
        let repaid = balance_after.saturating_sub(lent_out_balance);
        if repaid < request.required_repayment {
            warn!(
                ?asset,
                required = request.required_repayment,
                repaid,
                "flash loan not repaid"
            );
            return Err(ProtocolError::InsufficientRepayment {
                asset,
                required: request.required_repayment,
                repaid,
            }
            .into());
        }

        self.loans_served += 1;
        let collected = self.fees_collected.entry(asset).or_insert(0);
        *collected = collected.saturating_add(repaid - amount);
        info!(?asset, amount, fee, "flash loan repaid");
        Ok(request)
    }
}

impl FlashLoanVault for InMemoryVault {
    fn address(&self) -> Address {
        self.address
    }

    /// Fee rounded up so fractional fees are never waived
    fn flash_fee(&self, _asset: Address, amount: Amount) -> Result<Amount, ProtocolError> {
        let scaled = amount
            .checked_mul(Amount::from(self.fee_bps))
            .ok_or(chain::ChainError::Overflow { context: "flash fee" })?;
        let denominator = Amount::from(BPS_DENOMINATOR);
        Ok(scaled.div_ceil(denominator))
    }

    fn max_flash_loan(&self, chain: &ChainState, asset: Address) -> Amount {
        chain.balance_of(asset, self.address)
    }

    fn flash_loan<R: FlashLoanReceiver>(
        &mut self,
        chain: &mut ChainState,
        receiver: &mut R,
        asset: Address,
        amount: Amount,
        data: &[u8],
    ) -> Result<FlashLoanRequest, R::Error> {
        let chain_checkpoint = Checkpoint::take(chain);
        let vault_checkpoint = Checkpoint::take(self);

        match self.execute(chain, receiver, asset, amount, data) {
            Ok(request) => Ok(request),
            Err(e) => {
                chain_checkpoint.restore(chain);
                vault_checkpoint.restore(self);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> Address {
        Address::repeat_byte(0x01)
    }

    fn vault_address() -> Address {
        Address::repeat_byte(0xBA)
    }

    /// Receiver that returns `repay` of the borrowed asset, optionally topped up from its own funds
    struct Borrower {
        address: Address,
        repay: Amount,
        seen: Vec<FlashLoanRequest>,
    }

    impl FlashLoanReceiver for Borrower {
        type Error = ProtocolError;

        fn address(&self) -> Address {
            self.address
        }

        fn receive_flash_loan(
            &mut self,
            chain: &mut ChainState,
            caller: Address,
            request: &FlashLoanRequest,
            _data: &[u8],
        ) -> Result<(), ProtocolError> {
            assert_eq!(caller, vault_address());
            self.seen.push(*request);
            chain.transfer(request.asset, self.address, caller, self.repay)?;
            Ok(())
        }
    }

    fn setup(fee_bps: u32) -> (ChainState, InMemoryVault, Borrower) {
        let mut chain = ChainState::default();
        chain.tokens.mint(usdc(), vault_address(), 1_000_000).unwrap();
        let borrower = Borrower {
            address: Address::repeat_byte(0x0B),
            repay: 0,
            seen: Vec::new(),
        };
        chain.tokens.mint(usdc(), borrower.address, 1_000).unwrap();
        (chain, InMemoryVault::new(vault_address(), fee_bps), borrower)
    }

    #[test]
    fn test_exact_repayment_succeeds() {
        let (mut chain, mut vault, mut borrower) = setup(0);
        borrower.repay = 500_000;

        let request = vault
            .flash_loan(&mut chain, &mut borrower, usdc(), 500_000, &[])
            .unwrap();

        assert_eq!(request.required_repayment, 500_000);
        assert_eq!(chain.balance_of(usdc(), vault_address()), 1_000_000);
        assert_eq!(vault.loans_served(), 1);
        assert_eq!(borrower.seen.len(), 1);
    }

    #[test]
    fn test_fee_is_charged_and_collected() {
        let (mut chain, mut vault, mut borrower) = setup(9);
        borrower.repay = 100_090;

        let request = vault
            .flash_loan(&mut chain, &mut borrower, usdc(), 100_000, &[])
            .unwrap();

        assert_eq!(request.fee, 90);
        assert_eq!(vault.fees_collected(usdc()), 90);
        assert_eq!(chain.balance_of(usdc(), vault_address()), 1_000_090);
    }

    #[test]
    fn test_fee_rounds_up() {
        let vault = InMemoryVault::new(vault_address(), 9);
        assert_eq!(vault.flash_fee(usdc(), 1).unwrap(), 1);
        assert_eq!(vault.flash_fee(usdc(), 0).unwrap(), 0);
    }

    #[test]
    fn test_short_repayment_reverts_everything() {
        let (mut chain, mut vault, mut borrower) = setup(0);
        borrower.repay = 499_999;
        let chain_before = chain.clone();
        let vault_before = vault.clone();

        let err = vault
            .flash_loan(&mut chain, &mut borrower, usdc(), 500_000, &[])
            .unwrap_err();

        assert_eq!(
            err,
            ProtocolError::InsufficientRepayment {
                asset: usdc(),
                required: 500_000,
                repaid: 499_999,
            }
        );
        assert_eq!(chain, chain_before);
        assert_eq!(vault, vault_before);
    }

    #[test]
    fn test_loan_above_liquidity_rejected() {
        let (mut chain, mut vault, mut borrower) = setup(0);
        let err = vault
            .flash_loan(&mut chain, &mut borrower, usdc(), 1_000_001, &[])
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InsufficientLiquidity { .. }));
        assert!(borrower.seen.is_empty());
    }

    #[test]
    fn test_zero_loan_rejected() {
        let (mut chain, mut vault, mut borrower) = setup(0);
        let err = vault
            .flash_loan(&mut chain, &mut borrower, usdc(), 0, &[])
            .unwrap_err();
        assert_eq!(err, ProtocolError::ZeroAmount);
    }
}
