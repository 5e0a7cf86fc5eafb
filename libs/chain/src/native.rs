//! Native currency balances and the receive hook

use crate::errors::ChainError;
use crate::types::{Address, Amount};
use std::collections::BTreeMap;
use tracing::warn;

/// Implemented by contracts that may be sent native currency without a call
pub trait NativeReceiver {
    fn address(&self) -> Address;

    /// Accept or reject a bare value transfer
    fn receive_native(&mut self, sender: Address, value: Amount) -> Result<(), ChainError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeBalances {
    balances: BTreeMap<Address, Amount>,
}

impl NativeBalances {
    pub fn balance_of(&self, holder: Address) -> Amount {
        self.balances.get(&holder).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, holder: Address, value: Amount) -> Result<(), ChainError> {
        let balance = self
            .balance_of(holder)
            .checked_add(value)
            .ok_or(ChainError::Overflow { context: "native credit" })?;
        self.balances.insert(holder, balance);
        Ok(())
    }

    /// Send `value` from `from` to a contract. Balances move only if the
    /// receiver accepts.
    pub fn send<R: NativeReceiver + ?Sized>(
        &mut self,
        from: Address,
        receiver: &mut R,
        value: Amount,
    ) -> Result<(), ChainError> {
        let available = self.balance_of(from);
        let remaining = available
            .checked_sub(value)
            .ok_or(ChainError::InsufficientNativeBalance {
                holder: from,
                needed: value,
                available,
            })?;

        if let Err(e) = receiver.receive_native(from, value) {
            warn!(sender = ?from, recipient = ?receiver.address(), value, "native transfer rejected");
            return Err(e);
        }

        self.balances.insert(from, remaining);
        self.credit(receiver.address(), value)
    }
}
