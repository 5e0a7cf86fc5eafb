//! Aggregate host state handed to every operation

use crate::clock::BlockClock;
use crate::errors::ChainError;
use crate::events::EventLog;
use crate::ledger::TokenLedger;
use crate::native::{NativeBalances, NativeReceiver};
use crate::types::{Address, Amount};
use serde::Serialize;

/// Everything a unit of execution can touch besides collaborator internals
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainState {
    pub tokens: TokenLedger,
    pub native: NativeBalances,
    pub clock: BlockClock,
    pub events: EventLog,
}

impl ChainState {
    pub fn new(clock: BlockClock) -> Self {
        Self {
            clock,
            ..Default::default()
        }
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> Amount {
        self.tokens.balance_of(token, holder)
    }

    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), ChainError> {
        self.tokens.transfer(token, from, to, amount)
    }

    /// Emit an event stamped with the current block
    pub fn emit<T: Serialize>(
        &mut self,
        emitter: Address,
        name: &'static str,
        payload: &T,
    ) -> Result<(), ChainError> {
        let block = self.clock.number;
        self.events.emit(emitter, name, payload, block)
    }

    /// Bare native-currency transfer with no accompanying call
    pub fn send_native<R: NativeReceiver + ?Sized>(
        &mut self,
        from: Address,
        receiver: &mut R,
        value: Amount,
    ) -> Result<(), ChainError> {
        self.native.send(from, receiver, value)
    }

    pub fn mine(&mut self, blocks: u64, interval_secs: u64) {
        self.clock.mine(blocks, interval_secs);
    }
}
