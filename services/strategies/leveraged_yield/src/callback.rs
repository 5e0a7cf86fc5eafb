//! Flash-loan callback state machine
//!
//! ```text
//! Idle ──request──▶ AwaitingCallback ──enter──▶ Executing ──repaid──▶ Repaid ─┐
//!   ▲                      │                        │                         │
//!   │                      └────────── error ───────┴──────▶ Reverted ────────┤
//!   └──────────────────────────────── settle ─────────────────────────────────┘
//! ```
//!
//! Single flight: a second request while not `Idle` is refused, and a
//! callback is only honoured from the vault, while `AwaitingCallback`, for
//! exactly the loan that was requested.

use crate::error::{Result, StrategyError};
use chain::{Address, Amount};
use protocols::FlashLoanRequest;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackState {
    Idle,
    AwaitingCallback,
    Executing,
    Repaid,
    Reverted,
}

/// Operation carried through the vault to the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackData {
    Deposit { principal: Amount },
    Withdraw { principal: Amount },
    /// Borrow and hand straight back, exercising the vault alone
    RoundTrip,
}

impl CallbackData {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Loan the controller asked the vault for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingLoan {
    asset: Address,
    amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackGuard {
    vault: Address,
    state: CallbackState,
    pending: Option<PendingLoan>,
    last_outcome: Option<CallbackState>,
}

impl CallbackGuard {
    pub fn new(vault: Address) -> Self {
        Self {
            vault,
            state: CallbackState::Idle,
            pending: None,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> CallbackState {
        self.state
    }

    /// Terminal state reached by the most recent operation
    pub fn last_outcome(&self) -> Option<CallbackState> {
        self.last_outcome
    }

    /// `Idle → AwaitingCallback`
    pub fn request(&mut self, asset: Address, amount: Amount) -> Result<()> {
        if self.state != CallbackState::Idle {
            warn!(state = ?self.state, "flash loan requested while another is in flight");
            return Err(StrategyError::OperationInFlight { state: self.state });
        }
        self.pending = Some(PendingLoan { asset, amount });
        self.state = CallbackState::AwaitingCallback;
        debug!(?asset, amount, "awaiting flash loan callback");
        Ok(())
    }

    /// `AwaitingCallback → Executing`, after checking the callback is the one requested
    pub fn enter(&mut self, caller: Address, request: &FlashLoanRequest) -> Result<()> {
        let expected = self.pending.filter(|p| {
            p.asset == request.asset && p.amount == request.amount
        });
        if caller != self.vault || self.state != CallbackState::AwaitingCallback || expected.is_none() {
            warn!(?caller, state = ?self.state, "unauthorized flash loan callback");
            return Err(StrategyError::UnauthorizedCallback {
                caller,
                state: self.state,
            });
        }
        self.state = CallbackState::Executing;
        Ok(())
    }

    /// `Executing → Repaid` once the repayment has been handed back
    pub fn mark_repaid(&mut self) {
        if self.state == CallbackState::Executing {
            self.state = CallbackState::Repaid;
        }
    }

    /// Close out the operation and return to `Idle`. Anything short of a
    /// successful repayment ends as `Reverted`.
    pub fn settle(&mut self, succeeded: bool) -> CallbackState {
        let terminal = match self.state {
            CallbackState::Idle => return CallbackState::Idle,
            CallbackState::Repaid if succeeded => CallbackState::Repaid,
            _ => CallbackState::Reverted,
        };
        debug!(?terminal, "flash loan operation settled");
        self.last_outcome = Some(terminal);
        self.state = CallbackState::Idle;
        self.pending = None;
        terminal
    }
}
