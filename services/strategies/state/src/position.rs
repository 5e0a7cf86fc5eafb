//! Position Ledger
//!
//! Holds the committed [`StrategyPosition`] and at most one staged copy. All
//! changes go to the stage; `commit` validates the stage and swaps it in,
//! `discard` drops it.

use crate::traits::{StateError, Stateful};
use chain::{Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The strategy's leveraged supply position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyPosition {
    pub owner: Address,
    /// Depositor funds currently deployed
    pub principal: Amount,
    /// Flash loan outstanding; non-zero only inside a callback
    pub borrowed: Amount,
    /// Receipt tokens minted by the lending market for this position
    pub receipt_balance: Amount,
    /// Debt carried in the lending market against the supplied collateral
    pub market_debt: Amount,
}

impl StrategyPosition {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            principal: 0,
            borrowed: 0,
            receipt_balance: 0,
            market_debt: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.principal > 0
    }

    /// Supplied size relative to principal, in basis points
    pub fn leverage_bps(&self) -> Option<u128> {
        if self.principal == 0 {
            return None;
        }
        self.principal
            .checked_add(self.market_debt)
            .and_then(|supplied| supplied.checked_mul(10_000))
            .map(|scaled| scaled / self.principal)
    }
}

/// Individual mutation applied to a staged position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionChange {
    FlashBorrowed { amount: Amount },
    Supplied { principal: Amount, receipt_minted: Amount },
    MarketBorrowed { amount: Amount },
    MarketRepaid { amount: Amount },
    Redeemed { principal: Amount, receipt_burned: Amount },
    FlashRepaid { amount: Amount },
}

impl PositionChange {
    fn name(&self) -> &'static str {
        match self {
            PositionChange::FlashBorrowed { .. } => "flash_borrowed",
            PositionChange::Supplied { .. } => "supplied",
            PositionChange::MarketBorrowed { .. } => "market_borrowed",
            PositionChange::MarketRepaid { .. } => "market_repaid",
            PositionChange::Redeemed { .. } => "redeemed",
            PositionChange::FlashRepaid { .. } => "flash_repaid",
        }
    }
}

fn add(change: &'static str, current: Amount, amount: Amount) -> Result<Amount, StateError> {
    current
        .checked_add(amount)
        .ok_or(StateError::Overflow { change })
}

fn sub(change: &'static str, current: Amount, amount: Amount) -> Result<Amount, StateError> {
    current.checked_sub(amount).ok_or(StateError::Underflow {
        change,
        current,
        amount,
    })
}

impl StrategyPosition {
    fn apply(&mut self, change: PositionChange) -> Result<(), StateError> {
        let name = change.name();
        match change {
            PositionChange::FlashBorrowed { amount } => {
                self.borrowed = add(name, self.borrowed, amount)?;
            }
            PositionChange::Supplied {
                principal,
                receipt_minted,
            } => {
                self.principal = add(name, self.principal, principal)?;
                self.receipt_balance = add(name, self.receipt_balance, receipt_minted)?;
            }
            PositionChange::MarketBorrowed { amount } => {
                self.market_debt = add(name, self.market_debt, amount)?;
            }
            PositionChange::MarketRepaid { amount } => {
                // Interest accrued since the borrow may exceed the recorded debt
                self.market_debt = self.market_debt.saturating_sub(amount);
            }
            PositionChange::Redeemed {
                principal,
                receipt_burned,
            } => {
                self.principal = sub(name, self.principal, principal)?;
                self.receipt_balance = sub(name, self.receipt_balance, receipt_burned)?;
            }
            PositionChange::FlashRepaid { amount } => {
                self.borrowed = sub(name, self.borrowed, amount)?;
            }
        }
        Ok(())
    }

    /// Invariants every committed position must satisfy
    fn validate(&self) -> Result<(), StateError> {
        if self.borrowed != 0 {
            return Err(StateError::ValidationFailed {
                reason: format!("flash loan of {} still outstanding", self.borrowed),
            });
        }
        if self.principal == 0 && (self.receipt_balance != 0 || self.market_debt != 0) {
            return Err(StateError::ValidationFailed {
                reason: format!(
                    "closed position still holds {} receipt and {} debt",
                    self.receipt_balance, self.market_debt
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionLedger {
    committed: StrategyPosition,
    staged: Option<StrategyPosition>,
    revision: u64,
}

impl PositionLedger {
    pub fn new(owner: Address) -> Self {
        Self {
            committed: StrategyPosition::new(owner),
            staged: None,
            revision: 0,
        }
    }

    pub fn committed(&self) -> &StrategyPosition {
        &self.committed
    }

    /// Number of commits applied so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_staging(&self) -> bool {
        self.staged.is_some()
    }

    /// Open a stage initialised from the committed position
    pub fn begin(&mut self) -> Result<(), StateError> {
        if self.staged.is_some() {
            return Err(StateError::StageAlreadyOpen);
        }
        self.staged = Some(self.committed.clone());
        Ok(())
    }

    pub fn staged(&self) -> Result<&StrategyPosition, StateError> {
        self.staged.as_ref().ok_or(StateError::NoStagedUpdate)
    }

    /// Validate and publish the stage
    pub fn commit(&mut self) -> Result<&StrategyPosition, StateError> {
        let staged = self.staged.take().ok_or(StateError::NoStagedUpdate)?;
        if let Err(e) = staged.validate() {
            warn!(error = %e, "staged position rejected");
            return Err(e);
        }
        self.committed = staged;
        self.revision += 1;
        debug!(revision = self.revision, position = ?self.committed, "position committed");
        Ok(&self.committed)
    }

    pub fn discard(&mut self) {
        if self.staged.take().is_some() {
            debug!("staged position discarded");
        }
    }
}

impl Stateful for PositionLedger {
    type Event = PositionChange;
    type Error = StateError;

    /// Changes always land on the stage; there is no direct path to the
    /// committed position.
    fn apply_event(&mut self, event: PositionChange) -> Result<(), StateError> {
        let staged = self.staged.as_mut().ok_or(StateError::NoStagedUpdate)?;
        let mut next = staged.clone();
        next.apply(event)?;
        *staged = next;
        Ok(())
    }

    fn snapshot(&self) -> Vec<u8> {
        bincode::serialize(&(&self.committed, self.revision)).unwrap_or_default()
    }

    fn restore(&mut self, snapshot: &[u8]) -> Result<(), StateError> {
        let (committed, revision): (StrategyPosition, u64) = bincode::deserialize(snapshot)?;
        self.committed = committed;
        self.revision = revision;
        self.staged = None;
        Ok(())
    }
}
