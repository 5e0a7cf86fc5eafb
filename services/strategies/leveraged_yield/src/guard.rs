//! Safety guard: owner gate and native-currency rejection

use crate::error::{Result, StrategyError};
use chain::{Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identity allowed to operate the strategy. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerConfig {
    pub owner: Address,
}

impl OwnerConfig {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            warn!(?caller, owner = ?self.owner, "rejected non-owner call");
            return Err(StrategyError::NotOwner { caller });
        }
        Ok(())
    }
}

/// The strategy never holds native currency; every bare transfer fails
pub fn reject_native(sender: Address, value: Amount) -> StrategyError {
    warn!(?sender, value, "native currency transfer rejected");
    StrategyError::NativeTransferRejected { sender, value }
}
