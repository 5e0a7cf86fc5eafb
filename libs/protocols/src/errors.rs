//! Protocol error taxonomy

use chain::{Address, Amount, ChainError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Amount must be non-zero")]
    ZeroAmount,

    #[error("Insufficient liquidity of {asset:?}: requested {requested}, available {available}")]
    InsufficientLiquidity {
        asset: Address,
        requested: Amount,
        available: Amount,
    },

    #[error("Flash loan of {asset:?} not repaid: required {required}, repaid {repaid}")]
    InsufficientRepayment {
        asset: Address,
        required: Amount,
        repaid: Amount,
    },

    #[error("Insufficient collateral for {account:?}: debt would be {debt}, limit {limit}")]
    InsufficientCollateral {
        account: Address,
        debt: Amount,
        limit: Amount,
    },

    #[error("Redeem of {requested} exceeds receipt balance {available} for {account:?}")]
    RedeemExceedsBalance {
        account: Address,
        requested: Amount,
        available: Amount,
    },

    #[error("Repayment of {amount} exceeds outstanding debt {debt} for {account:?}")]
    RepayExceedsDebt {
        account: Address,
        amount: Amount,
        debt: Amount,
    },

    #[error("No pool for {from:?} -> {to:?}")]
    UnknownPool { from: Address, to: Address },

    #[error("Slippage exceeded: minimum {min_out}, quoted {quoted}")]
    SlippageExceeded { min_out: Amount, quoted: Amount },

    #[error("Quote failed: {0}")]
    Quote(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl From<anyhow::Error> for ProtocolError {
    fn from(e: anyhow::Error) -> Self {
        ProtocolError::Quote(e.to_string())
    }
}
