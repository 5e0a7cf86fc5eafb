//! Strategy error taxonomy
//!
//! Every variant aborts the whole unit of work it is raised in; the caller
//! observes the public call as failed with nothing applied.

use chain::{Address, Amount, ChainError};
use protocols::ProtocolError;
use state_position::StateError;
use thiserror::Error;

use crate::callback::CallbackState;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StrategyError {
    #[error("Unauthorized flash loan callback from {caller:?} while {state:?}")]
    UnauthorizedCallback {
        caller: Address,
        state: CallbackState,
    },

    #[error("Flash loan of {asset:?} cannot be repaid: required {required}, available {available}")]
    InsufficientRepayment {
        asset: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Native currency transfer of {value} from {sender:?} rejected")]
    NativeTransferRejected { sender: Address, value: Amount },

    #[error("Caller {caller:?} is not the owner")]
    NotOwner { caller: Address },

    #[error("Another flash loan operation is in flight ({state:?})")]
    OperationInFlight { state: CallbackState },

    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Withdrawal of {requested} exceeds deployed principal {principal}")]
    WithdrawExceedsPrincipal { requested: Amount, principal: Amount },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Callback data could not be decoded: {0}")]
    CallbackData(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Protocol(ProtocolError),

    #[error(transparent)]
    State(#[from] StateError),
}

pub type Result<T> = std::result::Result<T, StrategyError>;

/// The vault's repayment shortfall surfaces as the strategy's own condition
impl From<ProtocolError> for StrategyError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::InsufficientRepayment {
                asset,
                required,
                repaid,
            } => StrategyError::InsufficientRepayment {
                asset,
                required,
                available: repaid,
            },
            ProtocolError::Chain(chain) => StrategyError::Chain(chain),
            other => StrategyError::Protocol(other),
        }
    }
}

impl From<bincode::Error> for StrategyError {
    fn from(e: bincode::Error) -> Self {
        StrategyError::CallbackData(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_shortfall_maps_to_insufficient_repayment() {
        let asset = Address::repeat_byte(1);
        let err: StrategyError = ProtocolError::InsufficientRepayment {
            asset,
            required: 10,
            repaid: 9,
        }
        .into();
        assert_eq!(
            err,
            StrategyError::InsufficientRepayment {
                asset,
                required: 10,
                available: 9,
            }
        );
    }

    #[test]
    fn test_nested_chain_error_is_unwrapped() {
        let chain_err = ChainError::Overflow { context: "test" };
        let err: StrategyError = ProtocolError::Chain(chain_err.clone()).into();
        assert_eq!(err, StrategyError::Chain(chain_err));
    }
}
