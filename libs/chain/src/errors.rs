//! Errors raised by the execution substrate

use crate::types::{Address, Amount};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Insufficient balance of {token:?} for {holder:?}: needed {needed}, available {available}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("Insufficient native balance for {holder:?}: needed {needed}, available {available}")]
    InsufficientNativeBalance {
        holder: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("Native transfer to {recipient:?} rejected: {reason}")]
    NativeTransferRejected { recipient: Address, reason: String },

    #[error("Arithmetic overflow in {context}")]
    Overflow { context: &'static str },

    #[error("Value {value} cannot be represented as a token amount")]
    DecimalConversion { value: String },

    #[error("Event payload could not be encoded: {0}")]
    EventEncoding(String),
}
