//! Identities and raw token quantities

use crate::errors::ChainError;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// 20-byte account, contract and token identity
pub use ethers_core::types::Address;

/// Raw token quantity in the token's smallest unit (e.g. 1 USDC = 1_000_000)
pub type Amount = u128;

/// Lift a raw amount into exact decimal arithmetic
pub fn amount_to_decimal(amount: Amount) -> Result<Decimal, ChainError> {
    Decimal::from_u128(amount).ok_or(ChainError::DecimalConversion {
        value: amount.to_string(),
    })
}

/// Convert back to a raw amount, rounding down (amounts received)
pub fn decimal_to_amount_floor(value: Decimal) -> Result<Amount, ChainError> {
    if value.is_sign_negative() {
        return Err(ChainError::DecimalConversion {
            value: value.to_string(),
        });
    }
    value.floor().to_u128().ok_or(ChainError::DecimalConversion {
        value: value.to_string(),
    })
}

/// Convert back to a raw amount, rounding up (amounts owed)
pub fn decimal_to_amount_ceil(value: Decimal) -> Result<Amount, ChainError> {
    if value.is_sign_negative() {
        return Err(ChainError::DecimalConversion {
            value: value.to_string(),
        });
    }
    value.ceil().to_u128().ok_or(ChainError::DecimalConversion {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_rounding_direction() {
        let value = Decimal::from_str("10.4").unwrap();
        assert_eq!(decimal_to_amount_floor(value).unwrap(), 10);
        assert_eq!(decimal_to_amount_ceil(value).unwrap(), 11);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(decimal_to_amount_floor(Decimal::NEGATIVE_ONE).is_err());
        assert!(decimal_to_amount_ceil(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_eighteen_decimal_amounts_fit() {
        let amount: Amount = 5_000_000 * 10u128.pow(18);
        let value = amount_to_decimal(amount).unwrap();
        assert_eq!(decimal_to_amount_floor(value).unwrap(), amount);
    }
}
