//! Monetary amounts
//!
//! Balances and transfer amounts are decimals held at minor-unit precision
//! (two decimal places). Inputs with more precision are rejected rather than
//! rounded.

use rust_decimal::Decimal;

use super::result::{Error, Result};

/// Decimal places kept for every stored amount
pub const SCALE: u32 = 2;

/// Largest magnitude a DECIMAL(18,2) column holds: 9999999999999999.99
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, SCALE);

/// Reject an amount the store cannot hold
pub fn within_limit(amount: Decimal) -> Result<Decimal> {
    if amount.abs() > MAX_AMOUNT {
        return Err(Error::InvalidAmount(format!(
            "{} exceeds the maximum amount {}",
            amount, MAX_AMOUNT
        )));
    }
    Ok(amount)
}

/// Bring an amount to the ledger scale, rejecting sub-cent precision and
/// amounts beyond [`MAX_AMOUNT`]
pub fn to_ledger_scale(amount: Decimal) -> Result<Decimal> {
    within_limit(amount)?;
    if amount.normalize().scale() > SCALE {
        return Err(Error::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, SCALE
        )));
    }
    let mut scaled = amount;
    scaled.rescale(SCALE);
    Ok(scaled)
}

/// Validate a transfer amount (strictly positive)
pub fn positive_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(
            "Transfer amount must be positive".to_string(),
        ));
    }
    to_ledger_scale(amount)
}

/// Validate a balance (zero or more)
pub fn non_negative_amount(amount: Decimal) -> Result<Decimal> {
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount("Amount must be >= 0".to_string()));
    }
    to_ledger_scale(amount)
}
