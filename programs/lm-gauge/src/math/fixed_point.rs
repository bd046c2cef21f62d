use solana_program::program_error::ProgramError;

use crate::{constants::WAD, error::GaugeError, math::u256::U256};

/// floor(a * b / denominator) with a 256-bit intermediate product
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, ProgramError> {
    if denominator == 0 {
        return Err(GaugeError::ArithmeticOverflow.into());
    }
    match a.checked_mul(b) {
        Some(product) => Ok(product / denominator),
        None => U256::mul_u128(a, b)
            .div_u128(denominator)
            .ok_or_else(|| GaugeError::ArithmeticOverflow.into()),
    }
}

/// a * b / 1e18
pub fn wad_mul(a: u128, b: u128) -> Result<u128, ProgramError> {
    mul_div(a, b, WAD)
}

/// a * percent / 100
pub fn percent_of(a: u128, percent: u8) -> Result<u128, ProgramError> {
    mul_div(a, percent as u128, 100)
}

pub fn checked_add(a: u128, b: u128) -> Result<u128, ProgramError> {
    a.checked_add(b)
        .ok_or_else(|| GaugeError::ArithmeticOverflow.into())
}

/// `base + new - old`, clamped at zero instead of underflowing.
///
/// Used for running totals that are maintained by deltas, where rounding in
/// earlier updates can leave the total a few units short of a later removal.
pub fn apply_delta(base: u128, new: u128, old: u128) -> u128 {
    if new >= old {
        base.saturating_add(new - old)
    } else {
        base.saturating_sub(old - new)
    }
}
