//! 256-bit unsigned integer for the reward integrals and for `a * b / c`
//! products that overflow `u128` before the division.
//!
//! Reward per working unit grows as `rate / working_supply`, so a dust
//! working supply pushes the integrals past `u128` within hours.

use borsh::{BorshDeserialize, BorshSerialize};

/// 256-bit unsigned integer represented as two u128 values
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U256 {
    /// Low 128 bits
    pub lo: u128,
    /// High 128 bits
    pub hi: u128,
}

const LOW_MASK: u128 = u64::MAX as u128;

impl U256 {
    pub const ZERO: Self = Self { lo: 0, hi: 0 };
    pub const MAX: Self = Self {
        lo: u128::MAX,
        hi: u128::MAX,
    };

    pub const fn from_u128(val: u128) -> Self {
        Self { lo: val, hi: 0 }
    }

    pub const fn new(hi: u128, lo: u128) -> Self {
        Self { lo, hi }
    }

    pub fn is_zero(&self) -> bool {
        self.lo == 0 && self.hi == 0
    }

    /// Value as u128, `None` when the high word is set
    pub fn to_u128(&self) -> Option<u128> {
        if self.hi == 0 {
            Some(self.lo)
        } else {
            None
        }
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let (lo, carry) = self.lo.overflowing_add(other.lo);
        let hi = self.hi.checked_add(other.hi)?.checked_add(carry as u128)?;
        Some(Self { lo, hi })
    }

    pub fn saturating_add(&self, other: &Self) -> Self {
        self.checked_add(other).unwrap_or(Self::MAX)
    }

    /// `self - other`, zero when `other` is larger
    pub fn saturating_sub(&self, other: &Self) -> Self {
        if other >= self {
            return Self::ZERO;
        }
        let (lo, borrow) = self.lo.overflowing_sub(other.lo);
        Self {
            lo,
            hi: self.hi - other.hi - borrow as u128,
        }
    }

    /// Full product of two u128 values
    pub fn mul_u128(a: u128, b: u128) -> Self {
        let (a0, a1) = (a & LOW_MASK, a >> 64);
        let (b0, b1) = (b & LOW_MASK, b >> 64);

        let p00 = a0 * b0;
        let p01 = a0 * b1;
        let p10 = a1 * b0;
        let p11 = a1 * b1;

        // At most 3 * (2^64 - 1), fits comfortably
        let mid = (p00 >> 64) + (p01 & LOW_MASK) + (p10 & LOW_MASK);

        Self {
            lo: (p00 & LOW_MASK) | (mid << 64),
            hi: p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64),
        }
    }

    /// Floor division by a u128 divisor. `None` on a zero divisor or when the
    /// quotient does not fit in u128.
    pub fn div_u128(&self, divisor: u128) -> Option<u128> {
        if divisor == 0 || self.hi >= divisor {
            return None;
        }
        Some(div_rem_wide(self.hi, self.lo, divisor).0)
    }

    /// floor(self * b / divisor) over a 384-bit intermediate. `None` on a zero
    /// divisor or when the quotient does not fit in 256 bits.
    pub fn mul_div(&self, b: u128, divisor: u128) -> Option<Self> {
        if divisor == 0 {
            return None;
        }
        let low = Self::mul_u128(self.lo, b);
        let high = Self::mul_u128(self.hi, b);

        // limbs of the product, least significant first
        let (mid, carry) = low.hi.overflowing_add(high.lo);
        let top = high.hi + carry as u128;

        if top >= divisor {
            return None;
        }
        let (q_hi, rem) = div_rem_wide(top, mid, divisor);
        let (q_lo, _) = div_rem_wide(rem, low.lo, divisor);
        Some(Self { lo: q_lo, hi: q_hi })
    }
}

/// `(hi * 2^128 + lo) / divisor` and its remainder. Requires `hi < divisor`.
fn div_rem_wide(hi: u128, lo: u128, divisor: u128) -> (u128, u128) {
    if hi == 0 {
        return (lo / divisor, lo % divisor);
    }

    // hi < divisor, so it is already a valid partial remainder
    let mut remainder = hi;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let carry = remainder >> 127;
        remainder = (remainder << 1) | ((lo >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || remainder >= divisor {
            remainder = remainder.wrapping_sub(divisor);
            quotient |= 1;
        }
    }
    (quotient, remainder)
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.hi.cmp(&other.hi) {
            std::cmp::Ordering::Equal => self.lo.cmp(&other.lo),
            other => other,
        }
    }
}
