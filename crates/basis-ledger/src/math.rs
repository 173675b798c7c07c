//! Wide fixed-point arithmetic.
//!
//! Reward math multiplies amounts at 18 decimals by the 1e18 accumulator
//! scale, which leaves `u128` range long before the quotient does. Products
//! are formed in 256 bits and divided back down with a single floor
//! division. The reward-per-share accumulator itself is a [`U256`]: with a
//! small provider power its value legitimately exceeds `u128` even though
//! every amount derived from it fits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unsigned 256-bit integer as high and low 128-bit halves.
///
/// Field order makes the derived ordering numeric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U256 {
    hi: u128,
    lo: u128,
}

/// Error parsing a [`U256`] from decimal text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid 256-bit decimal: {0:?}")]
pub struct ParseU256Error(String);

impl U256 {
    pub const ZERO: Self = Self { hi: 0, lo: 0 };
    pub const MAX: Self = Self {
        hi: u128::MAX,
        lo: u128::MAX,
    };

    /// Full product of two `u128`s. Never overflows.
    pub fn from_product(a: u128, b: u128) -> Self {
        let (hi, lo) = widening_mul(a, b);
        Self { hi, lo }
    }

    pub fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    /// The value as `u128`, or `None` if it does not fit.
    pub fn to_u128(self) -> Option<u128> {
        (self.hi == 0).then_some(self.lo)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let (lo, carry) = self.lo.overflowing_add(rhs.lo);
        let hi = self.hi.checked_add(rhs.hi)?.checked_add(u128::from(carry))?;
        Some(Self { hi, lo })
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let (lo, borrow) = self.lo.overflowing_sub(rhs.lo);
        let hi = self.hi.checked_sub(rhs.hi)?.checked_sub(u128::from(borrow))?;
        Some(Self { hi, lo })
    }

    pub fn checked_mul_u128(self, rhs: u128) -> Option<Self> {
        let (carry, lo) = widening_mul(self.lo, rhs);
        let (overflow, hi) = widening_mul(self.hi, rhs);
        if overflow != 0 {
            return None;
        }
        let hi = hi.checked_add(carry)?;
        Some(Self { hi, lo })
    }

    /// `floor(self / d)`, or `None` if `d == 0`.
    pub fn checked_div_u128(self, d: u128) -> Option<Self> {
        if d == 0 {
            return None;
        }
        Some(self.div_rem(d).0)
    }

    /// Quotient and remainder. `d` must be non-zero.
    fn div_rem(self, d: u128) -> (Self, u128) {
        let hi = self.hi / d;
        let (lo, rem) = div_wide(self.hi % d, self.lo, d);
        (Self { hi, lo }, rem)
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        Self { hi: 0, lo: value }
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 10^19 is the largest power of ten below 2^64.
        const CHUNK: u128 = 10_000_000_000_000_000_000;

        if self.hi == 0 {
            return write!(f, "{}", self.lo);
        }

        let mut chunks = Vec::new();
        let mut rest = *self;
        while !rest.is_zero() {
            let (quotient, digits) = rest.div_rem(CHUNK);
            chunks.push(digits);
            rest = quotient;
        }

        let mut iter = chunks.iter().rev();
        if let Some(first) = iter.next() {
            write!(f, "{first}")?;
        }
        for chunk in iter {
            write!(f, "{chunk:019}")?;
        }
        Ok(())
    }
}

impl FromStr for U256 {
    type Err = ParseU256Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseU256Error(s.to_string()));
        }
        s.chars().try_fold(Self::ZERO, |acc, c| {
            let digit = c.to_digit(10).ok_or_else(|| ParseU256Error(s.to_string()))?;
            acc.checked_mul_u128(10)
                .and_then(|v| v.checked_add(Self::from(u128::from(digit))))
                .ok_or_else(|| ParseU256Error(s.to_string()))
        })
    }
}

impl Serialize for U256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `floor(a * b / d)`, or `None` if `d == 0` or the quotient exceeds `u128`.
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    mul_div_wide(a, b, d)?.to_u128()
}

/// `floor(a * b / d)` kept at full width, or `None` if `d == 0`.
pub fn mul_div_wide(a: u128, b: u128, d: u128) -> Option<U256> {
    U256::from_product(a, b).checked_div_u128(d)
}

/// Restoring long division of `(hi, lo)` by `d`, returning quotient and
/// remainder. Requires `hi < d`, so the quotient fits in 128 bits.
fn div_wide(hi: u128, lo: u128, d: u128) -> (u128, u128) {
    if hi == 0 {
        return (lo / d, lo % d);
    }

    let mut rem = hi;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1u128 << bit;
        }
    }
    (quotient, rem)
}

/// Full 256-bit product of two `u128`s as `(high, low)` halves.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;

    let (a_lo, a_hi) = (a & MASK, a >> 64);
    let (b_lo, b_hi) = (b & MASK, b >> 64);

    let p0 = a_lo * b_lo;
    let p1 = a_lo * b_hi;
    let p2 = a_hi * b_lo;
    let p3 = a_hi * b_hi;

    let mid = (p0 >> 64) + (p1 & MASK) + (p2 & MASK);
    let lo = (p0 & MASK) | (mid << 64);
    let hi = p3 + (p1 >> 64) + (p2 >> 64) + (mid >> 64);

    (hi, lo)
}
