//! Big integer operations for high-precision math
//!
//! Base-unit amounts are 18-decimal integers, so `amount * WAD` routinely
//! exceeds `u128`. This module provides the 256-bit intermediate needed to
//! compute `a * b / c` exactly.

use crate::errors::{CoreError, CoreResult};

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round down (towards zero)
    Down,
    /// Round up (away from zero)
    Up,
}

/// 256-bit unsigned integer for intermediate calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct U256 {
    /// Low 128 bits
    pub lo: u128,
    /// High 128 bits
    pub hi: u128,
}

impl U256 {
    pub const fn new(lo: u128, hi: u128) -> Self {
        Self { lo, hi }
    }

    pub const fn from_u128(value: u128) -> Self {
        Self { lo: value, hi: 0 }
    }

    /// Convert to u128, returning None if overflow
    pub fn to_u128(&self) -> Option<u128> {
        if self.hi == 0 {
            Some(self.lo)
        } else {
            None
        }
    }

    /// Add a u128, returning None on overflow
    pub fn checked_add_u128(&self, value: u128) -> Option<U256> {
        let (lo, carry) = self.lo.overflowing_add(value);
        let hi = self.hi.checked_add(carry as u128)?;
        Some(U256::new(lo, hi))
    }

    fn bit(&self, index: u32) -> u128 {
        if index >= 128 {
            (self.hi >> (index - 128)) & 1
        } else {
            (self.lo >> index) & 1
        }
    }

    fn set_bit(&mut self, index: u32) {
        if index >= 128 {
            self.hi |= 1 << (index - 128);
        } else {
            self.lo |= 1 << index;
        }
    }

    /// Divide by a u128, returning (quotient, remainder)
    pub fn div_rem_u128(&self, divisor: u128) -> CoreResult<(U256, u128)> {
        if divisor == 0 {
            return Err(CoreError::DivisionByZero);
        }

        // Fast path: dividend fits in u128
        if self.hi == 0 {
            return Ok((U256::from_u128(self.lo / divisor), self.lo % divisor));
        }

        // Binary long division; `overflow` holds the bit shifted out of the
        // remainder, in which case the true remainder already exceeds divisor
        let mut quotient = U256::default();
        let mut remainder: u128 = 0;
        for index in (0..256).rev() {
            let overflow = remainder >> 127;
            remainder = (remainder << 1) | self.bit(index);
            if overflow == 1 || remainder >= divisor {
                remainder = remainder.wrapping_sub(divisor);
                quotient.set_bit(index);
            }
        }

        Ok((quotient, remainder))
    }
}

/// Multiply two u128 values into a full 256-bit product
pub fn mul_u128_to_u256(a: u128, b: u128) -> U256 {
    let a_lo = a as u64 as u128;
    let a_hi = a >> 64;
    let b_lo = b as u64 as u128;
    let b_hi = b >> 64;

    let lo_lo = a_lo * b_lo;
    let lo_hi = a_lo * b_hi;
    let hi_lo = a_hi * b_lo;
    let hi_hi = a_hi * b_hi;

    // Cross products may carry past 2^128 before shifting
    let (mid, mid_carry) = lo_hi.overflowing_add(hi_lo);
    let (lo, lo_carry) = lo_lo.overflowing_add(mid << 64);
    let hi = hi_hi + (mid >> 64) + ((mid_carry as u128) << 64) + lo_carry as u128;

    U256::new(lo, hi)
}

/// Multiply two u128 values and divide by a third with specified rounding
/// result = (a * b) / denominator
pub fn mul_div_u128(a: u128, b: u128, denominator: u128, rounding: Rounding) -> CoreResult<u128> {
    if denominator == 0 {
        return Err(CoreError::DivisionByZero);
    }

    let product = mul_u128_to_u256(a, b);
    let (mut quotient, remainder) = product.div_rem_u128(denominator)?;

    if rounding == Rounding::Up && remainder != 0 {
        quotient = quotient
            .checked_add_u128(1)
            .ok_or(CoreError::MulDivOverflow)?;
    }

    quotient.to_u128().ok_or(CoreError::MulDivOverflow)
}
