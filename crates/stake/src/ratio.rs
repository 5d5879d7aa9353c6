//! A small exact-rational helper for splitting token amounts by a fixed
//! proportion (service charge, validator reward ratio, slash fraction)
//! without pulling in a floating-point dependency for money math.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A fraction `numerator / denominator` in `[0, 1]`, used everywhere a
/// spec constant names a "ratio" or "fraction" of a token amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    pub const ZERO: Ratio = Ratio {
        numerator: 0,
        denominator: 1,
    };
    pub const ONE: Ratio = Ratio {
        numerator: 1,
        denominator: 1,
    };

    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator: denominator.max(1),
        }
    }

    /// Applies this ratio to `amount`, rounding down. Returns `None` on
    /// overflow of the widened intermediate product.
    pub fn apply(&self, amount: u128) -> Option<u128> {
        amount
            .checked_mul(self.numerator as u128)?
            .checked_div(self.denominator as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_of_even_amount_divides_exactly() {
        assert_eq!(Ratio::new(1, 2).apply(100), Some(50));
    }

    #[test]
    fn rounds_down_on_fractional_result() {
        assert_eq!(Ratio::new(1, 3).apply(100), Some(33));
    }

    #[test]
    fn one_is_identity() {
        assert_eq!(Ratio::ONE.apply(12345), Some(12345));
    }
}
