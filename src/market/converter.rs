//! Complementary price conversion via implied probability.
//!
//! For a two-outcome market without overround, `1/a + 1/b = 1`. Conversions
//! never fail: sub-floor inputs are clamped, and a complement whose implied
//! probability is vanishingly small saturates at the ceiling.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::trace;

use super::types::{clamp_price, PricePoint, PRICE_FLOOR};

/// Default price ceiling for a saturated complement.
pub const DEFAULT_PRICE_CEILING: Decimal = dec!(25);

/// Default implied-probability cut-off below which the complement saturates.
pub const DEFAULT_DEGENERATE_EPSILON: Decimal = dec!(0.001);

/// Converts one side's price to the other side's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceConverter {
    ceiling: Decimal,
    epsilon: Decimal,
}

impl Default for PriceConverter {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_CEILING, DEFAULT_DEGENERATE_EPSILON)
    }
}

impl PriceConverter {
    /// Create a converter with the given ceiling and degenerate cut-off.
    ///
    /// A ceiling below the floor is raised to the floor.
    pub fn new(ceiling: Decimal, epsilon: Decimal) -> Self {
        Self {
            ceiling: ceiling.max(PRICE_FLOOR),
            epsilon: epsilon.max(Decimal::ZERO),
        }
    }

    /// Saturation value returned for degenerate conversions.
    pub fn ceiling(&self) -> Decimal {
        self.ceiling
    }

    /// Price of the complementary outcome, bounded to `[floor, ceiling]`.
    pub fn complement(&self, price: Decimal) -> Decimal {
        let price = clamp_price(price);

        let Some(implied) = Decimal::ONE.checked_div(price) else {
            return self.ceiling;
        };
        let other = Decimal::ONE - implied;

        if other <= self.epsilon {
            trace!(price = %price, "complement saturated at ceiling");
            return self.ceiling;
        }

        match Decimal::ONE.checked_div(other) {
            Some(value) => value.min(self.ceiling).max(PRICE_FLOOR),
            None => self.ceiling,
        }
    }

    /// Side B (Over) price implied by a side A (Under) price.
    pub fn side_b_from_side_a(&self, side_a: Decimal) -> Decimal {
        self.complement(side_a)
    }

    /// Side A (Under) price implied by a side B (Over) price.
    pub fn side_a_from_side_b(&self, side_b: Decimal) -> Decimal {
        self.complement(side_b)
    }

    /// Build a full price point from a side A price.
    pub fn point(&self, minute: u32, side_a: Decimal) -> PricePoint {
        let side_a = clamp_price(side_a);
        PricePoint::new(minute, side_a, self.side_b_from_side_a(side_a))
    }
}
