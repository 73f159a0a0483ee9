//! Expected full-time price for side A, by magnitude band.
//!
//! The band table is tuning data, not a law: each band is a straight line
//! anchored at its lower threshold. The table is validated so that a larger
//! opening price never maps to a smaller full-time price.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::market::{clamp_price, PRICE_FLOOR};

/// One magnitude band: `max(base, base + (price - lower) * slope)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalBand {
    /// Opening prices at or above this threshold use this band.
    pub lower: Decimal,
    /// Full-time price at the threshold; also the band's floor.
    pub base: Decimal,
    /// Full-time price gained per unit of opening price above the threshold.
    pub slope: Decimal,
}

impl FinalBand {
    /// Create a band.
    pub const fn new(lower: Decimal, base: Decimal, slope: Decimal) -> Self {
        Self { lower, base, slope }
    }

    /// Evaluate the band's line at an opening price.
    pub fn value_at(&self, initial: Decimal) -> Decimal {
        (self.base + (initial - self.lower) * self.slope).max(self.base)
    }
}

static DEFAULT_BANDS: Lazy<Vec<FinalBand>> = Lazy::new(|| {
    vec![
        FinalBand::new(dec!(40), dec!(1.48), dec!(0.03)),
        FinalBand::new(dec!(35), dec!(1.45), dec!(0.006)),
        FinalBand::new(dec!(25), dec!(1.30), dec!(0.015)),
        FinalBand::new(dec!(19), dec!(1.252), dec!(0.008)),
        FinalBand::new(dec!(10), dec!(1.144), dec!(0.012)),
        FinalBand::new(dec!(5), dec!(1.09), dec!(0.0108)),
        FinalBand::new(dec!(3), dec!(1.05), dec!(0.02)),
        FinalBand::new(PRICE_FLOOR, PRICE_FLOOR, dec!(0.0201)),
    ]
});

/// The built-in band table, highest threshold first.
pub fn default_bands() -> &'static [FinalBand] {
    &DEFAULT_BANDS
}

/// Maps an opening side A price to its expected full-time price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalPriceEstimator {
    /// Sorted by `lower`, descending.
    bands: Vec<FinalBand>,
}

impl Default for FinalPriceEstimator {
    fn default() -> Self {
        Self {
            bands: DEFAULT_BANDS.clone(),
        }
    }
}

impl FinalPriceEstimator {
    /// Build an estimator from a band table, rejecting tables that are not
    /// monotone.
    pub fn new(mut bands: Vec<FinalBand>) -> Result<Self, ValidationError> {
        if bands.is_empty() {
            return Err(ValidationError::InvalidSettings(
                "at least one final-price band is required".to_string(),
            ));
        }

        bands.sort_by(|a, b| b.lower.cmp(&a.lower));

        for band in &bands {
            if band.slope < Decimal::ZERO {
                return Err(ValidationError::NonMonotoneBands {
                    boundary: band.lower,
                });
            }
        }

        for pair in bands.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            if upper.lower == lower.lower {
                return Err(ValidationError::InvalidSettings(format!(
                    "duplicate final-price band at {}",
                    upper.lower
                )));
            }
            // Approaching the boundary from below must not overshoot it.
            if lower.value_at(upper.lower) > upper.value_at(upper.lower) {
                return Err(ValidationError::NonMonotoneBands {
                    boundary: upper.lower,
                });
            }
        }

        debug!(bands = bands.len(), "final-price band table validated");
        Ok(Self { bands })
    }

    /// Bands in use, highest threshold first.
    pub fn bands(&self) -> &[FinalBand] {
        &self.bands
    }

    /// Expected side A price at full time.
    ///
    /// Never below the price floor and never above the opening price.
    pub fn expected_final(&self, initial_side_a: Decimal) -> Decimal {
        let initial = clamp_price(initial_side_a);

        let band = self
            .bands
            .iter()
            .find(|band| initial >= band.lower)
            .or_else(|| self.bands.last());

        match band {
            Some(band) => band.value_at(initial).max(PRICE_FLOOR).min(initial),
            None => initial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_passes_validation() {
        let estimator = FinalPriceEstimator::new(default_bands().to_vec()).unwrap();
        assert_eq!(estimator, FinalPriceEstimator::default());
    }

    #[test]
    fn top_band_matches_reference_sample() {
        let estimator = FinalPriceEstimator::default();
        assert_eq!(estimator.expected_final(dec!(42)), dec!(1.54));
        assert_eq!(estimator.expected_final(dec!(40)), dec!(1.48));
        assert_eq!(estimator.expected_final(dec!(100)), dec!(3.28));
    }

    #[test]
    fn bands_meet_at_their_boundaries() {
        let estimator = FinalPriceEstimator::default();
        assert_eq!(estimator.expected_final(dec!(35)), dec!(1.45));
        assert_eq!(estimator.expected_final(dec!(25)), dec!(1.30));
        assert_eq!(estimator.expected_final(dec!(19)), dec!(1.252));
        assert_eq!(estimator.expected_final(dec!(10)), dec!(1.144));
        assert_eq!(estimator.expected_final(dec!(5)), dec!(1.09));
        assert_eq!(estimator.expected_final(dec!(3)), dec!(1.05));
    }

    #[test]
    fn estimate_strictly_increases_with_opening_price() {
        let estimator = FinalPriceEstimator::default();
        let mut previous = estimator.expected_final(PRICE_FLOOR);
        let mut price = dec!(1.25);

        while price <= dec!(120) {
            let current = estimator.expected_final(price);
            assert!(current > previous, "not increasing at {price}");
            previous = current;
            price += dec!(0.25);
        }
    }

    #[test]
    fn estimate_is_bounded_by_floor_and_opening_price() {
        let estimator = FinalPriceEstimator::default();
        assert_eq!(estimator.expected_final(dec!(0.5)), PRICE_FLOOR);
        assert_eq!(estimator.expected_final(PRICE_FLOOR), PRICE_FLOOR);
        for price in [dec!(1.02), dec!(1.2), dec!(2), dec!(7.5)] {
            let estimate = estimator.expected_final(price);
            assert!(estimate < price);
            assert!(estimate >= PRICE_FLOOR);
        }
    }

    #[test]
    fn rejects_band_that_overshoots_boundary() {
        let bands = vec![
            FinalBand::new(dec!(40), dec!(1.48), dec!(0.03)),
            FinalBand::new(dec!(35), dec!(1.45), dec!(0.02)),
        ];
        assert_eq!(
            FinalPriceEstimator::new(bands),
            Err(ValidationError::NonMonotoneBands {
                boundary: dec!(40)
            })
        );
    }

    #[test]
    fn rejects_negative_slope_and_empty_table() {
        let bands = vec![FinalBand::new(dec!(1.01), dec!(1.25), dec!(-0.01))];
        assert!(FinalPriceEstimator::new(bands).is_err());
        assert!(FinalPriceEstimator::new(Vec::new()).is_err());
    }

    #[test]
    fn unsorted_table_is_sorted_on_construction() {
        let bands = vec![
            FinalBand::new(dec!(1.01), dec!(1.01), dec!(0.01)),
            FinalBand::new(dec!(10), dec!(1.2), dec!(0.01)),
        ];
        let estimator = FinalPriceEstimator::new(bands).unwrap();
        assert_eq!(estimator.bands()[0].lower, dec!(10));
        assert_eq!(estimator.expected_final(dec!(12)), dec!(1.22));
    }
}
