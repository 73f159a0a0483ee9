//! Minute-by-minute projection of the side A / side B price pair.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, instrument};

use crate::curve::{
    default_bands, CurveModel, CurveProfile, FinalBand, FinalPriceEstimator, Interpolation,
    DEFAULT_REPAIR_FACTOR,
};
use crate::error::ValidationError;
use crate::market::{
    clamp_price, PriceConverter, PricePoint, Trajectory, DEFAULT_DEGENERATE_EPSILON,
    DEFAULT_PRICE_CEILING, FIRST_MINUTE, FULL_TIME, PRICE_FLOOR,
};
use crate::metrics;

/// Tuning inputs for a [`ProjectionEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Saturation value for degenerate side B conversions.
    pub price_ceiling: Decimal,
    /// Implied-probability cut-off for the saturation branch.
    pub degenerate_epsilon: Decimal,
    /// Interpolation between checkpoints.
    pub interpolation: Interpolation,
    /// Multiplier for checkpoints that fail to decline.
    pub repair_factor: Decimal,
    /// Final-price band table.
    pub bands: Vec<FinalBand>,
    /// Checkpoint layout.
    pub profile: CurveProfile,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            price_ceiling: DEFAULT_PRICE_CEILING,
            degenerate_epsilon: DEFAULT_DEGENERATE_EPSILON,
            interpolation: Interpolation::default(),
            repair_factor: DEFAULT_REPAIR_FACTOR,
            bands: default_bands().to_vec(),
            profile: CurveProfile::default(),
        }
    }
}

impl EngineSettings {
    /// Check scalar settings are in range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.price_ceiling <= PRICE_FLOOR {
            return Err(ValidationError::InvalidSettings(format!(
                "price ceiling {} must be above the floor {PRICE_FLOOR}",
                self.price_ceiling
            )));
        }
        if self.degenerate_epsilon < Decimal::ZERO || self.degenerate_epsilon >= dec!(0.5) {
            return Err(ValidationError::InvalidSettings(format!(
                "degenerate epsilon {} must be in [0, 0.5)",
                self.degenerate_epsilon
            )));
        }
        if self.repair_factor <= Decimal::ZERO || self.repair_factor >= Decimal::ONE {
            return Err(ValidationError::InvalidSettings(format!(
                "repair factor {} must be in (0, 1)",
                self.repair_factor
            )));
        }
        Ok(())
    }
}

/// Builds full and live-continuation trajectories.
///
/// Holds only read-only tables, so one instance can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct ProjectionEngine {
    converter: PriceConverter,
    estimator: FinalPriceEstimator,
    curve: CurveModel,
}

impl ProjectionEngine {
    /// Create an engine from validated settings.
    pub fn new(settings: EngineSettings) -> Result<Self, ValidationError> {
        settings.validate()?;

        let estimator = FinalPriceEstimator::new(settings.bands)?;
        let converter = PriceConverter::new(settings.price_ceiling, settings.degenerate_epsilon);
        let curve = CurveModel::new(
            settings.profile,
            settings.interpolation,
            settings.repair_factor,
        );

        Ok(Self::from_parts(converter, estimator, curve))
    }

    /// Assemble an engine from already-built components.
    pub fn from_parts(
        converter: PriceConverter,
        estimator: FinalPriceEstimator,
        curve: CurveModel,
    ) -> Self {
        Self {
            converter,
            estimator,
            curve,
        }
    }

    /// Price converter in use.
    pub fn converter(&self) -> &PriceConverter {
        &self.converter
    }

    /// Final-price estimator in use.
    pub fn estimator(&self) -> &FinalPriceEstimator {
        &self.estimator
    }

    /// Curve model in use.
    pub fn curve(&self) -> &CurveModel {
        &self.curve
    }

    /// Expected side A price at full time for an opening price.
    pub fn expected_final(&self, initial_side_a: Decimal) -> Decimal {
        self.estimator.expected_final(initial_side_a)
    }

    /// Project all 90 minutes from the opening side A price.
    ///
    /// Side A is non-increasing, starts at the (clamped) opening price and
    /// ends exactly at [`expected_final`](Self::expected_final).
    #[instrument(skip_all, fields(initial_side_a = %initial_side_a))]
    pub fn project(&self, initial_side_a: Decimal) -> Trajectory {
        let _timer = metrics::timer_projection();

        let initial = clamp_price(initial_side_a);
        let final_side_a = self.estimator.expected_final(initial);
        let checkpoints = self.curve.build_checkpoints(initial, final_side_a);

        let mut previous = initial;
        let points: Vec<PricePoint> = (FIRST_MINUTE..=FULL_TIME)
            .map(|minute| {
                // Interpolation alone is not trusted to be monotone.
                let side_a = self
                    .curve
                    .interpolate(minute, &checkpoints)
                    .min(previous)
                    .max(final_side_a)
                    .max(PRICE_FLOOR);
                previous = side_a;
                self.converter.point(minute, side_a)
            })
            .collect();

        metrics::inc_projections();
        debug!(final_side_a = %final_side_a, "projection built");

        Trajectory::new(points)
    }

    /// Continue a trajectory from a live price to full time.
    ///
    /// The gap between the live price and the full-time estimate (taken from
    /// the opening price) is spread evenly over the remaining minutes.
    /// Returns points for `current_minute + 1 ..= 90`; empty at minute 90.
    #[instrument(skip_all, fields(
        initial_side_a = %initial_side_a,
        current_side_a = %current_side_a,
        current_minute = current_minute
    ))]
    pub fn project_from_live(
        &self,
        initial_side_a: Decimal,
        current_side_a: Decimal,
        current_minute: u32,
    ) -> Result<Trajectory, ValidationError> {
        validate_minute(current_minute)?;

        if current_minute == FULL_TIME {
            return Ok(Trajectory::empty());
        }

        let final_side_a = self.estimator.expected_final(initial_side_a);
        let current = clamp_price(current_side_a);
        let remaining = FULL_TIME - current_minute;
        let minutes = (current_minute + 1)..=FULL_TIME;

        let points: Vec<PricePoint> = if current <= final_side_a {
            minutes
                .map(|minute| self.converter.point(minute, final_side_a))
                .collect()
        } else {
            let step = (current - final_side_a) / Decimal::from(remaining);
            let mut value = current;
            minutes
                .map(|minute| {
                    value = if minute == FULL_TIME {
                        final_side_a
                    } else {
                        (value - step).max(final_side_a)
                    };
                    self.converter.point(minute, value)
                })
                .collect()
        };

        metrics::inc_live_projections();
        debug!(
            final_side_a = %final_side_a,
            remaining,
            "live continuation built"
        );

        Ok(Trajectory::new(points))
    }

    /// Projected price pair at one minute of the full trajectory.
    pub fn expected_at(
        &self,
        initial_side_a: Decimal,
        minute: u32,
    ) -> Result<PricePoint, ValidationError> {
        validate_minute(minute)?;

        let trajectory = self.project(initial_side_a);
        trajectory
            .at(minute)
            .copied()
            .ok_or(ValidationError::MinuteOutOfRange {
                minute,
                min: FIRST_MINUTE,
                max: FULL_TIME,
            })
    }
}

/// Reject minutes outside the match.
pub fn validate_minute(minute: u32) -> Result<(), ValidationError> {
    if (FIRST_MINUTE..=FULL_TIME).contains(&minute) {
        Ok(())
    } else {
        Err(ValidationError::MinuteOutOfRange {
            minute,
            min: FIRST_MINUTE,
            max: FULL_TIME,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_projection_has_ninety_ordered_minutes() {
        let traj = ProjectionEngine::default().project(dec!(42));

        assert_eq!(traj.len(), 90);
        let minutes: Vec<u32> = traj.iter().map(|p| p.minute).collect();
        assert_eq!(minutes, (1..=90).collect::<Vec<_>>());
    }

    #[test]
    fn full_projection_runs_from_open_to_estimate() {
        let engine = ProjectionEngine::default();
        let traj = engine.project(dec!(42));

        assert_eq!(traj.first().unwrap().side_a, dec!(42));
        assert_eq!(traj.last().unwrap().side_a, dec!(1.54));
        assert!(traj.is_non_increasing());
    }

    #[test]
    fn projection_tracks_reference_match_at_half_hour() {
        let traj = ProjectionEngine::default().project(dec!(42));
        assert_eq!(traj.at(30).unwrap().side_a, dec!(14.0826));
    }

    #[test]
    fn side_b_follows_side_a() {
        let engine = ProjectionEngine::default();
        let traj = engine.project(dec!(12));

        for point in &traj {
            assert_eq!(
                point.side_b,
                engine.converter().side_b_from_side_a(point.side_a)
            );
        }
        assert!(traj.points().windows(2).all(|w| w[0].side_b <= w[1].side_b));
    }

    #[test]
    fn sub_floor_opening_is_clamped() {
        let traj = ProjectionEngine::default().project(dec!(0.3));
        assert!(traj.iter().all(|p| p.side_a == PRICE_FLOOR));
        assert!(traj.iter().all(|p| p.side_b >= PRICE_FLOOR));
    }

    #[test]
    fn live_projection_covers_remaining_minutes() {
        let engine = ProjectionEngine::default();
        let traj = engine.project_from_live(dec!(42), dec!(14), 30).unwrap();

        assert_eq!(traj.len(), 60);
        assert_eq!(traj.first().unwrap().minute, 31);
        assert_eq!(traj.last().unwrap().minute, 90);
        assert_eq!(traj.last().unwrap().side_a, dec!(1.54));
        assert!(traj.is_non_increasing());
    }

    #[test]
    fn live_projection_steps_linearly() {
        let engine = ProjectionEngine::default();
        // (10.54 - 1.54) / 9 = 1 per minute
        let traj = engine.project_from_live(dec!(42), dec!(10.54), 81).unwrap();

        assert_eq!(traj.at(82).unwrap().side_a, dec!(9.54));
        assert_eq!(traj.at(85).unwrap().side_a, dec!(6.54));
        assert_eq!(traj.at(90).unwrap().side_a, dec!(1.54));
    }

    #[test]
    fn live_projection_below_estimate_is_flat() {
        let engine = ProjectionEngine::default();
        let traj = engine.project_from_live(dec!(42), dec!(1.2), 70).unwrap();

        assert_eq!(traj.len(), 20);
        assert!(traj.iter().all(|p| p.side_a == dec!(1.54)));
    }

    #[test]
    fn live_projection_at_full_time_is_empty() {
        let engine = ProjectionEngine::default();
        assert!(engine.project_from_live(dec!(42), dec!(1.6), 90).unwrap().is_empty());
    }

    #[test]
    fn live_projection_rejects_minutes_outside_match() {
        let engine = ProjectionEngine::default();
        assert!(matches!(
            engine.project_from_live(dec!(42), dec!(14), 0),
            Err(ValidationError::MinuteOutOfRange { minute: 0, .. })
        ));
        assert!(engine.project_from_live(dec!(42), dec!(14), 91).is_err());
    }

    #[test]
    fn settings_validation_rejects_bad_scalars() {
        let settings = EngineSettings {
            price_ceiling: dec!(1),
            ..EngineSettings::default()
        };
        assert!(ProjectionEngine::new(settings).is_err());

        let settings = EngineSettings {
            repair_factor: dec!(1.2),
            ..EngineSettings::default()
        };
        assert!(ProjectionEngine::new(settings).is_err());

        assert!(ProjectionEngine::new(EngineSettings::default()).is_ok());
    }

    #[test]
    fn expected_at_reads_the_full_projection() {
        let engine = ProjectionEngine::default();
        let point = engine.expected_at(dec!(42), 1).unwrap();
        assert_eq!(point.side_a, dec!(42));
        assert!(engine.expected_at(dec!(42), 0).is_err());
    }
}
