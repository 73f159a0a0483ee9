//! Checkpoint construction and interpolation for the side A decay curve.
//!
//! A [`CurveProfile`] splits the total decline (opening price minus expected
//! full-time price) across a handful of inter-checkpoint intervals. The
//! resulting [`CheckpointMap`] is repaired to be non-increasing and then
//! interpolated minute by minute.

use once_cell::sync::Lazy;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::ValidationError;
use crate::market::{clamp_price, FIRST_MINUTE, FULL_TIME, PRICE_FLOOR};

/// Tolerance on the sum of decline shares.
const SHARE_TOLERANCE: Decimal = dec!(0.0001);

/// Default multiplier applied to a checkpoint that fails to decline.
pub const DEFAULT_REPAIR_FACTOR: Decimal = dec!(0.98);

/// Default ease-out rate for interpolation.
pub const DEFAULT_EASE_OUT_RATE: Decimal = dec!(2);

/// Share of the total decline spent between the previous checkpoint and
/// `end_minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveSegment {
    /// Checkpoint minute closing this interval.
    pub end_minute: u32,
    /// Fraction of the total decline allocated to this interval.
    pub share: Decimal,
}

impl CurveSegment {
    /// Create a segment.
    pub const fn new(end_minute: u32, share: Decimal) -> Self {
        Self { end_minute, share }
    }
}

/// Checkpoint layout and decline allocation, starting at minute 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveProfile {
    segments: SmallVec<[CurveSegment; 16]>,
}

// Shares follow the reference match that opened at 42.0 and closed at 1.50:
// most of the decline happens before half time.
static DEFAULT_PROFILE: Lazy<CurveProfile> = Lazy::new(|| CurveProfile {
    segments: SmallVec::from_slice(&[
        CurveSegment::new(15, dec!(0.345)),
        CurveSegment::new(30, dec!(0.345)),
        CurveSegment::new(45, dec!(0.12)),
        CurveSegment::new(46, dec!(0.015)),
        CurveSegment::new(60, dec!(0.10)),
        CurveSegment::new(75, dec!(0.04)),
        CurveSegment::new(85, dec!(0.02)),
        CurveSegment::new(90, dec!(0.015)),
    ]),
});

impl Default for CurveProfile {
    fn default() -> Self {
        DEFAULT_PROFILE.clone()
    }
}

impl CurveProfile {
    /// Build a profile, checking minutes run from 1 to 90 in ascending order
    /// and shares are non-negative and sum to one.
    pub fn new(segments: impl IntoIterator<Item = CurveSegment>) -> Result<Self, ValidationError> {
        let segments: SmallVec<[CurveSegment; 16]> = segments.into_iter().collect();

        let Some(last) = segments.last() else {
            return Err(ValidationError::InvalidCurveProfile(
                "profile has no segments".to_string(),
            ));
        };
        if last.end_minute != FULL_TIME {
            return Err(ValidationError::InvalidCurveProfile(format!(
                "last checkpoint must be minute {FULL_TIME}, got {}",
                last.end_minute
            )));
        }

        let mut previous = FIRST_MINUTE;
        for segment in &segments {
            if segment.end_minute <= previous {
                return Err(ValidationError::InvalidCurveProfile(format!(
                    "checkpoint minute {} does not follow {previous}",
                    segment.end_minute
                )));
            }
            if segment.share < Decimal::ZERO {
                return Err(ValidationError::InvalidCurveProfile(format!(
                    "negative share at minute {}",
                    segment.end_minute
                )));
            }
            previous = segment.end_minute;
        }

        let total: Decimal = segments.iter().map(|s| s.share).sum();
        if (total - Decimal::ONE).abs() > SHARE_TOLERANCE {
            return Err(ValidationError::InvalidCurveProfile(format!(
                "shares sum to {total}, expected 1"
            )));
        }

        Ok(Self { segments })
    }

    /// Segments in minute order.
    pub fn segments(&self) -> &[CurveSegment] {
        &self.segments
    }

    /// Every checkpoint minute, including minute 1.
    pub fn checkpoint_minutes(&self) -> impl Iterator<Item = u32> + '_ {
        std::iter::once(FIRST_MINUTE).chain(self.segments.iter().map(|s| s.end_minute))
    }
}

/// A side A value pinned at a minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Match minute.
    pub minute: u32,
    /// Side A price at that minute.
    pub side_a: Decimal,
}

/// Checkpoints for one opening price, ascending by minute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointMap {
    points: SmallVec<[Checkpoint; 16]>,
}

impl CheckpointMap {
    /// Checkpoints in minute order.
    pub fn points(&self) -> &[Checkpoint] {
        &self.points
    }

    /// Value pinned at a minute, if that minute is a checkpoint.
    pub fn get(&self, minute: u32) -> Option<Decimal> {
        self.points
            .iter()
            .find(|c| c.minute == minute)
            .map(|c| c.side_a)
    }

    /// Check that no checkpoint is above its predecessor.
    pub fn is_non_increasing(&self) -> bool {
        self.points.windows(2).all(|w| w[0].side_a >= w[1].side_a)
    }
}

/// How values between two checkpoints are filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Interpolation {
    /// Straight line between checkpoints.
    Linear,
    /// Front-loaded: `(1 - e^(-rate*f)) / (1 - e^(-rate))`.
    EaseOut {
        /// Curvature; zero or negative degrades to linear.
        rate: Decimal,
    },
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::EaseOut {
            rate: DEFAULT_EASE_OUT_RATE,
        }
    }
}

impl Interpolation {
    /// Map a raw fraction in `[0, 1]` onto the warped fraction in `[0, 1]`.
    pub fn warp(&self, fraction: Decimal) -> Decimal {
        let fraction = fraction.max(Decimal::ZERO).min(Decimal::ONE);

        match *self {
            Interpolation::Linear => fraction,
            Interpolation::EaseOut { rate } if rate > Decimal::ZERO => {
                let warped = (-(rate * fraction))
                    .checked_exp()
                    .zip((-rate).checked_exp())
                    .and_then(|(partial, full)| {
                        (Decimal::ONE - partial).checked_div(Decimal::ONE - full)
                    });

                match warped {
                    Some(w) => w.max(Decimal::ZERO).min(Decimal::ONE),
                    None => fraction,
                }
            }
            Interpolation::EaseOut { .. } => fraction,
        }
    }
}

/// Builds and interpolates checkpoint maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveModel {
    profile: CurveProfile,
    interpolation: Interpolation,
    repair_factor: Decimal,
}

impl Default for CurveModel {
    fn default() -> Self {
        Self::new(
            CurveProfile::default(),
            Interpolation::default(),
            DEFAULT_REPAIR_FACTOR,
        )
    }
}

impl CurveModel {
    /// Create a curve model. The repair factor is clamped into `(0, 1)`.
    pub fn new(profile: CurveProfile, interpolation: Interpolation, repair_factor: Decimal) -> Self {
        let repair_factor = if repair_factor > Decimal::ZERO && repair_factor < Decimal::ONE {
            repair_factor
        } else {
            DEFAULT_REPAIR_FACTOR
        };

        Self {
            profile,
            interpolation,
            repair_factor,
        }
    }

    /// Checkpoint layout in use.
    pub fn profile(&self) -> &CurveProfile {
        &self.profile
    }

    /// Interpolation mode in use.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Evaluate every checkpoint for an opening price and its expected
    /// full-time price. Minute 90 is pinned to `final_side_a`.
    pub fn build_checkpoints(&self, initial_side_a: Decimal, final_side_a: Decimal) -> CheckpointMap {
        let initial = clamp_price(initial_side_a);
        let final_side_a = clamp_price(final_side_a).min(initial);
        let decline = initial - final_side_a;

        let mut points: SmallVec<[Checkpoint; 16]> = SmallVec::new();
        points.push(Checkpoint {
            minute: FIRST_MINUTE,
            side_a: initial,
        });

        let mut running = initial;
        for segment in self.profile.segments() {
            let side_a = if segment.end_minute == FULL_TIME {
                final_side_a
            } else {
                running -= decline * segment.share;
                running.max(final_side_a)
            };
            points.push(Checkpoint {
                minute: segment.end_minute,
                side_a,
            });
        }

        self.repair(&mut points, final_side_a);

        debug!(
            initial = %initial,
            final_side_a = %final_side_a,
            checkpoints = points.len(),
            "checkpoints built"
        );

        CheckpointMap { points }
    }

    /// Force any checkpoint that fails to drop below its predecessor down to
    /// `previous * repair_factor`, never below the full-time price.
    fn repair(&self, points: &mut [Checkpoint], final_side_a: Decimal) {
        for i in 1..points.len() {
            let previous = points[i - 1].side_a;
            if points[i].side_a >= previous {
                let repaired = (previous * self.repair_factor).max(final_side_a);
                trace!(
                    minute = points[i].minute,
                    from = %points[i].side_a,
                    to = %repaired,
                    "checkpoint repaired"
                );
                points[i].side_a = repaired;
            }
        }
    }

    /// Side A value at a minute. Minutes outside the checkpoint range take
    /// the nearest boundary value; a result never exceeds the earlier
    /// checkpoint of its interval.
    pub fn interpolate(&self, minute: u32, checkpoints: &CheckpointMap) -> Decimal {
        let points = checkpoints.points();
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return PRICE_FLOOR;
        };

        if minute <= first.minute {
            return first.side_a;
        }
        if minute >= last.minute {
            return last.side_a;
        }

        for pair in points.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if minute == start.minute {
                return start.side_a;
            }
            if minute < end.minute {
                let span = Decimal::from(end.minute - start.minute);
                let fraction = Decimal::from(minute - start.minute) / span;
                let weight = self.interpolation.warp(fraction);
                let value = start.side_a + (end.side_a - start.side_a) * weight;
                return value.min(start.side_a).max(end.side_a.min(start.side_a));
            }
        }

        last.side_a
    }
}
