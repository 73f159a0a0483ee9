//! Price and trajectory types for a two-outcome Under/Over market.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lowest quotable price. Anything below is clamped up to it.
pub const PRICE_FLOOR: Decimal = dec!(1.01);

/// First minute of a match.
pub const FIRST_MINUTE: u32 = 1;

/// Last minute of a match (stoppage time is folded into it).
pub const FULL_TIME: u32 = 90;

/// Clamp a quoted price to the market floor.
pub fn clamp_price(price: Decimal) -> Decimal {
    price.max(PRICE_FLOOR)
}

/// One side of the complementary market.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum MarketSide {
    /// Side A: Under the goal line.
    #[strum(to_string = "under", serialize = "a", serialize = "UNDER")]
    #[serde(rename = "under")]
    #[default]
    A,
    /// Side B: Over the goal line.
    #[strum(to_string = "over", serialize = "b", serialize = "OVER")]
    #[serde(rename = "over")]
    B,
}

impl MarketSide {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            MarketSide::A => MarketSide::B,
            MarketSide::B => MarketSide::A,
        }
    }
}

/// Quoted prices for both sides at a given minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Match minute (1..=90).
    pub minute: u32,
    /// Side A (Under) price.
    pub side_a: Decimal,
    /// Side B (Over) price.
    pub side_b: Decimal,
}

impl PricePoint {
    /// Create a new price point.
    pub fn new(minute: u32, side_a: Decimal, side_b: Decimal) -> Self {
        Self {
            minute,
            side_a,
            side_b,
        }
    }

    /// Get the price for one side.
    pub fn price(&self, side: MarketSide) -> Decimal {
        match side {
            MarketSide::A => self.side_a,
            MarketSide::B => self.side_b,
        }
    }
}

/// Minute-ordered sequence of price points, either a full match or a suffix
/// ending at full time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory {
    points: Vec<PricePoint>,
}

impl Trajectory {
    /// Wrap already-ordered points.
    pub fn new(points: Vec<PricePoint>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].minute + 1 == w[1].minute));
        Self { points }
    }

    /// Trajectory with no points (live projection at full time).
    pub fn empty() -> Self {
        Self::default()
    }

    /// All points in minute order.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if there are no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Earliest point.
    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    /// Latest point (full time for a non-empty trajectory).
    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Point at a given match minute.
    pub fn at(&self, minute: u32) -> Option<&PricePoint> {
        let start = self.first()?.minute;
        let index = minute.checked_sub(start)? as usize;
        self.points.get(index).filter(|p| p.minute == minute)
    }

    /// Iterate over points in minute order.
    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }

    /// Check that side A never rises from one minute to the next.
    pub fn is_non_increasing(&self) -> bool {
        self.points.windows(2).all(|w| w[0].side_a >= w[1].side_a)
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a PricePoint;
    type IntoIter = std::slice::Iter<'a, PricePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Snapshot of an in-progress match supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveObservation {
    /// Side A price at kick-off.
    pub initial_side_a: Decimal,
    /// Side B price at kick-off, if quoted.
    #[serde(default)]
    pub initial_side_b: Option<Decimal>,
    /// Side A price now.
    pub current_side_a: Decimal,
    /// Side B price now, if quoted.
    #[serde(default)]
    pub current_side_b: Option<Decimal>,
    /// Current match minute.
    pub minute: u32,
}
