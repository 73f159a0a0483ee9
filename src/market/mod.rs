//! Market module: price types and complementary conversion.
//!
//! This module handles:
//! - Price points, trajectories and live observations
//! - Side A / side B conversion through implied probability

pub mod converter;
pub mod types;

pub use converter::{PriceConverter, DEFAULT_DEGENERATE_EPSILON, DEFAULT_PRICE_CEILING};
pub use types::{
    clamp_price, LiveObservation, MarketSide, PricePoint, Trajectory, FIRST_MINUTE, FULL_TIME,
    PRICE_FLOOR,
};
