//! Curve module: the shape of side A's decay over a match.
//!
//! - [`estimator`]: expected full-time price from the opening price
//! - [`checkpoints`]: checkpoint construction, repair and interpolation

pub mod checkpoints;
pub mod estimator;

pub use checkpoints::{
    Checkpoint, CheckpointMap, CurveModel, CurveProfile, CurveSegment, Interpolation,
    DEFAULT_EASE_OUT_RATE, DEFAULT_REPAIR_FACTOR,
};
pub use estimator::{default_bands, FinalBand, FinalPriceEstimator};
