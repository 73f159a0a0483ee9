//! Projection module: full-match and live-continuation trajectories.

pub mod engine;

pub use engine::{validate_minute, EngineSettings, ProjectionEngine};
