//! Under/Over total-goals market price projection.
//!
//! Given the opening Under price of a football match, this library projects
//! how the Under and Over prices move across the 90 minutes, compares live
//! prices against that projection and points out entry windows.
//!
//! # Model
//!
//! Under and Over are complementary: their implied probabilities sum to one.
//! Under decays towards an expected full-time price, spending fixed shares of
//! the total decline between checkpoint minutes:
//!
//! ```text
//! Opening Under:  42.00   Over: 1.024
//! Minute 30:      14.08   Over: 1.076
//! Full time:       1.54   Over: 2.852
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Price types and Under/Over conversion
//! - [`curve`]: Final-price estimate, checkpoints and interpolation
//! - [`projection`]: Full-match and live-continuation projections
//! - [`analysis`]: Divergence, pace and entry windows
//! - [`report`]: Pre-match and live reports
//! - [`metrics`]: Prometheus metrics
//! - [`api`]: HTTP API
//! - [`utils`]: Utility functions

pub mod analysis;
pub mod api;
pub mod config;
pub mod curve;
pub mod error;
pub mod market;
pub mod metrics;
pub mod projection;
pub mod report;
pub mod utils;

pub use config::Config;
pub use error::{AnalyzerError, Result};
