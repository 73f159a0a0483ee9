//! Unified error types for the Under/Over analyser.
//!
//! The projection core never fails on numeric edge cases: out-of-range
//! prices are clamped and degenerate conversions saturate. Errors exist only
//! at the boundary, for inputs that have no meaningful clamped form.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the analyser.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Out-of-domain input or invalid tuning table.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Input and configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Match minute outside the allowed range.
    #[error("minute {minute} outside allowed range {min}..={max}")]
    MinuteOutOfRange {
        /// The rejected minute.
        minute: u32,
        /// Smallest accepted minute.
        min: u32,
        /// Largest accepted minute.
        max: u32,
    },

    /// Final-price band table would make the estimate decrease.
    #[error("final-price bands are not monotone at boundary {boundary}")]
    NonMonotoneBands {
        /// Band threshold where the estimate drops.
        boundary: Decimal,
    },

    /// Checkpoint profile is malformed.
    #[error("invalid curve profile: {0}")]
    InvalidCurveProfile(String),

    /// Engine settings are out of range.
    #[error("invalid engine settings: {0}")]
    InvalidSettings(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_error_message_names_range() {
        let err = ValidationError::MinuteOutOfRange {
            minute: 95,
            min: 1,
            max: 90,
        };
        assert_eq!(err.to_string(), "minute 95 outside allowed range 1..=90");
    }

    #[test]
    fn validation_error_converts_into_analyzer_error() {
        let err: AnalyzerError = ValidationError::InvalidSettings("ceiling".to_string()).into();
        assert!(matches!(err, AnalyzerError::Validation(_)));
    }
}
