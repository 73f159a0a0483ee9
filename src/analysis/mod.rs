//! Analysis module for reading projected and live prices.
//!
//! This module handles:
//! - Divergence between live prices and the projection
//! - Match pace from the observed rate of decline
//! - Entry windows on both sides of the market

pub mod divergence;
pub mod entries;

pub use divergence::{
    rate_of_decline, DivergenceAnalyzer, DivergenceResult, DivergenceTier, Pace, RiskLevel,
    TierRule, DEFAULT_PACE_THRESHOLD, DEFAULT_TIER_RULES,
};
pub use entries::{EntryCandidate, EntryScanConfig, EntryScanner, SideAScan, SideBScan, Stability};
