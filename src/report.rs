//! Pre-match and in-play reports built on top of the projection engine.
//!
//! This module handles:
//! - Full-match projections with milestone minutes and entry windows
//! - Live analysis: divergence, pace, remaining decline and continuation

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{info, instrument};

use crate::analysis::{
    rate_of_decline, DivergenceAnalyzer, DivergenceResult, EntryCandidate, EntryScanConfig,
    EntryScanner, Pace,
};
use crate::config::Config;
use crate::error::ValidationError;
use crate::market::{clamp_price, LiveObservation, PricePoint, Trajectory, FULL_TIME};
use crate::projection::ProjectionEngine;

/// Minutes reported as milestones in a pre-match report.
pub const MILESTONE_MINUTES: [u32; 6] = [15, 30, 45, 60, 75, 90];

/// How much side A still has left to fall, bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PotentialTier {
    /// More than 25% left.
    VeryHigh,
    /// More than 15% left.
    High,
    /// More than 8% left.
    Medium,
    /// 8% or less.
    Low,
}

impl PotentialTier {
    /// Bucket a remaining-decline percentage.
    pub fn from_remaining_pct(remaining_pct: Decimal) -> Self {
        if remaining_pct > dec!(25) {
            PotentialTier::VeryHigh
        } else if remaining_pct > dec!(15) {
            PotentialTier::High
        } else if remaining_pct > dec!(8) {
            PotentialTier::Medium
        } else {
            PotentialTier::Low
        }
    }
}

/// Everything known before kick-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreMatchReport {
    /// Price pair at minute 1.
    pub opening: PricePoint,
    /// Price pair at full time.
    pub closing: PricePoint,
    /// Price pairs at the milestone minutes.
    pub milestones: Vec<PricePoint>,
    /// Best side A entries.
    pub side_a_entries: Vec<EntryCandidate>,
    /// Best side B entries.
    pub side_b_entries: Vec<EntryCandidate>,
    /// Full 90-minute trajectory.
    pub trajectory: Trajectory,
}

/// In-play analysis of a live observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveReport {
    /// Current match minute.
    pub minute: u32,
    /// Projected pair at the current minute.
    pub expected: PricePoint,
    /// Live side B price (quoted or derived from side A).
    pub current_side_b: Decimal,
    /// Side A divergence from the projection.
    pub divergence: DivergenceResult,
    /// `current_side_b - expected.side_b`.
    pub side_b_gap: Decimal,
    /// Relative decline of side A per elapsed minute.
    pub rate_of_decline: Decimal,
    /// Pace read from the rate of decline.
    pub pace: Pace,
    /// Expected pair at full time.
    pub expected_final: PricePoint,
    /// Share of the live side A price still expected to disappear, in percent.
    pub remaining_decline_pct: Decimal,
    /// Bucketed remaining decline.
    pub potential: PotentialTier,
    /// Projected path from the next minute to full time.
    pub continuation: Trajectory,
}

/// Runs projections and analyses with one consistent set of tables.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct MatchAnalyzer {
    engine: ProjectionEngine,
    divergence: DivergenceAnalyzer,
    scanner: EntryScanner,
}

impl MatchAnalyzer {
    /// Assemble an analyzer from its parts.
    pub fn new(
        engine: ProjectionEngine,
        divergence: DivergenceAnalyzer,
        scanner: EntryScanner,
    ) -> Self {
        Self {
            engine,
            divergence,
            scanner,
        }
    }

    /// Build an analyzer from application configuration.
    pub fn from_config(config: &Config) -> Result<Self, ValidationError> {
        let engine = ProjectionEngine::new(config.engine_settings())?;
        let scanner = EntryScanner::new(config.entry_scan_config(), *engine.converter());
        Ok(Self::new(engine, DivergenceAnalyzer::default(), scanner))
    }

    /// Projection engine in use.
    pub fn engine(&self) -> &ProjectionEngine {
        &self.engine
    }

    /// Divergence analyzer in use.
    pub fn divergence(&self) -> &DivergenceAnalyzer {
        &self.divergence
    }

    /// Entry scan thresholds in use.
    pub fn entry_config(&self) -> &EntryScanConfig {
        self.scanner.config()
    }

    /// Full projection plus entry windows for an opening side A price.
    #[instrument(skip_all, fields(initial_side_a = %initial_side_a))]
    pub fn pre_match(&self, initial_side_a: Decimal) -> PreMatchReport {
        let trajectory = self.engine.project(initial_side_a);

        // project() always yields minutes 1..=90
        let opening = trajectory.first().copied().unwrap_or_else(|| {
            self.engine.converter().point(1, clamp_price(initial_side_a))
        });
        let closing = trajectory.last().copied().unwrap_or(opening);

        let milestones = MILESTONE_MINUTES
            .iter()
            .filter_map(|&minute| trajectory.at(minute).copied())
            .collect();

        let side_a_entries = self.scanner.scan_side_a_entries(&trajectory);
        let side_b_entries = self.scanner.scan_side_b_entries(&trajectory);

        info!(
            final_side_a = %closing.side_a,
            side_a_entries = side_a_entries.len(),
            side_b_entries = side_b_entries.len(),
            "pre-match report ready"
        );

        PreMatchReport {
            opening,
            closing,
            milestones,
            side_a_entries,
            side_b_entries,
            trajectory,
        }
    }

    /// Analyse a live observation against the pre-match projection.
    #[instrument(skip_all, fields(minute = observation.minute))]
    pub fn live(&self, observation: &LiveObservation) -> Result<LiveReport, ValidationError> {
        let minute = observation.minute;
        let expected = self.engine.expected_at(observation.initial_side_a, minute)?;
        let continuation = self.engine.project_from_live(
            observation.initial_side_a,
            observation.current_side_a,
            minute,
        )?;

        let converter = self.engine.converter();
        let current_side_a = clamp_price(observation.current_side_a);
        let current_side_b = observation
            .current_side_b
            .map(clamp_price)
            .unwrap_or_else(|| converter.side_b_from_side_a(current_side_a));

        let divergence = self.divergence.analyze(current_side_a, expected.side_a, minute);

        let rate = rate_of_decline(observation.initial_side_a, current_side_a, minute);
        let pace = self.divergence.classify_pace(rate);

        let final_side_a = self.engine.expected_final(observation.initial_side_a);
        let expected_final = converter.point(FULL_TIME, final_side_a);
        let remaining_decline_pct =
            (current_side_a - final_side_a) / current_side_a * Decimal::ONE_HUNDRED;
        let potential = PotentialTier::from_remaining_pct(remaining_decline_pct);

        info!(
            tier = %divergence.tier,
            pace = %pace,
            potential = %potential,
            "live report ready"
        );

        Ok(LiveReport {
            minute,
            expected,
            current_side_b,
            side_b_gap: current_side_b - expected.side_b,
            divergence,
            rate_of_decline: rate,
            pace,
            expected_final,
            remaining_decline_pct,
            potential,
            continuation,
        })
    }
}
