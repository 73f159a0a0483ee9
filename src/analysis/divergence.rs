//! Divergence between a live side A price and its projection, plus pace.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, instrument};

use crate::market::clamp_price;
use crate::metrics;

/// Rate of decline at or above which a match counts as decelerated.
pub const DEFAULT_PACE_THRESHOLD: Decimal = dec!(0.015);

/// Actionability tier of a divergence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DivergenceTier {
    /// Live price well above projection.
    HighOpportunity,
    /// Live price moderately above projection.
    MediumOpportunity,
    /// Live price close to projection.
    Balanced,
    /// Live price moderately below projection.
    Caution,
    /// Live price well below projection.
    HighRisk,
}

/// Risk attached to entering side A at a given divergence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
    /// Very high risk.
    VeryHigh,
}

/// One row of the tier table. Rows are checked top to bottom; the first row
/// whose threshold the gap reaches wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRule {
    /// Minimum gap percentage; `None` matches everything.
    pub min_gap_pct: Option<Decimal>,
    /// Tier assigned.
    pub tier: DivergenceTier,
    /// Risk assigned.
    pub risk: RiskLevel,
    /// Why the market sits where it does.
    pub rationale: &'static str,
    /// What to do about it.
    pub recommendation: &'static str,
}

/// Default tier table.
pub const DEFAULT_TIER_RULES: [TierRule; 5] = [
    TierRule {
        min_gap_pct: Some(dec!(15)),
        tier: DivergenceTier::HighOpportunity,
        risk: RiskLevel::Low,
        rationale: "Live price far above projection; a strong correction is expected",
        recommendation: "Excellent moment to enter Under",
    },
    TierRule {
        min_gap_pct: Some(dec!(8)),
        tier: DivergenceTier::MediumOpportunity,
        risk: RiskLevel::Medium,
        rationale: "Live price above projection; a moderate correction is expected",
        recommendation: "Good moment to enter Under",
    },
    TierRule {
        min_gap_pct: Some(dec!(-8)),
        tier: DivergenceTier::Balanced,
        risk: RiskLevel::Medium,
        rationale: "Live price close to projection; market is aligned",
        recommendation: "Neutral entry; risk and reward are balanced",
    },
    TierRule {
        min_gap_pct: Some(dec!(-15)),
        tier: DivergenceTier::Caution,
        risk: RiskLevel::High,
        rationale: "Live price below projection; little room left to fall",
        recommendation: "Under entry is risky; little return expected",
    },
    TierRule {
        min_gap_pct: None,
        tier: DivergenceTier::HighRisk,
        risk: RiskLevel::VeryHigh,
        rationale: "Live price far below projection; market may be stuck",
        recommendation: "Avoid Under entry; unnecessary exposure",
    },
];

/// Classified gap between a live and a projected side A price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceResult {
    /// Minute the comparison was made at.
    pub minute: u32,
    /// Live side A price.
    pub current_side_a: Decimal,
    /// Projected side A price.
    pub expected_side_a: Decimal,
    /// `(current - expected) / expected * 100`.
    pub percent_gap: Decimal,
    /// Actionability tier.
    pub tier: DivergenceTier,
    /// Explanation of the tier.
    pub rationale: String,
    /// Suggested action.
    pub recommendation: String,
    /// Risk level.
    pub risk_level: RiskLevel,
}

/// Coarse speed of a match, read from how fast side A has fallen.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Pace {
    /// Slow rhythm.
    Decelerated,
    /// Fast rhythm.
    Accelerated,
}

impl Pace {
    /// Short label.
    pub fn label(&self) -> &'static str {
        match self {
            Pace::Decelerated => "decelerated",
            Pace::Accelerated => "accelerated",
        }
    }

    /// One-line description.
    pub fn description(&self) -> &'static str {
        match self {
            Pace::Decelerated => "slow rhythm, conservative match",
            Pace::Accelerated => "fast rhythm, attacking match",
        }
    }
}

/// Rate of decline per minute, relative to the opening price.
///
/// Zero when no time has elapsed. Divides twice so huge prices cannot
/// overflow.
pub fn rate_of_decline(
    initial_side_a: Decimal,
    current_side_a: Decimal,
    minutes_elapsed: u32,
) -> Decimal {
    if minutes_elapsed == 0 {
        return Decimal::ZERO;
    }
    let initial = clamp_price(initial_side_a);
    let current = clamp_price(current_side_a);
    (initial - current) / initial / Decimal::from(minutes_elapsed)
}

/// Classifies live prices against projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergenceAnalyzer {
    rules: Vec<TierRule>,
    pace_threshold: Decimal,
}

impl Default for DivergenceAnalyzer {
    fn default() -> Self {
        Self {
            rules: DEFAULT_TIER_RULES.to_vec(),
            pace_threshold: DEFAULT_PACE_THRESHOLD,
        }
    }
}

impl DivergenceAnalyzer {
    /// Create an analyzer with a custom tier table and pace threshold.
    ///
    /// Rules are sorted by threshold, highest first, with catch-all rows last.
    pub fn new(mut rules: Vec<TierRule>, pace_threshold: Decimal) -> Self {
        rules.sort_by(|a, b| match (a.min_gap_pct, b.min_gap_pct) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Self {
            rules,
            pace_threshold,
        }
    }

    /// Tier table in evaluation order.
    pub fn rules(&self) -> &[TierRule] {
        &self.rules
    }

    /// Compare a live side A price to the projected one.
    #[instrument(skip(self), fields(current = %current_side_a, expected = %expected_side_a))]
    pub fn analyze(
        &self,
        current_side_a: Decimal,
        expected_side_a: Decimal,
        minute: u32,
    ) -> DivergenceResult {
        let expected = clamp_price(expected_side_a);
        let current = clamp_price(current_side_a);
        // Saturates at Decimal::MAX for absurdly large live prices.
        let percent_gap = ((current - expected) / expected).saturating_mul(Decimal::ONE_HUNDRED);

        let rule = self.rule_for(percent_gap);

        metrics::inc_divergence_analyses(&rule.tier.to_string());
        debug!(percent_gap = %percent_gap, tier = %rule.tier, "divergence classified");

        DivergenceResult {
            minute,
            current_side_a: current,
            expected_side_a: expected,
            percent_gap,
            tier: rule.tier,
            rationale: rule.rationale.to_string(),
            recommendation: rule.recommendation.to_string(),
            risk_level: rule.risk,
        }
    }

    fn rule_for(&self, percent_gap: Decimal) -> TierRule {
        self.rules
            .iter()
            .find(|rule| rule.min_gap_pct.map_or(true, |min| percent_gap >= min))
            .or_else(|| self.rules.last())
            .copied()
            .unwrap_or(DEFAULT_TIER_RULES[DEFAULT_TIER_RULES.len() - 1])
    }

    /// Two-tier pace from a rate of decline.
    pub fn classify_pace(&self, rate: Decimal) -> Pace {
        if rate >= self.pace_threshold {
            Pace::Decelerated
        } else {
            Pace::Accelerated
        }
    }
}
