//! Entry windows found by scanning a projected trajectory.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, instrument};

use crate::market::{MarketSide, PriceConverter, Trajectory, PRICE_FLOOR};
use crate::metrics;

/// Reversal risk below which a side B entry counts as highly stable.
const HIGH_STABILITY_RISK_PCT: Decimal = dec!(20);

/// Side A scan: fixed-length windows where side A is projected to fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideAScan {
    /// First entry minute considered.
    pub first_minute: u32,
    /// Last entry minute considered.
    pub last_minute: u32,
    /// Minutes between entry candidates.
    pub step: u32,
    /// Minutes held after entry.
    pub window: u32,
    /// Lowest entry price worth taking.
    pub min_price: Decimal,
    /// Highest entry price worth taking.
    pub max_price: Decimal,
    /// Minimum decline over the window, in percent.
    pub min_decline_pct: Decimal,
}

impl Default for SideAScan {
    fn default() -> Self {
        Self {
            first_minute: 15,
            last_minute: 65,
            step: 5,
            window: 10,
            min_price: dec!(2.5),
            max_price: dec!(35),
            min_decline_pct: dec!(8),
        }
    }
}

/// Side B scan: late minutes where side B is unlikely to move against us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideBScan {
    /// First entry minute considered.
    pub first_minute: u32,
    /// Last entry minute considered.
    pub last_minute: u32,
    /// Minutes between entry candidates.
    pub step: u32,
    /// Lowest side B price worth taking.
    pub min_price: Decimal,
    /// Highest side B price worth taking.
    pub max_price: Decimal,
    /// Maximum tolerated reversal risk, in percent.
    pub max_reversal_pct: Decimal,
}

impl Default for SideBScan {
    fn default() -> Self {
        Self {
            first_minute: 60,
            last_minute: 84,
            step: 3,
            min_price: dec!(1.10),
            max_price: dec!(15),
            max_reversal_pct: dec!(60),
        }
    }
}

/// Thresholds for both scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryScanConfig {
    /// Side A scan.
    pub side_a: SideAScan,
    /// Side B scan.
    pub side_b: SideBScan,
    /// Candidates kept per side.
    pub max_candidates: usize,
}

impl Default for EntryScanConfig {
    fn default() -> Self {
        Self {
            side_a: SideAScan::default(),
            side_b: SideBScan::default(),
            max_candidates: 3,
        }
    }
}

/// How settled a side B entry is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stability {
    /// Reversal risk under 20%.
    High,
    /// Reversal risk 20% or more.
    Medium,
}

/// A ranked entry suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCandidate {
    /// Side to enter.
    pub side: MarketSide,
    /// Entry minute.
    pub minute: u32,
    /// Price of `side` at entry.
    pub price_at_entry: Decimal,
    /// Side A: price after the window. Side B: price implied at full time.
    pub reference_price: Decimal,
    /// Side A: decline percentage. Side B: reversal risk percentage.
    pub metric_pct: Decimal,
}

impl EntryCandidate {
    /// Stability bucket for side B entries; `None` for side A.
    pub fn stability(&self) -> Option<Stability> {
        match self.side {
            MarketSide::A => None,
            MarketSide::B if self.metric_pct < HIGH_STABILITY_RISK_PCT => Some(Stability::High),
            MarketSide::B => Some(Stability::Medium),
        }
    }
}

/// Scans trajectories for entry windows on either side.
#[derive(Debug, Clone, Default)]
pub struct EntryScanner {
    config: EntryScanConfig,
    converter: PriceConverter,
}

impl EntryScanner {
    /// Create a scanner.
    pub fn new(config: EntryScanConfig, converter: PriceConverter) -> Self {
        Self { config, converter }
    }

    /// Thresholds in use.
    pub fn config(&self) -> &EntryScanConfig {
        &self.config
    }

    /// Best side A entries, largest projected decline first.
    #[instrument(skip_all, fields(points = trajectory.len()))]
    pub fn scan_side_a_entries(&self, trajectory: &Trajectory) -> Vec<EntryCandidate> {
        let scan = &self.config.side_a;

        let minutes = scan_minutes(scan.first_minute, scan.last_minute, scan.step);
        let mut candidates: Vec<EntryCandidate> = minutes
            .filter_map(|minute| {
                let entry = trajectory.at(minute)?.side_a;
                let after = trajectory.at(minute + scan.window)?.side_a;

                if entry < scan.min_price || entry > scan.max_price || after < PRICE_FLOOR {
                    return None;
                }

                let decline_pct = (entry - after) / entry * Decimal::ONE_HUNDRED;
                (decline_pct >= scan.min_decline_pct).then_some(EntryCandidate {
                    side: MarketSide::A,
                    minute,
                    price_at_entry: entry,
                    reference_price: after,
                    metric_pct: decline_pct,
                })
            })
            .collect();

        candidates.sort_by(|a, b| b.metric_pct.cmp(&a.metric_pct));
        candidates.truncate(self.config.max_candidates);

        metrics::add_entry_candidates(&MarketSide::A.to_string(), candidates.len());
        debug!(found = candidates.len(), "side A entries scanned");

        candidates
    }

    /// Best side B entries, lowest reversal risk first.
    ///
    /// Reversal risk is how far side B would still have to rise to reach the
    /// price implied by the trajectory's full-time side A value.
    #[instrument(skip_all, fields(points = trajectory.len()))]
    pub fn scan_side_b_entries(&self, trajectory: &Trajectory) -> Vec<EntryCandidate> {
        let scan = &self.config.side_b;
        let Some(last) = trajectory.last() else {
            return Vec::new();
        };
        let final_side_b = self.converter.side_b_from_side_a(last.side_a);

        let minutes = scan_minutes(scan.first_minute, scan.last_minute, scan.step);
        let mut candidates: Vec<EntryCandidate> = minutes
            .filter_map(|minute| {
                let price = trajectory.at(minute)?.side_b;

                if price < scan.min_price || price > scan.max_price {
                    return None;
                }

                let risk_pct = if final_side_b > price {
                    (final_side_b - price) / price * Decimal::ONE_HUNDRED
                } else {
                    Decimal::ZERO
                };

                (risk_pct <= scan.max_reversal_pct).then_some(EntryCandidate {
                    side: MarketSide::B,
                    minute,
                    price_at_entry: price,
                    reference_price: final_side_b,
                    metric_pct: risk_pct,
                })
            })
            .collect();

        candidates.sort_by(|a, b| a.metric_pct.cmp(&b.metric_pct));
        candidates.truncate(self.config.max_candidates);

        metrics::add_entry_candidates(&MarketSide::B.to_string(), candidates.len());
        debug!(found = candidates.len(), "side B entries scanned");

        candidates
    }
}

fn scan_minutes(first: u32, last: u32, step: u32) -> impl Iterator<Item = u32> {
    (first..=last).step_by(step.max(1) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionEngine;
    use pretty_assertions::assert_eq;

    fn trajectory_from(side_a: impl Fn(u32) -> Decimal) -> Trajectory {
        let converter = PriceConverter::default();
        Trajectory::new((1..=90).map(|m| converter.point(m, side_a(m))).collect())
    }

    #[test]
    fn side_a_ranks_by_decline() {
        // Falls 0.4 per minute from 40, so later windows lose more in percent.
        let traj = trajectory_from(|m| dec!(40) - dec!(0.4) * Decimal::from(m - 1));
        let entries = EntryScanner::default().scan_side_a_entries(&traj);

        let minutes: Vec<u32> = entries.iter().map(|e| e.minute).collect();
        assert_eq!(minutes, vec![65, 60, 55]);
        assert_eq!(entries[0].price_at_entry, dec!(14.4));
        assert_eq!(entries[0].reference_price, dec!(10.4));
        assert!(entries.iter().all(|e| e.side == MarketSide::A));
        assert!(entries.iter().all(|e| e.stability().is_none()));
    }

    #[test]
    fn side_a_skips_flat_windows() {
        let traj = trajectory_from(|_| dec!(10));
        assert!(EntryScanner::default().scan_side_a_entries(&traj).is_empty());
    }

    #[test]
    fn side_a_skips_prices_outside_band() {
        let traj = trajectory_from(|m| dec!(80) - Decimal::from(m) / dec!(2));
        // Every entry price from minute 15 to 65 is above 35.
        assert!(EntryScanner::default().scan_side_a_entries(&traj).is_empty());
    }

    #[test]
    fn side_b_flat_market_has_no_reversal_risk() {
        let traj = trajectory_from(|_| dec!(2));
        let entries = EntryScanner::default().scan_side_b_entries(&traj);

        let minutes: Vec<u32> = entries.iter().map(|e| e.minute).collect();
        assert_eq!(minutes, vec![60, 63, 66]);
        assert!(entries.iter().all(|e| e.metric_pct == Decimal::ZERO));
        assert_eq!(entries[0].price_at_entry, dec!(2));
        assert_eq!(entries[0].stability(), Some(Stability::High));
    }

    #[test]
    fn side_b_skips_prices_below_band() {
        // Side A at 20 puts side B near 1.05.
        let traj = trajectory_from(|_| dec!(20));
        assert!(EntryScanner::default().scan_side_b_entries(&traj).is_empty());
    }

    #[test]
    fn side_b_skips_prices_above_band() {
        // Side A at 1.05 puts side B at 21.
        let traj = trajectory_from(|_| dec!(1.05));
        assert!(traj.iter().all(|p| p.side_b > dec!(15)));
        assert!(EntryScanner::default().scan_side_b_entries(&traj).is_empty());
    }

    #[test]
    fn side_b_ranks_by_reversal_risk() {
        let engine = ProjectionEngine::default();
        let traj = engine.project(dec!(42));
        let entries = EntryScanner::default().scan_side_b_entries(&traj);

        assert!(!entries.is_empty());
        assert!(entries.len() <= 3);
        assert!(entries.windows(2).all(|w| w[0].metric_pct <= w[1].metric_pct));
        assert!(entries.iter().all(|e| e.metric_pct <= dec!(60)));
        assert!(entries
            .iter()
            .all(|e| e.reference_price == traj.last().unwrap().side_b));
    }

    #[test]
    fn empty_trajectory_yields_nothing() {
        let scanner = EntryScanner::default();
        assert!(scanner.scan_side_a_entries(&Trajectory::empty()).is_empty());
        assert!(scanner.scan_side_b_entries(&Trajectory::empty()).is_empty());
    }

    #[test]
    fn partial_trajectory_is_scanned_by_minute() {
        let engine = ProjectionEngine::default();
        let traj = engine.project_from_live(dec!(42), dec!(30), 20).unwrap();
        let entries = EntryScanner::default().scan_side_a_entries(&traj);

        assert!(entries.iter().all(|e| e.minute > 20));
        assert!(entries.windows(2).all(|w| w[0].metric_pct >= w[1].metric_pct));
    }
}
