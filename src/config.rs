//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::analysis::EntryScanConfig;
use crate::curve::Interpolation;
use crate::error::{Result, ValidationError};
use crate::market::PRICE_FLOOR;
use crate::projection::EngineSettings;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Projection Tuning ===
    /// Side B value used when a conversion saturates.
    #[serde(default = "default_price_ceiling")]
    pub price_ceiling: Decimal,

    /// Implied probability at or below which a conversion saturates.
    #[serde(default = "default_degenerate_epsilon")]
    pub degenerate_epsilon: Decimal,

    /// Ease-out curvature between checkpoints (0 = linear).
    #[serde(default = "default_ease_out_rate")]
    pub ease_out_rate: Decimal,

    /// Multiplier applied to checkpoints that fail to decline.
    #[serde(default = "default_repair_factor")]
    pub repair_factor: Decimal,

    // === Entry Scanning ===
    /// Minimum side A decline over a window to suggest an entry, in percent.
    #[serde(default = "default_entry_min_decline_pct")]
    pub entry_min_decline_pct: Decimal,

    /// Maximum side B reversal risk to suggest an entry, in percent.
    #[serde(default = "default_entry_max_reversal_pct")]
    pub entry_max_reversal_pct: Decimal,

    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_price_ceiling() -> Decimal {
    Decimal::new(25, 0)
}

fn default_degenerate_epsilon() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_ease_out_rate() -> Decimal {
    Decimal::new(2, 0)
}

fn default_repair_factor() -> Decimal {
    Decimal::new(98, 2) // 0.98
}

fn default_entry_min_decline_pct() -> Decimal {
    Decimal::new(8, 0)
}

fn default_entry_max_reversal_pct() -> Decimal {
    Decimal::new(60, 0)
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            price_ceiling: default_price_ceiling(),
            degenerate_epsilon: default_degenerate_epsilon(),
            ease_out_rate: default_ease_out_rate(),
            repair_factor: default_repair_factor(),
            entry_min_decline_pct: default_entry_min_decline_pct(),
            entry_max_reversal_pct: default_entry_max_reversal_pct(),
            port: default_port(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> std::result::Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Load configuration and reject invalid values.
    pub fn load_validated() -> Result<Self> {
        let config = Self::load()?;
        config
            .validate()
            .map_err(ValidationError::InvalidSettings)?;
        Ok(config)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.price_ceiling <= PRICE_FLOOR {
            return Err(format!("PRICE_CEILING must be greater than {PRICE_FLOOR}"));
        }

        if self.degenerate_epsilon < Decimal::ZERO || self.degenerate_epsilon >= Decimal::new(5, 1)
        {
            return Err("DEGENERATE_EPSILON must be in [0, 0.5)".to_string());
        }

        if self.repair_factor <= Decimal::ZERO || self.repair_factor >= Decimal::ONE {
            return Err("REPAIR_FACTOR must be between 0 and 1 (exclusive)".to_string());
        }

        if self.ease_out_rate < Decimal::ZERO {
            return Err("EASE_OUT_RATE must not be negative".to_string());
        }

        if self.entry_min_decline_pct < Decimal::ZERO {
            return Err("ENTRY_MIN_DECLINE_PCT must not be negative".to_string());
        }

        if self.entry_max_reversal_pct < Decimal::ZERO {
            return Err("ENTRY_MAX_REVERSAL_PCT must not be negative".to_string());
        }

        Ok(())
    }

    /// Tracing filter directive. Verbose mode (from the flag or `VERBOSE`)
    /// turns on debug output for this crate; otherwise `RUST_LOG` applies.
    pub fn log_directive(&self, verbose_flag: bool) -> String {
        if verbose_flag || self.verbose {
            "under_over=debug,info".to_string()
        } else {
            self.rust_log.clone()
        }
    }

    /// Interpolation mode implied by `ease_out_rate`.
    pub fn interpolation(&self) -> Interpolation {
        if self.ease_out_rate > Decimal::ZERO {
            Interpolation::EaseOut {
                rate: self.ease_out_rate,
            }
        } else {
            Interpolation::Linear
        }
    }

    /// Engine settings with the default band table and checkpoint profile.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            price_ceiling: self.price_ceiling,
            degenerate_epsilon: self.degenerate_epsilon,
            interpolation: self.interpolation(),
            repair_factor: self.repair_factor,
            ..EngineSettings::default()
        }
    }

    /// Entry scan thresholds with the configured decline and risk limits.
    pub fn entry_scan_config(&self) -> EntryScanConfig {
        let mut scan = EntryScanConfig::default();
        scan.side_a.min_decline_pct = self.entry_min_decline_pct;
        scan.side_b.max_reversal_pct = self.entry_max_reversal_pct;
        scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyzerError;
    use rust_decimal_macros::dec;

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_price_ceiling(), dec!(25));
        assert_eq!(default_degenerate_epsilon(), dec!(0.001));
        assert_eq!(default_repair_factor(), dec!(0.98));
        assert_eq!(default_port(), 8080);
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_ceiling_at_floor() {
        let config = Config {
            price_ceiling: dec!(1.01),
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_repair_factor_out_of_range() {
        let config = Config {
            repair_factor: dec!(1),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            repair_factor: dec!(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_directive_follows_verbose_settings() {
        let config = Config {
            rust_log: "warn".to_string(),
            ..Config::default()
        };
        assert_eq!(config.log_directive(false), "warn");
        assert_eq!(config.log_directive(true), "under_over=debug,info");

        let config = Config {
            verbose: true,
            ..config
        };
        assert_eq!(config.log_directive(false), "under_over=debug,info");
    }

    #[test]
    fn env_values_are_parsed_into_config() {
        let vars = vec![
            ("RUST_LOG".to_string(), "debug".to_string()),
            ("VERBOSE".to_string(), "true".to_string()),
            ("PRICE_CEILING".to_string(), "30".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.rust_log, "debug");
        assert!(config.verbose);
        assert_eq!(config.price_ceiling, dec!(30));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn malformed_env_value_is_a_config_error() {
        let vars = vec![("PORT".to_string(), "not-a-port".to_string())];
        let err: AnalyzerError = envy::from_iter::<_, Config>(vars).unwrap_err().into();
        assert!(matches!(err, AnalyzerError::Config(_)));
    }

    #[test]
    fn zero_ease_out_rate_means_linear() {
        let config = Config {
            ease_out_rate: Decimal::ZERO,
            ..Config::default()
        };
        assert_eq!(config.interpolation(), Interpolation::Linear);
        assert_eq!(
            Config::default().interpolation(),
            Interpolation::EaseOut { rate: dec!(2) }
        );
    }

    #[test]
    fn engine_settings_carry_overrides() {
        let config = Config {
            price_ceiling: dec!(30),
            repair_factor: dec!(0.95),
            ..Config::default()
        };
        let settings = config.engine_settings();

        assert_eq!(settings.price_ceiling, dec!(30));
        assert_eq!(settings.repair_factor, dec!(0.95));
        assert_eq!(settings.bands, EngineSettings::default().bands);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn entry_scan_config_carries_thresholds() {
        let config = Config {
            entry_min_decline_pct: dec!(12),
            entry_max_reversal_pct: dec!(40),
            ..Config::default()
        };
        let scan = config.entry_scan_config();

        assert_eq!(scan.side_a.min_decline_pct, dec!(12));
        assert_eq!(scan.side_b.max_reversal_pct, dec!(40));
        assert_eq!(scan.max_candidates, 3);
    }
}
