//! Tunable timing constants for the scheduler and frame driver.
//!
//! The exact values are empirical. What matters is their ordering:
//! `near_boundary_ms < refine_margin_ms < stale_threshold_ms`.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Ceiling for every interval and threshold.
pub const MAX_INTERVAL_MS: u64 = 60_000;

/// How the driver spaces ticks between phase boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    /// Coarse sleep until shortly before the boundary, then refine with frames.
    #[default]
    SleepRefine,
    /// Tick on every frame.
    Continuous,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Completion tolerance and progress floor, in seconds.
    #[serde(default = "default_epsilon_secs")]
    pub epsilon_secs: f64,
    /// Remaining time at which a coarse wake-up ticks immediately.
    #[serde(default = "default_near_boundary_ms")]
    pub near_boundary_ms: u64,
    /// How far before the boundary the coarse sleep ends.
    #[serde(default = "default_refine_margin_ms")]
    pub refine_margin_ms: u64,
    /// Upper bound on a single coarse sleep.
    #[serde(default = "default_max_sleep_ms")]
    pub max_sleep_ms: u64,
    /// Delay between a frame request and its delivery.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
    /// Silence after which the watchdog treats the frame loop as dead.
    #[serde(default = "default_stale_threshold_ms")]
    pub stale_threshold_ms: u64,
    #[serde(default)]
    pub mode: DriveMode,
}

fn default_epsilon_secs() -> f64 {
    0.05
}
fn default_near_boundary_ms() -> u64 {
    16
}
fn default_refine_margin_ms() -> u64 {
    24
}
fn default_max_sleep_ms() -> u64 {
    1000
}
fn default_frame_interval_ms() -> u64 {
    16
}
fn default_watchdog_interval_ms() -> u64 {
    200
}
fn default_stale_threshold_ms() -> u64 {
    250
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            epsilon_secs: default_epsilon_secs(),
            near_boundary_ms: default_near_boundary_ms(),
            refine_margin_ms: default_refine_margin_ms(),
            max_sleep_ms: default_max_sleep_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            watchdog_interval_ms: default_watchdog_interval_ms(),
            stale_threshold_ms: default_stale_threshold_ms(),
            mode: DriveMode::default(),
        }
    }
}

impl TimingConfig {
    /// Check the relative ordering, non-zero and ceiling constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.epsilon_secs.is_finite() && self.epsilon_secs > 0.0) {
            return Err(invalid("timing.epsilon_secs", "must be finite and > 0"));
        }
        if self.near_boundary_ms >= self.refine_margin_ms {
            return Err(invalid(
                "timing.near_boundary_ms",
                "must be smaller than timing.refine_margin_ms",
            ));
        }
        if self.refine_margin_ms >= self.stale_threshold_ms {
            return Err(invalid(
                "timing.refine_margin_ms",
                "must be smaller than timing.stale_threshold_ms",
            ));
        }
        if self.frame_interval_ms == 0 {
            return Err(invalid("timing.frame_interval_ms", "must be > 0"));
        }
        if self.watchdog_interval_ms == 0 {
            return Err(invalid("timing.watchdog_interval_ms", "must be > 0"));
        }
        if self.max_sleep_ms == 0 {
            return Err(invalid("timing.max_sleep_ms", "must be > 0"));
        }
        for (key, value) in [
            ("timing.frame_interval_ms", self.frame_interval_ms),
            ("timing.watchdog_interval_ms", self.watchdog_interval_ms),
            ("timing.max_sleep_ms", self.max_sleep_ms),
            ("timing.stale_threshold_ms", self.stale_threshold_ms),
        ] {
            if value > MAX_INTERVAL_MS {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("must be at most {MAX_INTERVAL_MS}"),
                });
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let t = TimingConfig::default();
        assert!(t.validate().is_ok());
        assert!(t.near_boundary_ms < t.refine_margin_ms);
        assert!(t.refine_margin_ms < t.stale_threshold_ms);
        assert_eq!(t.mode, DriveMode::SleepRefine);
    }

    #[test]
    fn rejects_inverted_ordering() {
        let t = TimingConfig {
            near_boundary_ms: 30,
            ..TimingConfig::default()
        };
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("timing.near_boundary_ms"));

        let t = TimingConfig {
            refine_margin_ms: 300,
            ..TimingConfig::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn rejects_bad_epsilon_and_zero_intervals() {
        for eps in [0.0, -0.1, f64::NAN] {
            let t = TimingConfig {
                epsilon_secs: eps,
                ..TimingConfig::default()
            };
            assert!(t.validate().is_err());
        }
        let t = TimingConfig {
            frame_interval_ms: 0,
            ..TimingConfig::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn rejects_intervals_above_ceiling() {
        let t = TimingConfig {
            watchdog_interval_ms: u64::MAX,
            ..TimingConfig::default()
        };
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("timing.watchdog_interval_ms"));

        let t = TimingConfig {
            frame_interval_ms: MAX_INTERVAL_MS + 1,
            ..TimingConfig::default()
        };
        assert!(t.validate().is_err());

        let t = TimingConfig {
            max_sleep_ms: MAX_INTERVAL_MS,
            ..TimingConfig::default()
        };
        assert!(t.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let t: TimingConfig = toml::from_str("mode = \"continuous\"\nrefine_margin_ms = 30").unwrap();
        assert_eq!(t.mode, DriveMode::Continuous);
        assert_eq!(t.refine_margin_ms, 30);
        assert_eq!(t.stale_threshold_ms, 250);
    }
}
