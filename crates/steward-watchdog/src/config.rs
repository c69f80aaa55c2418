//! Watchdog configuration snapshots.
//!
//! A [`WatchdogConfig`] is an immutable snapshot extracted from the raw
//! agent configuration. The manager compares snapshots for equality to
//! decide when a pending change needs to be reconciled, so every
//! recognized field (and the passthrough driver table) participates in
//! `PartialEq`.

use serde_json::{Map, Value};

use crate::error::{WatchdogError, WatchdogResult};

/// Sentinel for `safety_margin` meaning "use half of the TTL".
pub const SAFETY_MARGIN_HALF_TTL: i64 = -1;

/// Driver-specific parameters, passed through verbatim to the factory.
pub type DriverConfig = Map<String, Value>;

/// Operating mode of the watchdog subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogMode {
    /// Fail hard if no safe watchdog can be armed.
    Required,
    /// Use a watchdog if one is available, degrade silently otherwise.
    Automatic,
    /// Never attempt to use a watchdog.
    Off,
}

impl WatchdogMode {
    /// Parse a mode from a loosely-typed configuration value.
    ///
    /// A missing value means [`WatchdogMode::Automatic`]. Boolean `false`
    /// and the strings `off`/`disable`/`disabled` turn the watchdog off
    /// silently; any unrecognized value turns it off with a warning.
    #[must_use]
    pub fn parse(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::Automatic;
        };
        if value == &Value::Bool(false) {
            return Self::Off;
        }
        let mode = match value {
            Value::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        };
        match mode.as_str() {
            "require" | "required" => Self::Required,
            "auto" | "automatic" => Self::Automatic,
            "off" | "disable" | "disabled" => Self::Off,
            _ => {
                tracing::warn!(mode = %mode, "watchdog mode not recognized, disabling watchdog");
                Self::Off
            }
        }
    }
}

/// Immutable snapshot of all configuration the watchdog manager acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchdogConfig {
    /// Operating mode.
    pub mode: WatchdogMode,
    /// The agent's own failure-detection period (leader-lease TTL), seconds.
    pub ttl: i64,
    /// How often a keepalive is expected to be sent, seconds.
    pub loop_wait: i64,
    /// Seconds subtracted from `ttl` to derive the watchdog timeout.
    ///
    /// [`SAFETY_MARGIN_HALF_TTL`] means "use half of `ttl` instead".
    pub safety_margin: i64,
    /// Driver identifier resolved through the driver registry.
    pub driver: String,
    /// Driver-specific parameters, structural equality included.
    pub driver_config: DriverConfig,
}

fn required_int(raw: &Value, key: &str) -> WatchdogResult<i64> {
    raw.get(key).and_then(Value::as_i64).ok_or_else(|| {
        WatchdogError::invalid_configuration(format!("{key} must be an integer"))
    })
}

impl WatchdogConfig {
    /// Build a snapshot from the raw agent configuration.
    ///
    /// The top-level `watchdog` section is optional and defaults to
    /// `{mode: automatic}`. Keys other than `mode`, `safety_margin` and
    /// `driver` are passed through verbatim as [`DriverConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`WatchdogError::InvalidConfiguration`] if the required
    /// top-level `ttl` or `loop_wait` keys are missing or not integers.
    pub fn from_value(raw: &Value) -> WatchdogResult<Self> {
        let ttl = required_int(raw, "ttl")?;
        let loop_wait = required_int(raw, "loop_wait")?;
        let section = raw.get("watchdog").and_then(Value::as_object);

        let mode = WatchdogMode::parse(section.and_then(|s| s.get("mode")));
        let safety_margin = section
            .and_then(|s| s.get("safety_margin"))
            .and_then(Value::as_i64)
            .unwrap_or(5);
        let driver = section
            .and_then(|s| s.get("driver"))
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_owned();
        let driver_config = section
            .map(|s| {
                s.iter()
                    .filter(|(key, _)| {
                        !matches!(key.as_str(), "mode" | "safety_margin" | "driver")
                    })
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            mode,
            ttl,
            loop_wait,
            safety_margin,
            driver,
            driver_config,
        })
    }

    /// Watchdog timeout derived from the TTL and the safety margin, seconds.
    #[must_use]
    pub fn timeout(&self) -> i64 {
        if self.safety_margin == SAFETY_MARGIN_HALF_TTL {
            self.ttl / 2
        } else {
            self.ttl - self.safety_margin
        }
    }

    /// Margin between the computed timeout and the keepalive interval.
    ///
    /// Negative slack means keepalives cannot plausibly be sent often
    /// enough to prevent the watchdog from firing spuriously.
    #[must_use]
    pub fn timing_slack(&self) -> i64 {
        self.timeout() - self.loop_wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn config(raw: Value) -> WatchdogConfig {
        WatchdogConfig::from_value(&raw).expect("valid raw config")
    }

    #[test]
    fn test_defaults_without_watchdog_section() {
        let config = config(json!({"ttl": 30, "loop_wait": 10}));

        assert_eq!(config.mode, WatchdogMode::Automatic);
        assert_eq!(config.safety_margin, 5);
        assert_eq!(config.driver, "default");
        assert!(config.driver_config.is_empty());
        assert_eq!(config.timeout(), 25);
        assert_eq!(config.timing_slack(), 15);
    }

    #[test]
    fn test_missing_required_keys() {
        let err = WatchdogConfig::from_value(&json!({"loop_wait": 10}));
        assert_eq!(
            err,
            Err(WatchdogError::invalid_configuration("ttl must be an integer"))
        );

        let err = WatchdogConfig::from_value(&json!({"ttl": 30, "loop_wait": "ten"}));
        assert!(matches!(err, Err(WatchdogError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(WatchdogMode::parse(None), WatchdogMode::Automatic);
        assert_eq!(
            WatchdogMode::parse(Some(&json!(false))),
            WatchdogMode::Off
        );
        for mode in ["require", "REQUIRED"] {
            assert_eq!(
                WatchdogMode::parse(Some(&json!(mode))),
                WatchdogMode::Required
            );
        }
        for mode in ["auto", "Automatic"] {
            assert_eq!(
                WatchdogMode::parse(Some(&json!(mode))),
                WatchdogMode::Automatic
            );
        }
        for mode in ["off", "disable", "disabled", "sometimes", "true"] {
            assert_eq!(WatchdogMode::parse(Some(&json!(mode))), WatchdogMode::Off);
        }
        // Non-string values are stringified before matching, like the
        // loosely-typed sources they come from.
        assert_eq!(WatchdogMode::parse(Some(&json!(1))), WatchdogMode::Off);
    }

    #[test]
    fn test_half_ttl_sentinel() {
        let config = config(json!({
            "ttl": 31,
            "loop_wait": 10,
            "watchdog": {"safety_margin": -1},
        }));

        assert_eq!(config.timeout(), 15);
        assert_eq!(config.timing_slack(), 5);
    }

    #[test]
    fn test_extra_keys_become_driver_config() {
        let config = config(json!({
            "ttl": 30,
            "loop_wait": 10,
            "watchdog": {
                "mode": "required",
                "driver": "default",
                "safety_margin": 5,
                "device": "/dev/watchdog",
                "retries": 3,
            },
        }));

        assert_eq!(config.driver_config.len(), 2);
        assert_eq!(
            config.driver_config.get("device"),
            Some(&json!("/dev/watchdog"))
        );
        assert_eq!(config.driver_config.get("retries"), Some(&json!(3)));
    }

    #[test]
    fn test_snapshot_equality() {
        let raw = json!({
            "ttl": 30,
            "loop_wait": 10,
            "watchdog": {"mode": "automatic", "device": "/dev/watchdog"},
        });
        assert_eq!(config(raw.clone()), config(raw.clone()));

        let mut changed = config(raw.clone());
        changed.ttl = 31;
        assert_ne!(config(raw.clone()), changed);

        let mut changed = config(raw.clone());
        changed.driver_config.insert("device".into(), json!("/dev/watchdog1"));
        assert_ne!(config(raw), changed);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_timeout_with_margin(
            ttl in 1i64..100_000,
            loop_wait in 1i64..1000,
            safety_margin in 0i64..1000,
        ) {
            let config = config(json!({
                "ttl": ttl,
                "loop_wait": loop_wait,
                "watchdog": {"safety_margin": safety_margin},
            }));
            prop_assert_eq!(config.timeout(), ttl - safety_margin);
            prop_assert_eq!(config.timing_slack(), config.timeout() - loop_wait);
        }

        #[test]
        fn prop_timeout_with_sentinel(
            ttl in 1i64..100_000,
            loop_wait in 1i64..1000,
        ) {
            let config = config(json!({
                "ttl": ttl,
                "loop_wait": loop_wait,
                "watchdog": {"safety_margin": -1},
            }));
            prop_assert_eq!(config.timeout(), ttl / 2);
            prop_assert_eq!(config.timing_slack(), ttl / 2 - loop_wait);
        }
    }
}
