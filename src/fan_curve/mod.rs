pub mod hysteresis_gate;
pub mod linear_curve;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FanSpeed {
    speed: u8,
}

impl FanSpeed {
    pub const OFF: FanSpeed = FanSpeed { speed: 0 };
    pub const MAX: FanSpeed = FanSpeed { speed: 100 };

    // Generate a new fan speed point
    // automatically clamp the given value between 0 and 100
    pub fn new(speed: u8) -> FanSpeed {
        FanSpeed {
            speed: speed.clamp(0, 100),
        }
    }

    // Return the stored fan speed
    pub fn get(&self) -> u8 {
        self.speed
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.speed)
    }
}

/// Parameters of the fan curve and of the activation hysteresis.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanCurveConfig {
    /// Temperature (°C) at or above which a stopped fan starts
    pub trigger_temp: f32,
    /// Temperature (°C) at or above which the fan runs at 100%
    pub cpu_temp_max: f32,
    /// Duty used at `trigger_temp`, the lowest non zero duty ever commanded
    pub fan_active_min_speed: u8,
    /// Degrees below `trigger_temp` a running fan needs before it stops
    pub hysteresis: f32,
}

impl FanCurveConfig {
    // Temperature at or below which an active fan is stopped
    pub fn deactivation_temp(&self) -> f32 {
        self.trigger_temp - self.hysteresis
    }

    pub fn min_speed(&self) -> FanSpeed {
        FanSpeed::new(self.fan_active_min_speed)
    }

    // Check the curve invariants, interpolation relies on them
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("trigger_temp", self.trigger_temp),
            ("cpu_temp_max", self.cpu_temp_max),
            ("hysteresis", self.hysteresis),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }

        if self.cpu_temp_max <= self.trigger_temp {
            return Err(ConfigError::Invalid(format!(
                "cpu_temp_max ({}) must be greater than trigger_temp ({})",
                self.cpu_temp_max, self.trigger_temp
            )));
        }

        if self.hysteresis <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "hysteresis must be positive, got {}",
                self.hysteresis
            )));
        }

        if self.fan_active_min_speed > 100 {
            return Err(ConfigError::Invalid(format!(
                "fan_active_min_speed must be within 0..=100, got {}",
                self.fan_active_min_speed
            )));
        }

        Ok(())
    }
}

impl Default for FanCurveConfig {
    fn default() -> Self {
        Self {
            trigger_temp: 50.0,
            cpu_temp_max: 80.0,
            fan_active_min_speed: 20,
            hysteresis: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_speed_is_clamped() {
        assert_eq!(FanSpeed::new(150).get(), 100);
        assert_eq!(FanSpeed::new(42).get(), 42);
        assert_eq!(FanSpeed::new(42).to_string(), "42%");
    }

    #[test]
    fn default_curve_is_valid() {
        let cfg = FanCurveConfig::default();

        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.deactivation_temp(), 45.0);
        assert_eq!(cfg.min_speed(), FanSpeed::new(20));
    }

    #[test]
    fn rejects_inverted_temperatures() {
        let cfg = FanCurveConfig {
            trigger_temp: 80.0,
            cpu_temp_max: 80.0,
            ..Default::default()
        };

        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_positive_hysteresis() {
        for hysteresis in [0.0, -1.0] {
            let cfg = FanCurveConfig {
                hysteresis,
                ..Default::default()
            };

            assert!(cfg.validate().is_err(), "hysteresis {hysteresis}");
        }
    }

    #[test]
    fn rejects_out_of_range_min_speed() {
        let cfg = FanCurveConfig {
            fan_active_min_speed: 101,
            ..Default::default()
        };

        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_values() {
        let cfg = FanCurveConfig {
            cpu_temp_max: f32::INFINITY,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = FanCurveConfig {
            trigger_temp: f32::NAN,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
