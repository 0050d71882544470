use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    control_loop::LoopSettings, errors::ConfigError, fan_curve::FanCurveConfig,
    sensor::TempUnit,
};

/// Daemon settings, read once at startup.
///
/// Every field is optional in the Json file, absent fields take their
/// default value. The fan curve fields live at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub curve: FanCurveConfig,

    pub cpu_temp_file: PathBuf,
    pub cpu_temp_unit: TempUnit,
    // Number of readings averaged into one temperature sample
    pub cpu_temp_sample_count: usize,
    // Delay between averaged readings in seconds
    pub cpu_temp_sample_delay: f32,
    // Upper bound on one temperature sample in seconds
    pub sensor_timeout: f32,
    // Control loop period in seconds
    pub update_interval: f32,

    pub pwm_chip: PathBuf,
    pub pwm_channel: u32,
    // PWM frequency in hertz
    pub pwm_frequency: u32,

    pub failure_alert_threshold: u32,
}

impl Config {
    /// Load and validate the configuration file.
    ///
    /// A missing file yields the default configuration,
    /// any other failure is fatal.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Parsing config file at: {:?}", path);

        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Configuration file {:?} not found, using built-in defaults",
                    path
                );

                let config = Self::default();
                config.validate()?;

                return Ok(config);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Config = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;

        trace!("Loaded configuration: {:?}", config);

        Ok(config)
    }

    // Reject any configuration the control loop can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.curve.validate()?;

        if self.cpu_temp_sample_count == 0 {
            return Err(ConfigError::Invalid(
                "cpu_temp_sample_count must be at least 1".to_string(),
            ));
        }

        if Duration::try_from_secs_f32(self.cpu_temp_sample_delay).is_err() {
            return Err(ConfigError::Invalid(format!(
                "cpu_temp_sample_delay must be a non negative number of seconds, got {}",
                self.cpu_temp_sample_delay
            )));
        }

        for (name, value) in [
            ("sensor_timeout", self.sensor_timeout),
            ("update_interval", self.update_interval),
        ] {
            match Duration::try_from_secs_f32(value) {
                Ok(duration) if !duration.is_zero() => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "{name} must be a positive number of seconds, got {value}"
                    )));
                }
            }
        }

        // The whole averaged read has to fit in the sensor timeout,
        // otherwise every read times out and the fan never starts
        let sampling_window = (self.cpu_temp_sample_count - 1) as f32
            * self.cpu_temp_sample_delay;

        if sampling_window >= self.sensor_timeout {
            return Err(ConfigError::Invalid(format!(
                "{} samples {}s apart take {}s, longer than sensor_timeout ({}s)",
                self.cpu_temp_sample_count,
                self.cpu_temp_sample_delay,
                sampling_window,
                self.sensor_timeout
            )));
        }

        if !(1..=1_000_000_000).contains(&self.pwm_frequency) {
            return Err(ConfigError::Invalid(format!(
                "pwm_frequency must be within 1..=1000000000 Hz, got {}",
                self.pwm_frequency
            )));
        }

        if self.failure_alert_threshold == 0 {
            return Err(ConfigError::Invalid(
                "failure_alert_threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs_f32(self.update_interval)
    }

    pub fn sample_delay(&self) -> Duration {
        Duration::from_secs_f32(self.cpu_temp_sample_delay)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            sensor_timeout: Duration::from_secs_f32(self.sensor_timeout),
            failure_alert_threshold: self.failure_alert_threshold,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            curve: FanCurveConfig::default(),

            cpu_temp_file: PathBuf::from(
                "/sys/class/thermal/thermal_zone0/temp",
            ),
            cpu_temp_unit: TempUnit::Millidegrees,
            cpu_temp_sample_count: 5,
            cpu_temp_sample_delay: 0.1,
            sensor_timeout: 2.0,
            update_interval: 1.0,

            // GPIO13 on a Raspberry Pi
            pwm_chip: PathBuf::from("/sys/class/pwm/pwmchip0"),
            pwm_channel: 1,
            pwm_frequency: 25_000,

            failure_alert_threshold: 5,
        }
    }
}
