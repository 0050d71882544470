use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::SensorError;

// Supplier of the current CPU temperature in degrees Celsius
pub trait TemperatureSource {
    fn read(&mut self) -> impl Future<Output = Result<f32, SensorError>> + Send;
}

// Unit of the raw value stored in a temperature file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempUnit {
    #[default]
    Millidegrees,
    Degrees,
}

impl TempUnit {
    fn to_celsius(self, raw: f32) -> f32 {
        match self {
            TempUnit::Millidegrees => raw / 1000.0,
            TempUnit::Degrees => raw,
        }
    }
}

/// Temperature read from a sysfs thermal zone style file,
/// e.g. `/sys/class/thermal/thermal_zone0/temp`.
#[derive(Debug, Clone)]
pub struct SysfsTemperature {
    path: PathBuf,
    unit: TempUnit,
}

impl SysfsTemperature {
    pub fn new(path: &Path, unit: TempUnit) -> Self {
        Self {
            path: path.to_path_buf(),
            unit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemperatureSource for SysfsTemperature {
    async fn read(&mut self) -> Result<f32, SensorError> {
        let contents =
            tokio::fs::read_to_string(&self.path).await.map_err(|source| {
                SensorError::Read {
                    path: self.path.clone(),
                    source,
                }
            })?;

        let value = contents.trim();

        let raw = value
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| SensorError::Parse {
                path: self.path.clone(),
                value: value.to_string(),
            })?;

        Ok(self.unit.to_celsius(raw))
    }
}

/// Smooth out the readings of another source by averaging
/// several samples taken `delay` apart.
///
/// A single failing sample fails the whole read.
#[derive(Debug)]
pub struct AveragingSource<S: TemperatureSource> {
    source: S,

    sample_count: usize,
    delay: Duration,
}

impl<S: TemperatureSource> AveragingSource<S> {
    pub fn new(source: S, sample_count: usize, delay: Duration) -> Self {
        Self {
            source,
            sample_count: sample_count.max(1),
            delay,
        }
    }

    pub fn inner(&self) -> &S {
        &self.source
    }
}

impl<S: TemperatureSource + Send> TemperatureSource for AveragingSource<S> {
    async fn read(&mut self) -> Result<f32, SensorError> {
        let mut samples = Vec::with_capacity(self.sample_count);

        for i in 0..self.sample_count {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            samples.push(self.source.read().await?);
        }

        trace!("Temperature samples: {:?}", samples);

        Ok(samples.iter().sum::<f32>() / samples.len() as f32)
    }
}
