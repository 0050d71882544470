use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

// Failure to obtain a temperature sample
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Failed to read temperature file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid temperature value {value:?} in {path:?}")]
    Parse { path: PathBuf, value: String },
    #[error("Temperature read timed out after {0:?}")]
    Timeout(Duration),
}

// Failure to apply a duty cycle to the PWM output
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("Failed to write PWM attribute {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to export PWM channel {channel}")]
    Export {
        channel: u32,
        #[source]
        source: io::Error,
    },
    #[error("PWM channel {channel} did not appear after export")]
    NotExported { channel: u32 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse configuration file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// The main daemon error type
#[derive(Debug, Error)]
pub enum PifanError {
    #[error(transparent)]
    SensorUnavailable(#[from] SensorError),
    #[error(transparent)]
    ActuatorFailure(#[from] ActuatorError),
    #[error(transparent)]
    ConfigInvalid(#[from] ConfigError),
}
