use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, info, trace};

use crate::{errors::ActuatorError, fan_curve::FanSpeed};

const NANOS_PER_SEC: u64 = 1_000_000_000;

// How long to wait for the kernel (and udev) to create
// the channel directory after an export
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const EXPORT_POLL_ATTEMPTS: u32 = 20;

// Consumer of duty cycle commands driving the physical fan
pub trait PwmActuator {
    // Apply the given duty cycle
    fn set_duty(
        &mut self,
        speed: FanSpeed,
    ) -> impl Future<Output = Result<(), ActuatorError>> + Send;

    // Stop the fan, valid even if the current duty is unknown
    fn stop(
        &mut self,
    ) -> impl Future<Output = Result<(), ActuatorError>> + Send {
        self.set_duty(FanSpeed::OFF)
    }
}

/// Hardware PWM channel driven through the Linux sysfs interface
/// (`/sys/class/pwm/pwmchipN/pwmM`).
#[derive(Debug)]
pub struct SysfsPwm {
    channel_dir: PathBuf,

    // PWM period in nanoseconds
    period_ns: u64,
}

impl SysfsPwm {
    /// Export (if needed) and enable the given channel with the fan stopped.
    pub async fn open(
        chip: &Path,
        channel: u32,
        frequency: u32,
    ) -> Result<Self, ActuatorError> {
        let channel_dir = chip.join(format!("pwm{channel}"));

        if !path_exists(&channel_dir).await {
            debug!("Exporting PWM channel {} of {:?}", channel, chip);

            tokio::fs::write(chip.join("export"), channel.to_string())
                .await
                .map_err(|source| ActuatorError::Export {
                    channel,
                    source,
                })?;

            wait_for_export(&channel_dir, channel).await?;
        }

        let pwm = Self {
            channel_dir,
            period_ns: period_ns(frequency),
        };

        // The duty cycle can never exceed the period, clear it first
        // in case a longer period was configured before
        pwm.write_attr("duty_cycle", 0).await?;
        pwm.write_attr("period", pwm.period_ns).await?;
        pwm.write_attr("enable", 1).await?;

        info!(
            "PWM channel {:?} enabled at {} Hz",
            pwm.channel_dir, frequency
        );

        Ok(pwm)
    }

    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }

    pub fn duty_ns(&self, speed: FanSpeed) -> u64 {
        self.period_ns * speed.get() as u64 / 100
    }

    async fn write_attr(
        &self,
        attr: &str,
        value: u64,
    ) -> Result<(), ActuatorError> {
        let path = self.channel_dir.join(attr);

        trace!("Writing {} to {:?}", value, path);

        tokio::fs::write(&path, value.to_string())
            .await
            .map_err(|source| ActuatorError::Write { path, source })
    }
}

impl PwmActuator for SysfsPwm {
    async fn set_duty(&mut self, speed: FanSpeed) -> Result<(), ActuatorError> {
        self.write_attr("duty_cycle", self.duty_ns(speed)).await
    }
}

fn period_ns(frequency: u32) -> u64 {
    (NANOS_PER_SEC / frequency.max(1) as u64).max(1)
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn wait_for_export(
    channel_dir: &Path,
    channel: u32,
) -> Result<(), ActuatorError> {
    for _ in 0..EXPORT_POLL_ATTEMPTS {
        if path_exists(&channel_dir.join("duty_cycle")).await {
            return Ok(());
        }

        tokio::time::sleep(EXPORT_POLL_INTERVAL).await;
    }

    Err(ActuatorError::NotExported { channel })
}
