//! Fake sensors and actuators shared by the unit tests.

use std::{
    collections::VecDeque,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    control_loop::DutyCommand,
    errors::{ActuatorError, SensorError},
    fan_curve::FanSpeed,
    pwm::PwmActuator,
    sensor::TemperatureSource,
};

pub fn sensor_failure() -> SensorError {
    SensorError::Read {
        path: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
        source: io::Error::other("sensor unplugged"),
    }
}

#[derive(Debug, Default)]
struct Script {
    readings: VecDeque<Result<f32, SensorError>>,
    read_times: Vec<Instant>,
}

/// Temperature source replaying a fixed list of readings.
///
/// Clones share the script, so a test can keep a handle on a source
/// owned by the control loop. Once the script is exhausted every read fails.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
    latency: Duration,
}

impl ScriptedSource {
    pub fn new(
        readings: impl IntoIterator<Item = Result<f32, SensorError>>,
    ) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                readings: readings.into_iter().collect(),
                read_times: Vec::new(),
            })),
            latency: Duration::ZERO,
        }
    }

    pub fn temps(temps: impl IntoIterator<Item = f32>) -> Self {
        Self::new(temps.into_iter().map(Ok))
    }

    // Simulate a slow sensor
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn reads(&self) -> usize {
        self.script.lock().unwrap().read_times.len()
    }

    pub fn read_times(&self) -> Vec<Instant> {
        self.script.lock().unwrap().read_times.clone()
    }
}

impl TemperatureSource for ScriptedSource {
    async fn read(&mut self) -> Result<f32, SensorError> {
        let next = {
            let mut script = self.script.lock().unwrap();
            script.read_times.push(Instant::now());
            script.readings.pop_front()
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        next.unwrap_or_else(|| Err(sensor_failure()))
    }
}

// Sensor whose reads never complete
#[derive(Debug, Clone, Default)]
pub struct HangingSource;

impl TemperatureSource for HangingSource {
    async fn read(&mut self) -> Result<f32, SensorError> {
        std::future::pending().await
    }
}

#[derive(Debug, Default)]
struct Recording {
    commands: Vec<DutyCommand>,
    failures_left: usize,
    attempts: usize,
}

/// Actuator recording every successfully applied command.
///
/// Clones share the recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    recording: Arc<Mutex<Recording>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    // Make the next `count` commands fail
    pub fn fail_next(&self, count: usize) {
        self.recording.lock().unwrap().failures_left = count;
    }

    pub fn commands(&self) -> Vec<DutyCommand> {
        self.recording.lock().unwrap().commands.clone()
    }

    pub fn last(&self) -> Option<DutyCommand> {
        self.recording.lock().unwrap().commands.last().copied()
    }

    // Number of commands attempted, failed ones included
    pub fn attempts(&self) -> usize {
        self.recording.lock().unwrap().attempts
    }

    fn record(&self, command: DutyCommand) -> Result<(), ActuatorError> {
        let mut recording = self.recording.lock().unwrap();
        recording.attempts += 1;

        if recording.failures_left > 0 {
            recording.failures_left -= 1;

            return Err(ActuatorError::Write {
                path: PathBuf::from("/sys/class/pwm/pwmchip0/pwm1/duty_cycle"),
                source: io::Error::other("device busy"),
            });
        }

        recording.commands.push(command);

        Ok(())
    }
}

impl PwmActuator for RecordingActuator {
    async fn set_duty(&mut self, speed: FanSpeed) -> Result<(), ActuatorError> {
        self.record(DutyCommand::Drive(speed))
    }

    async fn stop(&mut self) -> Result<(), ActuatorError> {
        self.record(DutyCommand::Stop)
    }
}
