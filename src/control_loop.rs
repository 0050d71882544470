use std::time::Duration;

use anyhow::anyhow;
use tokio::{select, sync::mpsc::Sender};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, trace, trace_span, warn};

use crate::{
    errors::{ActuatorError, PifanError, SensorError},
    fan_curve::{
        FanCurveConfig, FanSpeed,
        hysteresis_gate::{self, Activation},
        linear_curve::compute_duty,
    },
    pwm::PwmActuator,
    sensor::TemperatureSource,
    ticker::Ticker,
};

const STOP_ATTEMPTS: u32 = 3;
const STOP_RETRY_DELAY: Duration = Duration::from_millis(100);

// What the actuator is told to do for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyCommand {
    Stop,
    Drive(FanSpeed),
}

impl DutyCommand {
    pub fn speed(&self) -> FanSpeed {
        match self {
            DutyCommand::Stop => FanSpeed::OFF,
            DutyCommand::Drive(speed) => *speed,
        }
    }
}

// Mutable state of the loop, carried from one cycle to the next
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    pub activation: Activation,

    // Diagnostics only
    pub last_temp: Option<f32>,
    pub last_command: Option<DutyCommand>,

    pub sensor_failures: u32,
    pub actuator_failures: u32,
}

/// Tunables of the control loop other than the fan curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    /// Upper bound on one temperature read
    pub sensor_timeout: Duration,
    /// Consecutive failures before they are escalated to the error channel
    pub failure_alert_threshold: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            sensor_timeout: Duration::from_secs(2),
            failure_alert_threshold: 5,
        }
    }
}

/// Decide the activation state and actuator command for a temperature.
///
/// Pure, the whole control policy of a single cycle.
pub fn decide(
    temp: f32,
    cfg: &FanCurveConfig,
    state: Activation,
) -> (Activation, DutyCommand) {
    let (new_state, should_drive) = hysteresis_gate::update(temp, cfg, state);

    let command = if should_drive {
        DutyCommand::Drive(compute_duty(temp, cfg))
    } else {
        DutyCommand::Stop
    };

    (new_state, command)
}

pub struct ControlLoop<S: TemperatureSource, A: PwmActuator> {
    curve: FanCurveConfig,
    settings: LoopSettings,

    source: S,
    actuator: A,

    state: ControllerState,

    // Operator visible reporting of persistent failures
    tx_err: Sender<anyhow::Error>,
}

impl<S, A> ControlLoop<S, A>
where
    S: TemperatureSource + Send,
    A: PwmActuator + Send,
{
    pub fn new(
        curve: FanCurveConfig,
        settings: LoopSettings,
        source: S,
        actuator: A,
        tx_err: Sender<anyhow::Error>,
    ) -> Self {
        Self {
            curve,
            settings,
            source,
            actuator,
            state: ControllerState::default(),
            tx_err,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Run one cycle per tick until the token is cancelled, then stop the fan.
    ///
    /// Cancellation is only observed between cycles. The returned error is
    /// the failure of the final stop command, every other failure is
    /// reported on the error channel and retried on the next tick.
    pub async fn run<T: Ticker + Send>(
        &mut self,
        mut ticker: T,
        run_token: CancellationToken,
    ) -> Result<(), PifanError> {
        info!("Control loop: Running");

        loop {
            select! {
                biased;

                _ = run_token.cancelled() => {
                    info!("Control loop: Quiting");

                    break;
                },
                _ = ticker.tick() => {}
            }

            self.cycle().instrument(trace_span!("cycle")).await;
        }

        self.shutdown().await
    }

    /// Sense, decide and act once.
    pub async fn cycle(&mut self) {
        let temp = match self.read_temp().await {
            Ok(temp) => temp,
            Err(err) => {
                // Keep the fan as it is, the state only changes
                // on a real sample
                self.state.sensor_failures += 1;
                warn!(
                    "Temperature unavailable ({} in a row), holding {}: {}",
                    self.state.sensor_failures,
                    self.describe_last_command(),
                    err
                );

                let count = self.state.sensor_failures;
                self.escalate(count, err.into()).await;

                return;
            }
        };

        self.state.sensor_failures = 0;
        self.state.last_temp = Some(temp);

        let previous = self.state.activation;
        let (activation, command) = decide(temp, &self.curve, previous);

        if activation != previous {
            info!(
                "Fan {} at {:.1}°C (was {})",
                activation, temp, previous
            );
        }

        debug!(
            "temp: {:.1}°C - state: {} - command: {:?}",
            temp, activation, command
        );

        self.state.activation = activation;

        match self.apply(command).await {
            Ok(()) => {
                self.state.actuator_failures = 0;
                self.state.last_command = Some(command);
            }
            Err(err) => {
                self.state.actuator_failures += 1;
                warn!(
                    "Failed to apply {:?} ({} in a row): {}",
                    command, self.state.actuator_failures, err
                );

                let count = self.state.actuator_failures;
                self.escalate(count, err.into()).await;
            }
        }
    }

    // Command the fan to stop, retrying a few times before giving up
    pub async fn shutdown(&mut self) -> Result<(), PifanError> {
        let mut attempt = 1;

        loop {
            match self.actuator.stop().await {
                Ok(()) => {
                    info!("Fan stopped");
                    self.state.last_command = Some(DutyCommand::Stop);

                    return Ok(());
                }
                Err(err) if attempt < STOP_ATTEMPTS => {
                    warn!("Failed to stop fan (attempt {}): {}", attempt, err);

                    attempt += 1;
                    tokio::time::sleep(STOP_RETRY_DELAY).await;
                }
                Err(err) => {
                    error!("Giving up stopping the fan: {}", err);

                    return Err(err.into());
                }
            }
        }
    }

    async fn read_temp(&mut self) -> Result<f32, SensorError> {
        let timeout = self.settings.sensor_timeout;

        match tokio::time::timeout(timeout, self.source.read()).await {
            Ok(result) => result,
            Err(_) => Err(SensorError::Timeout(timeout)),
        }
    }

    async fn apply(
        &mut self,
        command: DutyCommand,
    ) -> Result<(), ActuatorError> {
        trace!("Applying {:?}", command);

        match command {
            DutyCommand::Stop => self.actuator.stop().await,
            DutyCommand::Drive(speed) => self.actuator.set_duty(speed).await,
        }
    }

    // Forward every `failure_alert_threshold`-th consecutive failure
    // to the error channel
    async fn escalate(&mut self, count: u32, err: PifanError) {
        let threshold = self.settings.failure_alert_threshold.max(1);

        if count % threshold != 0 {
            return;
        }

        let err = anyhow!(err).context(format!(
            "Fan control failed {count} consecutive times"
        ));

        self.tx_err.send(err).await.unwrap_or_else(|err| {
            error!("Control loop: Couldn't send error to channel: {err}")
        });
    }

    fn describe_last_command(&self) -> String {
        match self.state.last_command {
            Some(DutyCommand::Drive(speed)) => format!("fan at {speed}"),
            Some(DutyCommand::Stop) => "fan stopped".to_string(),
            None => "initial fan state".to_string(),
        }
    }
}
