use anyhow::{Context, Result, anyhow};
use pifan::{
    arg_parser::ArgsOptions,
    config::Config,
    control_loop::ControlLoop,
    logger,
    pwm::{PwmActuator, SysfsPwm},
    sensor::{AveragingSource, SysfsTemperature},
    signals::ShutdownSignals,
    ticker::IntervalTicker,
};
use tokio::{select, sync::mpsc};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse the command line arguments
    let args_options = ArgsOptions::parse();

    logger::init_logging(args_options.verbose);

    // An invalid configuration must never reach the control loop
    let config = Config::load(&args_options.config_file_path)
        .with_context(|| "Refusing to start with an invalid configuration")?;

    info!("Configuration: {:?}", config);

    // Install the signal handlers before the fan is under control,
    // a signal must never kill the process without the final stop
    let mut signals = ShutdownSignals::install()
        .with_context(|| "Failed to install the signal handlers")?;

    let source = AveragingSource::new(
        SysfsTemperature::new(&config.cpu_temp_file, config.cpu_temp_unit),
        config.cpu_temp_sample_count,
        config.sample_delay(),
    );

    let actuator = SysfsPwm::open(
        &config.pwm_chip,
        config.pwm_channel,
        config.pwm_frequency,
    )
    .await
    .with_context(|| "Failed to set up the fan PWM output")?;

    // This token and tracker will be used to handle graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    // Persistent control failures are sent over this channel
    // and logged by the main task
    let (tx_err, mut rx_err) = mpsc::channel(16);

    // Start the control loop
    let control_loop_handle = {
        let token = token.clone();
        let ticker = IntervalTicker::new(config.update_interval());
        let mut control_loop = ControlLoop::new(
            config.curve,
            config.loop_settings(),
            source,
            actuator,
            tx_err,
        );

        tracker.spawn(async move { control_loop.run(ticker, token).await })
    };

    tracker.close();

    loop {
        select! {
            name = signals.recv() => {
                info!("Received {name}, shutting down");
                break;
            },
            err_msg = rx_err.recv() => {
                match err_msg {
                    Some(err) => {
                        for e in err.chain() {
                            error!("{e}");
                        }
                    }
                    // The control loop dropped its sender, it is gone
                    None => {
                        warn!("Control loop exited unexpectedly");
                        break;
                    }
                }
            }
        }
    }

    // Cancel the token to communicate the program
    // termination to the running tasks
    token.cancel();

    // Wait for the tasks to finish
    tracker.wait().await;

    match control_loop_handle.await {
        Ok(result) => {
            result.with_context(|| "Failed to stop the fan on exit")?
        }
        Err(join_err) => {
            error!("Control loop panicked: {join_err}");

            // Reopening the channel resets the duty cycle to zero
            let mut pwm = SysfsPwm::open(
                &config.pwm_chip,
                config.pwm_channel,
                config.pwm_frequency,
            )
            .await
            .with_context(|| "Failed to reopen the fan PWM output")?;
            pwm.stop()
                .await
                .with_context(|| "Failed to stop the fan on exit")?;

            return Err(anyhow!("Control loop panicked"));
        }
    }

    info!("Shutdown complete");

    Ok(())
}
