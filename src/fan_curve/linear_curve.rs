use crate::fan_curve::{FanCurveConfig, FanSpeed};

/// Map a temperature to the duty of a running fan.
///
/// The curve is a straight line from (`trigger_temp`, `fan_active_min_speed`)
/// to (`cpu_temp_max`, 100), flat outside of that interval. The result is
/// always within `fan_active_min_speed..=100`.
///
/// Only meaningful while the hysteresis gate is active, a stopped fan is
/// not the concern of the curve.
pub fn compute_duty(temp: f32, cfg: &FanCurveConfig) -> FanSpeed {
    // Unknown temperature, run at full speed for safety
    if temp.is_nan() {
        return FanSpeed::MAX;
    }

    if temp <= cfg.trigger_temp {
        return cfg.min_speed();
    }

    if temp >= cfg.cpu_temp_max {
        return FanSpeed::MAX;
    }

    linear_interpolation(
        (cfg.trigger_temp, cfg.min_speed()),
        (cfg.cpu_temp_max, FanSpeed::MAX),
        temp,
    )
}

// Perform the linear interpolation between
// two points and return the fan speed
fn linear_interpolation(
    pre: (f32, FanSpeed),
    suc: (f32, FanSpeed),
    temp: f32,
) -> FanSpeed {
    let (x1, y1) = (pre.0, pre.1.get() as f32);
    let (x2, y2) = (suc.0, suc.1.get() as f32);

    let speed = y1 + (temp - x1) / (x2 - x1) * (y2 - y1);

    FanSpeed::new(speed.round().clamp(y1, y2) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> FanCurveConfig {
        FanCurveConfig::default()
    }

    #[test]
    fn below_trigger_returns_min_speed() {
        let cfg = defaults();

        for temp in [-40.0, 0.0, 20.0, 44.9, 47.0, 49.99, 50.0] {
            assert_eq!(compute_duty(temp, &cfg).get(), 20, "temp {temp}");
        }
    }

    #[test]
    fn above_max_returns_full_speed() {
        let cfg = defaults();

        for temp in [80.0, 80.01, 90.0, 150.0, f32::INFINITY] {
            assert_eq!(compute_duty(temp, &cfg), FanSpeed::MAX, "temp {temp}");
        }
    }

    #[test]
    fn interpolates_between_trigger_and_max() {
        let cfg = defaults();

        assert_eq!(compute_duty(65.0, &cfg).get(), 60);
        assert_eq!(compute_duty(57.5, &cfg).get(), 40);
        // 20 + (1 / 30) * 80 = 22.67
        assert_eq!(compute_duty(51.0, &cfg).get(), 23);
        // 20 + (29 / 30) * 80 = 97.33
        assert_eq!(compute_duty(79.0, &cfg).get(), 97);
    }

    #[test]
    fn is_monotonically_non_decreasing() {
        let configs = [
            defaults(),
            FanCurveConfig {
                trigger_temp: 35.0,
                cpu_temp_max: 36.5,
                fan_active_min_speed: 0,
                hysteresis: 2.0,
            },
            FanCurveConfig {
                trigger_temp: 60.0,
                cpu_temp_max: 95.0,
                fan_active_min_speed: 100,
                hysteresis: 10.0,
            },
        ];

        for cfg in configs {
            let mut last = compute_duty(-50.0, &cfg);
            let mut temp = -50.0_f32;

            while temp < 150.0 {
                temp += 0.05;
                let speed = compute_duty(temp, &cfg);

                assert!(speed >= last, "{cfg:?} decreased at {temp}");
                assert!(speed >= cfg.min_speed());
                last = speed;
            }
        }
    }

    #[test]
    fn nan_runs_at_full_speed() {
        assert_eq!(compute_duty(f32::NAN, &defaults()), FanSpeed::MAX);
    }
}
