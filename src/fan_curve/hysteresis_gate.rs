use std::fmt;

use crate::fan_curve::FanCurveConfig;

// Whether the fan is allowed to spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Inactive,
    Active,
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Inactive => write!(f, "inactive"),
            Activation::Active => write!(f, "active"),
        }
    }
}

/// Advance the activation state with a new temperature sample.
///
/// An inactive fan starts once `temp >= trigger_temp`, an active fan stops
/// once `temp <= trigger_temp - hysteresis`. Anything in between keeps the
/// current state, so a temperature hovering around the trigger never
/// toggles the fan.
///
/// Returns the new state and whether the fan should be driven this cycle.
pub fn update(
    temp: f32,
    cfg: &FanCurveConfig,
    state: Activation,
) -> (Activation, bool) {
    let new_state = match state {
        Activation::Inactive if temp >= cfg.trigger_temp => Activation::Active,
        Activation::Active if temp <= cfg.deactivation_temp() => {
            Activation::Inactive
        }
        // NaN compares false and lands here as well
        _ => state,
    };

    (new_state, new_state == Activation::Active)
}
