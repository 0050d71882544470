pub mod arg_parser;
pub mod config;
pub mod control_loop;
pub mod errors;
pub mod fan_curve;
pub mod logger;
pub mod pwm;
pub mod sensor;
pub mod signals;
pub mod ticker;

#[cfg(test)]
mod test_utils;
