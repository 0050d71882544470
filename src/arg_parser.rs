use std::path::PathBuf;

use argparse::{ArgumentParser, Print, Store, StoreTrue};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/pifan/config.json";

pub struct ArgsOptions {
    pub config_file_path: PathBuf,
    pub verbose: bool,
}

impl ArgsOptions {
    pub fn parse() -> Self {
        let mut options = ArgsOptions::default();

        {
            let mut parser = ArgumentParser::new();
            parser.set_description(
                "Control a PWM fan based on the CPU temperature",
            );

            // Configuration file path
            parser.refer(&mut options.config_file_path).add_option(
                &["-c", "--config"],
                Store,
                "The file path of the configuration file, \
                 built-in defaults are used if it doesn't exist",
            );

            parser.refer(&mut options.verbose).add_option(
                &["-v", "--verbose"],
                StoreTrue,
                "Enable verbose output",
            );

            // Show daemon version
            parser.add_option(
                &["-V", "--version"],
                Print(env!("CARGO_PKG_VERSION").to_string()),
                "Show the daemon version"
            );

            parser.parse_args_or_exit();
        }

        options
    }
}

impl Default for ArgsOptions {
    fn default() -> Self {
        Self {
            config_file_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            verbose: false,
        }
    }
}
