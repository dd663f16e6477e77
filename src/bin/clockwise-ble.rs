use clap::Parser;
use log::{error, info};
use clockwise_ble::{init_logging, run};
use clockwise_ble::cli::args::Cli;
use clockwise_ble::error::{AppRunError, ConfigError};

fn main() -> Result<(), AppRunError> {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    info!(concat!("Clockwise BLE ", env!("CARGO_PKG_VERSION")));

    match run(cli) {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            eprintln!("Another clockwise-ble instance is already talking to the clock");
            Ok(())
        },
        Err(err) => {
            error!("{}", err);
            Err(err)
        }
        Ok(_) => Ok(())
    }
}
