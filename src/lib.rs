use std::env;
use log::LevelFilter;
use crate::cli::app::run_command;
use crate::cli::args::Cli;
use crate::error::AppRunError;

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod view;

pub fn init_logging(level: LevelFilter) {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

pub fn run(cli: Cli) -> Result<(), AppRunError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| AppRunError::Runtime { source })?;

    runtime.block_on(run_command(cli))
}
