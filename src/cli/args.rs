use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "clockwise-ble", version, about = "Configure a Clockwise LED clock over Bluetooth LE")]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose { LevelFilter::Debug } else { LevelFilter::Info }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Address or name of the clock; defaults to the configured one, then to the first clock found
    #[arg(short, long)]
    pub device: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List nearby peripherals
    Scan {
        #[arg(long)]
        duration_ms: Option<u64>,
        /// Only list peripherals advertising this service
        #[arg(long)]
        service: Option<Uuid>,
    },
    /// List the known parameters
    Params,
    /// Read parameters from the clock (all of them when none are given)
    Read {
        #[command(flatten)]
        device: DeviceArgs,
        /// One parameter per line as name=value
        #[arg(long)]
        flat: bool,
        parameters: Vec<String>,
    },
    /// Write one parameter
    Write {
        #[command(flatten)]
        device: DeviceArgs,
        parameter: String,
        value: String,
    },
    /// Set the display brightness (0-255)
    Brightness {
        #[command(flatten)]
        device: DeviceArgs,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    /// Set the time zone, e.g. America/Toronto
    TimeZone {
        #[command(flatten)]
        device: DeviceArgs,
        time_zone: String,
    },
    /// Set the canvas server URL
    CanvasServer {
        #[command(flatten)]
        device: DeviceArgs,
        url: String,
    },
    /// Set the Wi-Fi credentials
    Wifi {
        #[command(flatten)]
        device: DeviceArgs,
        ssid: String,
        password: String,
    },
    /// Restart the clock
    Restart {
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Stay connected and print every status line until interrupted
    Watch {
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Show or change the settings of this tool
    Config {
        /// Clock to use by default
        #[arg(long)]
        device: Option<String>,
        /// Forget the default clock
        #[arg(long, conflicts_with = "device")]
        clear_device: bool,
        #[arg(long)]
        scan_duration_ms: Option<u64>,
        #[arg(long)]
        operation_deadline_ms: Option<u64>,
    },
}
