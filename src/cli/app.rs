use futures::future::join_all;
use log::{error, info, warn};
use tokio::time::{sleep, Duration};

use crate::cli::args::{Cli, Command, DeviceArgs};
use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::device::btle::BtleTransport;
use crate::device::constants::CONNECTION_CHECK_DELAY;
use crate::device::queue::OperationHandle;
use crate::device::registry::Parameter;
use crate::device::session::Session;
use crate::device::transport::Transport;
use crate::device::types::DeviceState;
use crate::error::AppRunError;
use crate::view::cache::ParameterCache;
use crate::view::render::{render_devices, render_flat, render_registry, render_sectioned};

async fn load_config(config_io: &ConfigIO) -> Config {
    match config_io.read().await {
        Ok(config) => config,
        Err(err) => {
            if err.is_file_not_found_error() {
                // this is probably the first start
                info!("Config file not found, using defaults");
            } else {
                error!("Failed to load config, using defaults: {}", &err);
            }
            Config::default()
        },
    }
}

async fn open_transport(config: &Config) -> Result<BtleTransport, AppRunError> {
    Ok(BtleTransport::new(config.connect_deadline()).await?)
}

/// Finds the clock and connects to it.
pub async fn connect_session<T: Transport>(
    transport: T,
    config: &Config,
    device: &DeviceArgs,
) -> Result<Session<T>, AppRunError> {
    let mut session = Session::new(transport).with_operation_deadline(config.operation_deadline());
    let selector = config.selector(device.device.as_deref());

    let Some(peripheral) = session.find_peripheral(config.scan_service, &selector, config.scan_duration()).await else {
        if let Some(err) = session.scan_error() {
            return Err(AppRunError::Device { source: err.clone() });
        }
        return Err(AppRunError::NoPeripheral);
    };

    match session.connect_to(peripheral).await {
        DeviceState::Connected { .. } => Ok(session),
        _ => Err(AppRunError::NotConnected),
    }
}

/// Waits for every handle, feeds the results into `cache` and disconnects.
pub async fn finish<T: Transport>(
    mut session: Session<T>,
    handles: Vec<OperationHandle>,
    expected: usize,
    cache: &mut ParameterCache,
) -> Result<(), AppRunError> {
    let outcomes = join_all(handles.into_iter().map(|handle| handle.wait())).await;

    let mut failed = expected.saturating_sub(outcomes.len());
    for outcome in &outcomes {
        if outcome.is_ok() {
            cache.apply_outcome(outcome);
        } else {
            failed += 1;
        }
    }

    session.disconnect().await;

    if failed > 0 {
        return Err(AppRunError::OperationsFailed { failed, total: expected });
    }
    Ok(())
}

async fn watch<T: Transport>(mut session: Session<T>) -> Result<(), AppRunError> {
    let mut subscriber = session.subscribe();
    let mut cache = ParameterCache::new();

    session.read_all_settings().await;

    'mainloop: loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break 'mainloop;
            },
            _ = sleep(Duration::from_millis(CONNECTION_CHECK_DELAY)) => {
                if session.check_connection().await == DeviceState::Disconnected {
                    break 'mainloop;
                }
            },
            Some(event) = subscriber.next() => {
                println!("Status: {}", event);
                if cache.apply_event(&event) {
                    print!("{}", render_flat(&cache));
                }
            },
        }
    }

    session.disconnect().await;
    Ok(())
}

fn parse_parameters(names: &[String]) -> Result<Vec<Parameter>, AppRunError> {
    let mut parameters = Vec::with_capacity(names.len());
    for name in names {
        parameters.push(name.parse::<Parameter>()?);
    }
    Ok(parameters)
}

async fn update_config(config_io: &ConfigIO, mut config: Config, command: &Command) -> Result<(), AppRunError> {
    let Command::Config { device, clear_device, scan_duration_ms, operation_deadline_ms } = command else {
        return Ok(());
    };

    let mut dirty = false;
    if let Some(device) = device {
        config.device = Some(device.clone());
        dirty = true;
    }
    if *clear_device {
        config.device = None;
        dirty = true;
    }
    if let Some(duration) = scan_duration_ms {
        config.scan_duration_ms = *duration;
        dirty = true;
    }
    if let Some(deadline) = operation_deadline_ms {
        config.operation_deadline_ms = *deadline;
        dirty = true;
    }

    if dirty {
        config_io.save(&config).await?;
    }

    println!("{}", config_io.path().to_string_lossy());
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(err) => warn!("Failed to format config: {}", err),
    }
    Ok(())
}

pub async fn run_command(cli: Cli) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync(cli.config.clone())?;
    let config = load_config(&config_io).await;

    match &cli.command {
        Command::Params => {
            print!("{}", render_registry());
            return Ok(());
        },
        Command::Config { .. } => {
            let mut locker = config_io.locker()?;
            let _guard = locker.lock()?;
            return update_config(&config_io, config, &cli.command).await;
        },
        _ => {},
    }

    // only one instance may drive the radio at a time
    let mut locker = config_io.locker()?;
    let _guard = locker.lock()?;

    let transport = open_transport(&config).await?;
    let mut cache = ParameterCache::new();

    match cli.command {
        Command::Params | Command::Config { .. } => Ok(()),
        Command::Scan { duration_ms, service } => {
            let mut session = Session::new(transport);
            let duration = duration_ms.map(Duration::from_millis).unwrap_or(config.scan_duration());

            let devices = session.scan_for(service.or(config.scan_service), duration).await;
            if let Some(err) = session.scan_error() {
                return Err(AppRunError::Device { source: err.clone() });
            }
            print!("{}", render_devices(&devices));
            Ok(())
        },
        Command::Read { device, flat, parameters } => {
            let parameters = parse_parameters(&parameters)?;
            let mut session = connect_session(transport, &config, &device).await?;

            let handles = if parameters.is_empty() {
                session.read_all_settings().await
            } else {
                let mut handles = Vec::new();
                for parameter in &parameters {
                    handles.extend(session.read_parameter(*parameter).await);
                }
                handles
            };
            let expected = if parameters.is_empty() { Parameter::readable().len() } else { parameters.len() };

            let result = finish(session, handles, expected, &mut cache).await;
            print!("{}", if flat { render_flat(&cache) } else { render_sectioned(&cache) });
            result
        },
        Command::Write { device, parameter, value } => {
            let parameter = parameter.parse::<Parameter>()?;
            let mut session = connect_session(transport, &config, &device).await?;

            let handles: Vec<_> = session.write_parameter(parameter, &value).await.into_iter().collect();
            finish(session, handles, 1, &mut cache).await
        },
        Command::Brightness { device, value } => {
            let mut session = connect_session(transport, &config, &device).await?;
            let handles: Vec<_> = session.write_brightness(value).await.into_iter().collect();
            finish(session, handles, 1, &mut cache).await
        },
        Command::TimeZone { device, time_zone } => {
            let mut session = connect_session(transport, &config, &device).await?;
            let handles: Vec<_> = session.write_time_zone(&time_zone).await.into_iter().collect();
            finish(session, handles, 1, &mut cache).await
        },
        Command::CanvasServer { device, url } => {
            let mut session = connect_session(transport, &config, &device).await?;
            let handles: Vec<_> = session.write_canvas_server(&url).await.into_iter().collect();
            finish(session, handles, 1, &mut cache).await
        },
        Command::Wifi { device, ssid, password } => {
            let mut session = connect_session(transport, &config, &device).await?;
            let handles = session.set_wifi(&ssid, &password).await;
            finish(session, handles, 2, &mut cache).await
        },
        Command::Restart { device } => {
            let mut session = connect_session(transport, &config, &device).await?;
            let handles: Vec<_> = session.restart_device().await.into_iter().collect();
            finish(session, handles, 1, &mut cache).await
        },
        Command::Watch { device } => {
            let session = connect_session(transport, &config, &device).await?;
            watch(session).await
        },
    }
}
