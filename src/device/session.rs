use std::sync::Arc;
use indexmap::IndexMap;
use log::{debug, info, warn};
use tokio::time::{sleep, Duration, Instant};
use uuid::Uuid;

use crate::device::constants::{COMMAND_RESTART, OPERATION_DEADLINE, SCAN_POLL_DELAY};
use crate::device::encoding::{encode_byte, encode_input, encode_text};
use crate::device::queue::{OperationHandle, OperationQueue};
use crate::device::registry::Parameter;
use crate::device::relay::{StatusRelay, StatusSubscriber};
use crate::device::transport::{Link, Transport};
use crate::device::types::{DeviceEvent, DeviceSelector, DeviceState, GattRequest, OperationKind, PeripheralInfo, RequestId};
use crate::error::DeviceError;

struct ActiveConnection {
    peripheral: PeripheralInfo,
    link: Arc<dyn Link>,
    queue: OperationQueue,
    services: usize,
}

enum ConnectionState {
    Disconnected,
    Connecting {
        peripheral: PeripheralInfo,
    },
    Connected(ActiveConnection),
}

/// Owns the scan results and the single connection to the clock.
///
/// Operations never fail towards the caller: every problem is published on the status relay, and
/// operations that reached the clock also resolve through their [`OperationHandle`].
pub struct Session<T: Transport> {
    transport: Arc<T>,
    relay: StatusRelay,
    operation_deadline: Duration,
    scanning: bool,
    scan_error: Option<DeviceError>,
    devices: IndexMap<String, PeripheralInfo>,
    connection: ConnectionState,
    next_request: u64,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Session {
            transport: Arc::new(transport),
            relay: StatusRelay::new(),
            operation_deadline: Duration::from_millis(OPERATION_DEADLINE),
            scanning: false,
            scan_error: None,
            devices: IndexMap::new(),
            connection: ConnectionState::Disconnected,
            next_request: 1,
        }
    }

    pub fn with_operation_deadline(mut self, deadline: Duration) -> Self {
        self.operation_deadline = deadline;
        self
    }

    pub fn subscribe(&self) -> StatusSubscriber {
        self.relay.subscribe()
    }

    pub fn state(&self) -> DeviceState {
        match &self.connection {
            ConnectionState::Disconnected => DeviceState::Disconnected,
            ConnectionState::Connecting { .. } => DeviceState::Connecting,
            ConnectionState::Connected(active) => DeviceState::Connected { services: active.services },
        }
    }

    pub fn connected_peripheral(&self) -> Option<&PeripheralInfo> {
        match &self.connection {
            ConnectionState::Connected(active) => Some(&active.peripheral),
            ConnectionState::Connecting { peripheral } => Some(peripheral),
            ConnectionState::Disconnected => None,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Why the last scan could not start, if it could not.
    pub fn scan_error(&self) -> Option<&DeviceError> {
        self.scan_error.as_ref()
    }

    /// Peripherals found by the current scan, in discovery order.
    pub fn devices(&self) -> Vec<PeripheralInfo> {
        self.devices.values().cloned().collect()
    }

    // ------------------ Scanning ------------------

    pub async fn start_scan(&mut self, service_filter: Option<Uuid>) {
        self.devices.clear();

        if let Err(err) = self.transport.start_scan(service_filter).await {
            self.scanning = false;
            self.scan_error = Some(err.clone());
            self.relay.publish(DeviceEvent::Error(err));
            return;
        }

        self.scan_error = None;
        self.scanning = true;
        self.relay.publish(DeviceEvent::ScanStarted);
    }

    /// Collects new scan results. Returns how many peripherals were new.
    pub async fn poll_scan(&mut self) -> usize {
        if !self.scanning {
            return 0;
        }

        let peripherals = match self.transport.peripherals().await {
            Ok(v) => v,
            Err(err) => {
                warn!("Failed to query scan results: {}", err);
                return 0;
            },
        };

        let mut added = 0;
        for peripheral in peripherals {
            // unnamed peripherals are never clocks
            if peripheral.name.is_none() || self.devices.contains_key(&peripheral.address) {
                continue;
            }

            self.devices.insert(peripheral.address.clone(), peripheral.clone());
            self.relay.publish(DeviceEvent::Discovered(peripheral));
            added += 1;
        }
        added
    }

    pub async fn stop_scan(&mut self) {
        if !self.scanning {
            return;
        }

        if let Err(err) = self.transport.stop_scan().await {
            warn!("Failed to stop scanning: {}", err);
        }
        self.scanning = false;
        self.relay.publish(DeviceEvent::ScanStopped);
    }

    /// Scans for `duration` and returns everything found.
    pub async fn scan_for(&mut self, service_filter: Option<Uuid>, duration: Duration) -> Vec<PeripheralInfo> {
        self.start_scan(service_filter).await;

        let deadline = Instant::now() + duration;
        while self.scanning && Instant::now() < deadline {
            self.poll_scan().await;
            sleep(Duration::from_millis(SCAN_POLL_DELAY)).await;
        }
        self.poll_scan().await;

        self.stop_scan().await;
        self.devices()
    }

    /// Scans until a peripheral matches `selector` or `duration` runs out.
    pub async fn find_peripheral(
        &mut self,
        service_filter: Option<Uuid>,
        selector: &DeviceSelector,
        duration: Duration,
    ) -> Option<PeripheralInfo> {
        self.start_scan(service_filter).await;

        let deadline = Instant::now() + duration;
        let mut found = None;
        while self.scanning {
            self.poll_scan().await;
            found = self.devices.values().find(|p| selector.matches(p)).cloned();

            if found.is_some() || Instant::now() >= deadline {
                break;
            }
            sleep(Duration::from_millis(SCAN_POLL_DELAY)).await;
        }

        self.stop_scan().await;

        if found.is_none() {
            debug!("No peripherals matched {:?}", selector);
        }
        found
    }

    // ------------------ Connection ------------------

    /// Connects to `peripheral` and discovers its services. Any previous connection is closed first.
    pub async fn connect_to(&mut self, peripheral: PeripheralInfo) -> DeviceState {
        self.stop_scan().await;
        self.disconnect().await;

        self.connection = ConnectionState::Connecting { peripheral: peripheral.clone() };
        self.relay.publish(DeviceEvent::Connecting(peripheral.clone()));

        let link = match self.transport.connect(&peripheral).await {
            Ok(link) => link,
            Err(err) => {
                warn!("Connecting to peripheral failed: {:?}", err);
                self.connection = ConnectionState::Disconnected;
                self.relay.publish(DeviceEvent::Error(err));
                return self.state();
            },
        };
        self.relay.publish(DeviceEvent::Connected(peripheral.clone()));

        let services = match link.discover_services().await {
            Ok(count) => count,
            Err(err) => {
                warn!("Discovering services failed: {:?}", err);
                if let Err(err) = link.disconnect().await {
                    debug!("Disconnect after failed discovery: {:?}", err);
                }
                self.connection = ConnectionState::Disconnected;
                self.relay.publish(DeviceEvent::Error(err));
                self.relay.publish(DeviceEvent::Disconnected);
                return self.state();
            },
        };
        self.relay.publish(DeviceEvent::ServicesDiscovered(services));

        let queue = OperationQueue::start(link.clone(), self.relay.clone(), self.operation_deadline);
        self.connection = ConnectionState::Connected(ActiveConnection { peripheral, link, queue, services });
        info!("Peripheral ready");

        self.state()
    }

    /// Closes the connection. Does nothing when already disconnected.
    pub async fn disconnect(&mut self) {
        let previous = std::mem::replace(&mut self.connection, ConnectionState::Disconnected);

        let ConnectionState::Connected(active) = previous else {
            return;
        };

        active.queue.close().await;
        if let Err(err) = active.link.disconnect().await {
            warn!("Failed to disconnect cleanly: {:?}", err);
        }
        self.relay.publish(DeviceEvent::Disconnected);
    }

    /// Checks that the link is still up. A lost link ends the session.
    pub async fn check_connection(&mut self) -> DeviceState {
        let alive = match &self.connection {
            ConnectionState::Connected(active) => match active.link.is_connected().await {
                Ok(alive) => alive,
                Err(err) => {
                    warn!("Error checking for connection state: {:?}", err);
                    false
                },
            },
            _ => return self.state(),
        };

        if !alive {
            warn!("Connection lost");
            self.disconnect().await;
        }
        self.state()
    }

    // ------------------ Raw GATT operations ------------------

    async fn enqueue(&mut self, kind: OperationKind, service: Uuid, characteristic: Uuid, payload: Vec<u8>) -> Option<OperationHandle> {
        let ConnectionState::Connected(active) = &self.connection else {
            self.relay.publish(DeviceEvent::Error(DeviceError::NoActiveConnection));
            return None;
        };

        let request = GattRequest {
            id: RequestId(self.next_request),
            kind,
            service,
            characteristic,
            payload,
        };
        self.next_request += 1;

        self.relay.publish(DeviceEvent::Requested(request.clone()));
        match active.queue.push(request).await {
            Ok(handle) => Some(handle),
            Err(err) => {
                self.relay.publish(DeviceEvent::Error(err));
                None
            },
        }
    }

    pub async fn read_characteristic(&mut self, service: Uuid, characteristic: Uuid) -> Option<OperationHandle> {
        self.enqueue(OperationKind::Read, service, characteristic, Vec::new()).await
    }

    pub async fn write_characteristic(&mut self, service: Uuid, characteristic: Uuid, value: Vec<u8>) -> Option<OperationHandle> {
        self.enqueue(OperationKind::Write, service, characteristic, value).await
    }

    // ------------------ Configuration reads ------------------

    pub async fn read_parameter(&mut self, parameter: Parameter) -> Option<OperationHandle> {
        let descriptor = parameter.descriptor();
        if !descriptor.is_readable() {
            self.relay.publish(DeviceEvent::Error(DeviceError::WriteOnly { parameter: descriptor.name }));
            return None;
        }
        self.read_characteristic(descriptor.service_uuid(), descriptor.characteristic).await
    }

    /// Requests every readable parameter. Each request resolves on its own.
    pub async fn read_all_settings(&mut self) -> Vec<OperationHandle> {
        let mut handles = Vec::new();
        for parameter in Parameter::readable() {
            if let Some(handle) = self.read_parameter(parameter).await {
                handles.push(handle);
            }
        }
        handles
    }

    pub async fn read_brightness(&mut self) -> Option<OperationHandle> {
        self.read_parameter(Parameter::DisplayBright).await
    }

    pub async fn read_time_zone(&mut self) -> Option<OperationHandle> {
        self.read_parameter(Parameter::TimeZone).await
    }

    // ------------------ Configuration writes ------------------

    async fn write_raw(&mut self, parameter: Parameter, value: Vec<u8>) -> Option<OperationHandle> {
        let descriptor = parameter.descriptor();
        self.write_characteristic(descriptor.service_uuid(), descriptor.characteristic, value).await
    }

    /// Writes user input to `parameter`, encoded according to its value kind.
    pub async fn write_parameter(&mut self, parameter: Parameter, input: &str) -> Option<OperationHandle> {
        let descriptor = parameter.descriptor();
        if !descriptor.is_writable() {
            self.relay.publish(DeviceEvent::Error(DeviceError::ReadOnly { parameter: descriptor.name }));
            return None;
        }

        match encode_input(parameter, input) {
            Ok(value) => self.write_raw(parameter, value).await,
            Err(err) => {
                self.relay.publish(DeviceEvent::Error(err));
                None
            },
        }
    }

    /// Values outside 0-255 wrap around.
    pub async fn write_brightness(&mut self, value: i64) -> Option<OperationHandle> {
        self.write_raw(Parameter::DisplayBright, encode_byte(value)).await
    }

    pub async fn write_time_zone(&mut self, time_zone: &str) -> Option<OperationHandle> {
        self.write_raw(Parameter::TimeZone, encode_text(time_zone)).await
    }

    pub async fn write_canvas_server(&mut self, url: &str) -> Option<OperationHandle> {
        self.write_raw(Parameter::CanvasServer, encode_text(url)).await
    }

    /// Writes the SSID, then the password.
    pub async fn set_wifi(&mut self, ssid: &str, password: &str) -> Vec<OperationHandle> {
        let mut handles = Vec::new();
        handles.extend(self.write_raw(Parameter::WifiSsid, encode_text(ssid)).await);
        handles.extend(self.write_raw(Parameter::WifiPwd, encode_text(password)).await);
        handles
    }

    pub async fn restart_device(&mut self) -> Option<OperationHandle> {
        self.write_raw(Parameter::Restart, COMMAND_RESTART.to_vec()).await
    }
}
