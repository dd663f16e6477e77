//! In-memory stand-in for the bluetooth radio, used by the tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use uuid::Uuid;

use crate::device::constants::{make_uuid, make_device_config_service_uuid};
use crate::device::registry::{Parameter, ValueKind};
use crate::device::transport::{Link, Transport};
use crate::device::types::PeripheralInfo;
use crate::error::DeviceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeOp {
    StartScan(Option<Uuid>),
    StopScan,
    Connect(String),
    Disconnect,
    Read { characteristic: Uuid },
    Write { characteristic: Uuid, value: Vec<u8>, without_response: bool },
}

#[derive(Debug, Clone)]
struct FakeCharacteristic {
    service: Uuid,
    value: Vec<u8>,
    without_response: bool,
}

#[derive(Debug, Default)]
struct FakeState {
    advertised: Vec<PeripheralInfo>,
    scanning: bool,
    deny_permission: bool,
    fail_connect: bool,
    reject_writes: bool,
    stall_reads: bool,
    connected: bool,
    service_count: usize,
    characteristics: HashMap<Uuid, FakeCharacteristic>,
    log: Vec<FakeOp>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

pub fn clock_peripheral(address: &str, name: &str) -> PeripheralInfo {
    PeripheralInfo {
        address: address.to_string(),
        name: Some(name.to_string()),
        rssi: Some(-55),
        services: vec![make_device_config_service_uuid()],
    }
}

impl FakeTransport {
    /// A radio that sees one clock exposing every registry characteristic.
    pub fn with_clock() -> Self {
        let fake = FakeTransport::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.advertised.push(clock_peripheral("AA:BB:CC:DD:EE:01", "Clockwise"));
            state.service_count = 4;

            for parameter in Parameter::all() {
                let descriptor = parameter.descriptor();
                state.characteristics.insert(descriptor.characteristic, FakeCharacteristic {
                    service: descriptor.service_uuid(),
                    value: Vec::new(),
                    without_response: descriptor.kind == ValueKind::Byte && !descriptor.is_readable(),
                });
            }
        }
        fake
    }

    pub fn advertise(&self, peripherals: Vec<PeripheralInfo>) {
        self.state.lock().unwrap().advertised = peripherals;
    }

    pub fn deny_permission(&self) {
        self.state.lock().unwrap().deny_permission = true;
    }

    pub fn fail_connect(&self) {
        self.state.lock().unwrap().fail_connect = true;
    }

    pub fn reject_writes(&self) {
        self.state.lock().unwrap().reject_writes = true;
    }

    pub fn stall_reads(&self) {
        self.state.lock().unwrap().stall_reads = true;
    }

    pub fn drop_connection(&self) {
        self.state.lock().unwrap().connected = false;
    }

    pub fn remove_characteristic(&self, characteristic: &str) {
        self.state.lock().unwrap().characteristics.remove(&make_uuid(characteristic));
    }

    pub fn set_value(&self, characteristic: &str, value: &[u8]) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.characteristics.get_mut(&make_uuid(characteristic)) {
            entry.value = value.to_vec();
        }
    }

    pub fn value(&self, characteristic: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.characteristics.get(&make_uuid(characteristic)).map(|entry| entry.value.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    pub fn link(&self) -> Arc<dyn Link> {
        Arc::new(FakeLink { state: self.state.clone() })
    }

    /// Every call made against the fake.
    pub fn calls(&self) -> Vec<FakeOp> {
        self.state.lock().unwrap().log.clone()
    }

    /// Only the GATT reads and writes.
    pub fn operations(&self) -> Vec<FakeOp> {
        self.calls()
            .into_iter()
            .filter(|op| matches!(op, FakeOp::Read { .. } | FakeOp::Write { .. }))
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn start_scan(&self, service_filter: Option<Uuid>) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        if state.deny_permission {
            return Err(DeviceError::PermissionDenied);
        }
        state.log.push(FakeOp::StartScan(service_filter));
        state.scanning = true;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(FakeOp::StopScan);
        state.scanning = false;
        Ok(())
    }

    async fn peripherals(&self) -> Result<Vec<PeripheralInfo>, DeviceError> {
        let state = self.state.lock().unwrap();
        if !state.scanning {
            return Ok(Vec::new());
        }
        Ok(state.advertised.clone())
    }

    async fn connect(&self, peripheral: &PeripheralInfo) -> Result<Arc<dyn Link>, DeviceError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.deny_permission {
                return Err(DeviceError::PermissionDenied);
            }
            state.log.push(FakeOp::Connect(peripheral.address.clone()));
            if state.fail_connect {
                return Err(DeviceError::ConnectFailed { reason: "out of range".to_string() });
            }
            state.connected = true;
        }
        Ok(self.link())
    }
}

struct FakeLink {
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl Link for FakeLink {
    async fn discover_services(&self) -> Result<usize, DeviceError> {
        Ok(self.state.lock().unwrap().service_count)
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, DeviceError> {
        let (stall, value) = {
            let mut state = self.state.lock().unwrap();
            state.log.push(FakeOp::Read { characteristic });
            let value = state.characteristics
                .get(&characteristic)
                .filter(|entry| entry.service == service)
                .map(|entry| entry.value.clone());
            (state.stall_reads, value)
        };

        if stall {
            std::future::pending::<()>().await;
        }

        value.ok_or(DeviceError::CharacteristicNotFound { characteristic })
    }

    async fn write(&self, service: Uuid, characteristic: Uuid, value: &[u8]) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        let reject = state.reject_writes;

        let Some(entry) = state.characteristics.get_mut(&characteristic).filter(|entry| entry.service == service) else {
            return Err(DeviceError::CharacteristicNotFound { characteristic });
        };
        let without_response = entry.without_response;
        if !reject {
            entry.value = value.to_vec();
        }

        state.log.push(FakeOp::Write { characteristic, value: value.to_vec(), without_response });
        if reject {
            return Err(DeviceError::WriteRejected { characteristic, reason: "GATT error 3".to_string() });
        }
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool, DeviceError> {
        Ok(self.state.lock().unwrap().connected)
    }

    async fn disconnect(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(FakeOp::Disconnect);
        state.connected = false;
        Ok(())
    }
}
