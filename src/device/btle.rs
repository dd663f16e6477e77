use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use btleplug::api::{Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use crate::device::transport::{Link, Transport};
use crate::device::types::PeripheralInfo;
use crate::error::DeviceError;

/// Picks the write mode the characteristic advertises: unacknowledged when possible, acknowledged otherwise.
pub fn write_type_for(properties: CharPropFlags) -> WriteType {
    if properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
        WriteType::WithoutResponse
    } else {
        WriteType::WithResponse
    }
}

#[derive(Default)]
struct ScanState {
    adapters: Vec<Adapter>,
    service_filter: Option<Uuid>,
    // peripheral handles by address, needed again when connecting
    peripherals: HashMap<String, Peripheral>,
}

/// [`Transport`] backed by the platform bluetooth stack through btleplug.
pub struct BtleTransport {
    manager: Manager,
    connect_deadline: Duration,
    scan: Mutex<ScanState>,
}

impl BtleTransport {
    pub async fn new(connect_deadline: Duration) -> Result<Self, DeviceError> {
        let manager = Manager::new().await?;
        Ok(BtleTransport { manager, connect_deadline, scan: Mutex::new(ScanState::default()) })
    }

    async fn connect_peripheral(&self, peripheral: &Peripheral) -> Result<(), DeviceError> {
        if peripheral.is_connected().await? {
            debug!("Peripheral was already connected");
            return Ok(());
        }

        match timeout(self.connect_deadline, peripheral.connect()).await {
            Err(_) => Err(DeviceError::ConnectFailed { reason: "connecting took too long".to_string() }),
            Ok(Err(btleplug::Error::PermissionDenied)) => Err(DeviceError::PermissionDenied),
            Ok(Err(err)) => Err(DeviceError::ConnectFailed { reason: err.to_string() }),
            Ok(Ok(())) => Ok(()),
        }
    }
}

fn scan_error(err: btleplug::Error) -> DeviceError {
    match err {
        btleplug::Error::PermissionDenied => DeviceError::PermissionDenied,
        err => DeviceError::ScanFailed { reason: err.to_string() },
    }
}

#[async_trait]
impl Transport for BtleTransport {
    async fn start_scan(&self, service_filter: Option<Uuid>) -> Result<(), DeviceError> {
        let adapters = self.manager.adapters().await.map_err(scan_error)?;
        if adapters.is_empty() {
            return Err(DeviceError::NoAdapters);
        }

        let filter = ScanFilter {
            services: service_filter.into_iter().collect(),
        };

        for adapter in &adapters {
            info!("Scanning using adapter {}...", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));
            adapter.start_scan(filter.clone()).await.map_err(scan_error)?;
        }

        let mut scan = self.scan.lock().await;
        scan.adapters = adapters;
        scan.service_filter = service_filter;
        scan.peripherals.clear();
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), DeviceError> {
        let scan = self.scan.lock().await;
        for adapter in &scan.adapters {
            adapter.stop_scan().await?;
        }
        Ok(())
    }

    async fn peripherals(&self) -> Result<Vec<PeripheralInfo>, DeviceError> {
        let mut scan = self.scan.lock().await;
        let mut found = Vec::new();

        let adapters = scan.adapters.clone();
        for adapter in &adapters {
            let peripherals = match adapter.peripherals().await {
                Ok(v) => v,
                Err(err) => {
                    warn!("Failed to query BLE adapter for peripherals: {}", err);
                    continue;
                },
            };

            for peripheral in peripherals {
                let properties = match peripheral.properties().await {
                    Err(err) => {
                        warn!("Could not query peripheral for properties: {:?}", err);
                        continue;
                    },
                    Ok(None) => continue,
                    Ok(Some(properties)) => properties,
                };

                // Some environments ignore the filter, so make sure to check the service uuid again
                if let Some(service) = scan.service_filter {
                    if !properties.services.contains(&service) {
                        continue;
                    }
                }

                let address = peripheral.id().to_string();
                found.push(PeripheralInfo {
                    address: address.clone(),
                    name: properties.local_name,
                    rssi: properties.rssi,
                    services: properties.services,
                });
                scan.peripherals.insert(address, peripheral);
            }
        }

        Ok(found)
    }

    async fn connect(&self, info: &PeripheralInfo) -> Result<Arc<dyn Link>, DeviceError> {
        let peripheral = {
            let scan = self.scan.lock().await;
            scan.peripherals.get(&info.address).cloned()
        };

        let Some(peripheral) = peripheral else {
            return Err(DeviceError::ConnectFailed { reason: format!("{} was not seen while scanning", info.address) });
        };

        info!("Connecting to peripheral {}...", info.address);
        self.connect_peripheral(&peripheral).await?;

        Ok(Arc::new(BtleLink { peripheral, connect_deadline: self.connect_deadline }))
    }
}

pub struct BtleLink {
    peripheral: Peripheral,
    connect_deadline: Duration,
}

impl BtleLink {
    fn find_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<Characteristic, DeviceError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or(DeviceError::CharacteristicNotFound { characteristic })
    }
}

#[async_trait]
impl Link for BtleLink {
    async fn discover_services(&self) -> Result<usize, DeviceError> {
        info!("Connected; Discovering services...");
        match timeout(self.connect_deadline, self.peripheral.discover_services()).await {
            Err(_) => Err(DeviceError::ConnectFailed { reason: "service discovery took too long".to_string() }),
            Ok(result) => {
                result?;
                Ok(self.peripheral.services().len())
            },
        }
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, DeviceError> {
        let target = self.find_characteristic(service, characteristic)?;

        self.peripheral.read(&target).await.map_err(|err| match err {
            btleplug::Error::PermissionDenied => DeviceError::PermissionDenied,
            err => DeviceError::ReadFailed { characteristic, reason: err.to_string() },
        })
    }

    async fn write(&self, service: Uuid, characteristic: Uuid, value: &[u8]) -> Result<(), DeviceError> {
        let target = self.find_characteristic(service, characteristic)?;
        let write_type = write_type_for(target.properties);
        debug!("Writing {} bytes to {} ({:?})", value.len(), characteristic, write_type);

        self.peripheral.write(&target, value, write_type).await.map_err(|err| match err {
            btleplug::Error::PermissionDenied => DeviceError::PermissionDenied,
            err => DeviceError::WriteRejected { characteristic, reason: err.to_string() },
        })
    }

    async fn is_connected(&self) -> Result<bool, DeviceError> {
        Ok(self.peripheral.is_connected().await?)
    }

    async fn disconnect(&self) -> Result<(), DeviceError> {
        Ok(self.peripheral.disconnect().await?)
    }
}
