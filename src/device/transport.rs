use std::sync::Arc;
use async_trait::async_trait;
use uuid::Uuid;

use crate::device::types::PeripheralInfo;
use crate::error::DeviceError;

/// Central-role access to the bluetooth radio: scanning and opening connections.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Starts scanning on every adapter. With a filter only peripherals advertising that service are reported.
    async fn start_scan(&self, service_filter: Option<Uuid>) -> Result<(), DeviceError>;

    async fn stop_scan(&self) -> Result<(), DeviceError>;

    /// Everything the running scan has reported so far.
    async fn peripherals(&self) -> Result<Vec<PeripheralInfo>, DeviceError>;

    async fn connect(&self, peripheral: &PeripheralInfo) -> Result<Arc<dyn Link>, DeviceError>;
}

/// An open GATT connection to one peripheral.
#[async_trait]
pub trait Link: Send + Sync {
    /// Returns the number of services found.
    async fn discover_services(&self) -> Result<usize, DeviceError>;

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, DeviceError>;

    /// Writes without response when the characteristic supports it, with response otherwise.
    async fn write(&self, service: Uuid, characteristic: Uuid, value: &[u8]) -> Result<(), DeviceError>;

    async fn is_connected(&self) -> Result<bool, DeviceError>;

    async fn disconnect(&self) -> Result<(), DeviceError>;
}
