use std::fmt;
use uuid::Uuid;

use crate::device::encoding::decode_text;
use crate::device::registry::Parameter;
use crate::error::DeviceError;

/// A peripheral seen while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralInfo {
    /// Platform peripheral id; the MAC address where the platform exposes one.
    pub address: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
    pub services: Vec<Uuid>,
}

impl PeripheralInfo {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Picks the peripheral to connect to out of the scan results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// The first peripheral that advertises the given service.
    AdvertisesService(Uuid),
    /// Address or local name, case insensitive.
    Named(String),
}

impl DeviceSelector {
    pub fn matches(&self, peripheral: &PeripheralInfo) -> bool {
        match self {
            DeviceSelector::AdvertisesService(service) => peripheral.services.contains(service),
            DeviceSelector::Named(wanted) => {
                peripheral.address.eq_ignore_ascii_case(wanted)
                    || peripheral.name.as_deref().is_some_and(|name| name.eq_ignore_ascii_case(wanted))
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Disconnected,
    Connecting,
    Connected { services: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

/// A single GATT read or write addressed by (service, characteristic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattRequest {
    pub id: RequestId,
    pub kind: OperationKind,
    pub service: Uuid,
    pub characteristic: Uuid,
    /// Bytes to write; empty for reads.
    pub payload: Vec<u8>,
}

/// How a request ended. For reads `result` holds the value that was read, for writes the bytes written.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub request: RequestId,
    pub kind: OperationKind,
    pub service: Uuid,
    pub characteristic: Uuid,
    pub result: Result<Vec<u8>, DeviceError>,
}

impl OperationOutcome {
    pub fn new(request: &GattRequest, result: Result<Vec<u8>, DeviceError>) -> Self {
        OperationOutcome {
            request: request.id,
            kind: request.kind,
            service: request.service,
            characteristic: request.characteristic,
            result,
        }
    }

    pub fn parameter(&self) -> Option<Parameter> {
        Parameter::by_characteristic(&self.characteristic)
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Status events published on the relay.
///
/// The Display form is the human readable status line, e.g. `Read <uuid>: <value>`.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    ScanStarted,
    ScanStopped,
    Discovered(PeripheralInfo),
    Connecting(PeripheralInfo),
    Connected(PeripheralInfo),
    ServicesDiscovered(usize),
    Disconnected,
    Requested(GattRequest),
    Completed(OperationOutcome),
    Error(DeviceError),
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceEvent::ScanStarted => write!(f, "Scanning..."),
            DeviceEvent::ScanStopped => write!(f, "Scan stopped"),
            DeviceEvent::Discovered(peripheral) => {
                write!(f, "Found {} ({})", peripheral.display_name(), peripheral.address)
            },
            DeviceEvent::Connecting(peripheral) => write!(f, "Connecting to {}", peripheral.display_name()),
            DeviceEvent::Connected(peripheral) => {
                write!(f, "Connected to {}", peripheral.name.as_deref().unwrap_or("device"))
            },
            DeviceEvent::ServicesDiscovered(count) => write!(f, "Services discovered ({})", count),
            DeviceEvent::Disconnected => write!(f, "Disconnected"),
            DeviceEvent::Requested(request) => match request.kind {
                OperationKind::Read => write!(f, "Reading {}", request.characteristic),
                OperationKind::Write => {
                    write!(f, "Writing {}: {}", request.characteristic, decode_text(&request.payload))
                },
            },
            DeviceEvent::Completed(outcome) => match (&outcome.result, outcome.kind) {
                (Ok(value), OperationKind::Read) => {
                    write!(f, "Read {}: {}", outcome.characteristic, decode_text(value))
                },
                (Ok(_), OperationKind::Write) => write!(f, "Wrote {}", outcome.characteristic),
                (Err(err), _) => write!(f, "{}", err),
            },
            DeviceEvent::Error(err) => write!(f, "{}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::constants::{make_uuid, DEVICE_CONFIG_SERVICE, DISPLAY_BRIGHT};

    fn clock() -> PeripheralInfo {
        PeripheralInfo {
            address: "AA:BB:CC:DD:EE:FF".to_string(),
            name: Some("Clockwise".to_string()),
            rssi: Some(-60),
            services: vec![make_uuid(DEVICE_CONFIG_SERVICE)],
        }
    }

    #[test]
    fn selector_matches_service_address_or_name() {
        let peripheral = clock();

        assert!(DeviceSelector::AdvertisesService(make_uuid(DEVICE_CONFIG_SERVICE)).matches(&peripheral));
        assert!(!DeviceSelector::AdvertisesService(Uuid::nil()).matches(&peripheral));
        assert!(DeviceSelector::Named("aa:bb:cc:dd:ee:ff".to_string()).matches(&peripheral));
        assert!(DeviceSelector::Named("CLOCKWISE".to_string()).matches(&peripheral));
        assert!(!DeviceSelector::Named("other".to_string()).matches(&peripheral));
    }

    #[test]
    fn status_lines() {
        let request = GattRequest {
            id: RequestId(7),
            kind: OperationKind::Read,
            service: make_uuid(DEVICE_CONFIG_SERVICE),
            characteristic: make_uuid(DISPLAY_BRIGHT),
            payload: Vec::new(),
        };

        let read = DeviceEvent::Completed(OperationOutcome::new(&request, Ok(b"42".to_vec())));
        assert_eq!(read.to_string(), format!("Read {}: 42", DISPLAY_BRIGHT));

        let write = GattRequest { kind: OperationKind::Write, payload: b"x".to_vec(), ..request.clone() };
        assert_eq!(DeviceEvent::Requested(write.clone()).to_string(), format!("Writing {}: x", DISPLAY_BRIGHT));
        assert_eq!(
            DeviceEvent::Completed(OperationOutcome::new(&write, Ok(b"x".to_vec()))).to_string(),
            format!("Wrote {}", DISPLAY_BRIGHT)
        );

        let missing = DeviceError::CharacteristicNotFound { characteristic: request.characteristic };
        assert_eq!(
            DeviceEvent::Completed(OperationOutcome::new(&request, Err(missing))).to_string(),
            format!("Characteristic not found: {}", DISPLAY_BRIGHT)
        );

        assert_eq!(DeviceEvent::Connecting(clock()).to_string(), "Connecting to Clockwise");
        assert_eq!(DeviceEvent::ServicesDiscovered(4).to_string(), "Services discovered (4)");
        assert_eq!(DeviceEvent::Error(DeviceError::NoActiveConnection).to_string(), "No GATT connection available");
    }
}
