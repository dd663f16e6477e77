//! Static table of the configuration parameters exposed by the clock.
//!
//! Every parameter is addressed by a (service, characteristic) pair. This table is the wire contract
//! with the firmware.

use std::fmt;
use std::str::FromStr;
use enum_iterator::{all, Sequence};
use uuid::Uuid;

use crate::device::constants::*;
use crate::error::UnknownParameter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence)]
pub enum ServiceKind {
    DeviceConfig,
    Network,
    Display,
    DeviceInfo,
}

impl ServiceKind {
    pub fn uuid(&self) -> Uuid {
        match self {
            ServiceKind::DeviceConfig => make_uuid(DEVICE_CONFIG_SERVICE),
            ServiceKind::Network => make_uuid(NETWORK_SERVICE),
            ServiceKind::Display => make_uuid(DISPLAY_SERVICE),
            ServiceKind::DeviceInfo => make_uuid(DEVICE_INFO_SERVICE),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ServiceKind::DeviceConfig => "Device Config",
            ServiceKind::Network => "Network",
            ServiceKind::Display => "Display",
            ServiceKind::DeviceInfo => "Device Info",
        }
    }
}

/// How a parameter value is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// One unsigned byte.
    Byte,
    /// One byte, 0 or 1.
    Flag,
    /// Raw UTF-8, no terminator or length prefix.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
    WriteOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub service: ServiceKind,
    pub characteristic: Uuid,
    pub kind: ValueKind,
    pub access: Access,
}

impl ParameterDescriptor {
    pub fn service_uuid(&self) -> Uuid {
        self.service.uuid()
    }

    pub fn is_readable(&self) -> bool {
        self.access != Access::WriteOnly
    }

    pub fn is_writable(&self) -> bool {
        self.access != Access::ReadOnly
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence)]
pub enum Parameter {
    DisplayBright,
    AutoBrightMin,
    AutoBrightMax,
    SwapBlueGreen,
    SwapBlueRed,
    Use24hFormat,
    LdrPin,
    DisplayRotation,
    Driver,
    I2cSpeed,
    EPin,

    WifiSsid,
    WifiPwd,
    TimeZone,
    NtpServer,
    ManualPosix,

    CanvasFile,
    CanvasServer,

    FirmwareVersion,
    FirmwareName,
    ClockfaceName,
    Restart,
}

const fn descriptor(
    name: &'static str,
    service: ServiceKind,
    characteristic: &str,
    kind: ValueKind,
    access: Access,
) -> ParameterDescriptor {
    ParameterDescriptor { name, service, characteristic: make_uuid(characteristic), kind, access }
}

impl Parameter {
    pub fn descriptor(&self) -> ParameterDescriptor {
        use Access::*;
        use ServiceKind::*;
        use ValueKind::*;

        match self {
            Parameter::DisplayBright => descriptor("displayBright", DeviceConfig, DISPLAY_BRIGHT, Byte, ReadWrite),
            Parameter::AutoBrightMin => descriptor("autoBrightMin", DeviceConfig, AUTO_BRIGHT_MIN, Byte, ReadWrite),
            Parameter::AutoBrightMax => descriptor("autoBrightMax", DeviceConfig, AUTO_BRIGHT_MAX, Byte, ReadWrite),
            Parameter::SwapBlueGreen => descriptor("swapBlueGreen", DeviceConfig, SWAP_BLUE_GREEN, Flag, ReadWrite),
            Parameter::SwapBlueRed => descriptor("swapBlueRed", DeviceConfig, SWAP_BLUE_RED, Flag, ReadWrite),
            Parameter::Use24hFormat => descriptor("use24hFormat", DeviceConfig, USE_24H_FORMAT, Flag, ReadWrite),
            Parameter::LdrPin => descriptor("ldrPin", DeviceConfig, LDR_PIN, Byte, ReadWrite),
            Parameter::DisplayRotation => descriptor("displayRotation", DeviceConfig, DISPLAY_ROTATION, Byte, ReadWrite),
            Parameter::Driver => descriptor("driver", DeviceConfig, DRIVER, Byte, ReadWrite),
            Parameter::I2cSpeed => descriptor("i2cSpeed", DeviceConfig, I2C_SPEED, Text, ReadWrite),
            Parameter::EPin => descriptor("E_pin", DeviceConfig, E_PIN, Byte, ReadWrite),

            Parameter::WifiSsid => descriptor("wifiSsid", Network, WIFI_SSID, Text, ReadWrite),
            Parameter::WifiPwd => descriptor("wifiPwd", Network, WIFI_PWD, Text, ReadWrite),
            Parameter::TimeZone => descriptor("timeZone", Network, TIME_ZONE, Text, ReadWrite),
            Parameter::NtpServer => descriptor("ntpServer", Network, NTP_SERVER, Text, ReadWrite),
            Parameter::ManualPosix => descriptor("manualPosix", Network, MANUAL_POSIX, Text, ReadWrite),

            Parameter::CanvasFile => descriptor("canvasFile", Display, CANVAS_FILE, Text, ReadWrite),
            Parameter::CanvasServer => descriptor("canvasServer", Display, CANVAS_SERVER, Text, ReadWrite),

            Parameter::FirmwareVersion => descriptor("firmwareVersion", DeviceInfo, FIRMWARE_VERSION, Text, ReadOnly),
            Parameter::FirmwareName => descriptor("firmwareName", DeviceInfo, FIRMWARE_NAME, Text, ReadOnly),
            Parameter::ClockfaceName => descriptor("clockfaceName", DeviceInfo, CLOCKFACE_NAME, Text, ReadOnly),
            Parameter::Restart => descriptor("restart", DeviceInfo, RESTART, Byte, WriteOnly),
        }
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn all() -> Vec<Parameter> {
        all::<Parameter>().collect::<Vec<_>>()
    }

    /// Every parameter that can be read back from the clock, in registry order.
    pub fn readable() -> Vec<Parameter> {
        all::<Parameter>().filter(|p| p.descriptor().is_readable()).collect::<Vec<_>>()
    }

    pub fn by_name(name: &str) -> Option<Parameter> {
        all::<Parameter>().find(|p| p.name() == name)
    }

    pub fn by_characteristic(characteristic: &Uuid) -> Option<Parameter> {
        all::<Parameter>().find(|p| &p.descriptor().characteristic == characteristic)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Parameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::by_name(s)
            .or_else(|| all::<Parameter>().find(|p| p.name().eq_ignore_ascii_case(s)))
            .ok_or_else(|| UnknownParameter { name: s.to_string() })
    }
}
