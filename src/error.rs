use std::io;
use std::sync::Arc;
use std::str::Utf8Error;
use thiserror::Error;
use uuid::Uuid;
use btleplug;
use serde_json;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

impl ConfigError {
    pub fn is_file_not_found_error(&self) -> bool {
        match self {
            ConfigError::IOError { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Failed to start application (tokio): {source}")]
    Runtime { source: io::Error },

    #[error("Failed to start application (bluetooth): {source}")]
    Device { #[from] source: DeviceError },

    #[error("{source}")]
    UnknownParameter { #[from] source: UnknownParameter },

    #[error("No clock found")]
    NoPeripheral,

    #[error("Could not connect to the clock")]
    NotConnected,

    #[error("{failed} of {total} operations failed")]
    OperationsFailed { failed: usize, total: usize },
}

/// Everything that can go wrong while talking to the clock.
///
/// The Display text doubles as the status line shown to the user, so it must stay readable on its own.
/// Cloneable because it travels inside [`crate::device::types::DeviceEvent`].
#[derive(Error, Debug, Clone)]
pub enum DeviceError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { source: Arc<btleplug::Error> },

    #[error("Missing bluetooth permission")]
    PermissionDenied,

    #[error("No bluetooth adapter available")]
    NoAdapters,

    #[error("No GATT connection available")]
    NoActiveConnection,

    #[error("Characteristic not found: {characteristic}")]
    CharacteristicNotFound { characteristic: Uuid },

    #[error("Read failed ({reason}) from {characteristic}")]
    ReadFailed { characteristic: Uuid, reason: String },

    #[error("Write failed ({reason}) to {characteristic}")]
    WriteRejected { characteristic: Uuid, reason: String },

    #[error("Scan failed: {reason}")]
    ScanFailed { reason: String },

    #[error("Connect failed: {reason}")]
    ConnectFailed { reason: String },

    #[error("Parameter {parameter} is read-only")]
    ReadOnly { parameter: &'static str },

    #[error("Parameter {parameter} is write-only")]
    WriteOnly { parameter: &'static str },

    #[error("Invalid value {value:?} for {parameter}")]
    InvalidValue { parameter: &'static str, value: String },

    #[error("Operation on {characteristic} took too long")]
    Timeout { characteristic: Uuid },

    #[error("Connection closed before the operation completed")]
    SessionClosed,
}

impl From<btleplug::Error> for DeviceError {
    fn from(source: btleplug::Error) -> Self {
        match source {
            btleplug::Error::PermissionDenied => DeviceError::PermissionDenied,
            source => DeviceError::Btle { source: Arc::new(source) },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown parameter \"{name}\"")]
pub struct UnknownParameter {
    pub name: String,
}

/// A status line that looked like a read result but could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusParseError {
    #[error("Malformed status message: {message:?}")]
    MalformedStatusMessage { message: String },
}
