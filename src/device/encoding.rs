use crate::device::registry::{Parameter, ValueKind};
use crate::error::DeviceError;

/// Integers travel as a single byte; anything outside 0-255 wraps around.
pub fn encode_byte(value: i64) -> Vec<u8> {
    vec![value.rem_euclid(256) as u8]
}

pub fn encode_flag(value: bool) -> Vec<u8> {
    vec![u8::from(value)]
}

/// Raw UTF-8, no terminator and no length prefix.
pub fn encode_text(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

pub fn decode_text(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Converts user input into the bytes for `parameter`, following its value kind.
pub fn encode_input(parameter: Parameter, input: &str) -> Result<Vec<u8>, DeviceError> {
    let descriptor = parameter.descriptor();
    let invalid = || DeviceError::InvalidValue { parameter: descriptor.name, value: input.to_string() };

    match descriptor.kind {
        ValueKind::Byte => input.trim().parse::<i64>().map(encode_byte).map_err(|_| invalid()),
        ValueKind::Flag => parse_flag(input).map(encode_flag).ok_or_else(invalid),
        ValueKind::Text => Ok(encode_text(input)),
    }
}
