use uuid::Uuid;

use crate::error::StatusParseError;

const READ_PREFIX: &str = "Read ";
// 8-4-4-4-12; the simple, braced and urn forms have other lengths
const HYPHENATED_UUID_LEN: usize = 36;

/// A status line as shown to the user, decoded back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    /// `Read <uuid>: <value>`
    Read { characteristic: Uuid, value: String },
    /// Anything else is free-form text.
    Text(String),
}

/// Decodes a status line. Only lines starting with `Read ` carry structure; a `Read ` line without a
/// separator or with an invalid UUID is malformed.
pub fn parse_status_message(message: &str) -> Result<StatusMessage, StatusParseError> {
    let Some(rest) = message.strip_prefix(READ_PREFIX) else {
        return Ok(StatusMessage::Text(message.to_string()));
    };

    let malformed = || StatusParseError::MalformedStatusMessage { message: message.to_string() };

    let (characteristic, value) = rest.split_once(": ").ok_or_else(malformed)?;
    let characteristic = characteristic.trim();
    if characteristic.len() != HYPHENATED_UUID_LEN {
        return Err(malformed());
    }
    let characteristic = Uuid::parse_str(characteristic).map_err(|_| malformed())?;

    Ok(StatusMessage::Read { characteristic, value: value.trim().to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::constants::{make_uuid, TIME_ZONE};

    #[test]
    fn read_lines_are_structured() {
        let parsed = parse_status_message(&format!("Read {}: Europe/Amsterdam ", TIME_ZONE));
        assert_eq!(parsed, Ok(StatusMessage::Read {
            characteristic: make_uuid(TIME_ZONE),
            value: "Europe/Amsterdam".to_string(),
        }));
    }

    #[test]
    fn value_may_contain_the_separator() {
        let parsed = parse_status_message(&format!("Read {}: http://canvas.local: 8080", TIME_ZONE));
        assert_eq!(parsed, Ok(StatusMessage::Read {
            characteristic: make_uuid(TIME_ZONE),
            value: "http://canvas.local: 8080".to_string(),
        }));
    }

    #[test]
    fn other_lines_are_text() {
        assert_eq!(parse_status_message("Disconnected"), Ok(StatusMessage::Text("Disconnected".to_string())));
        assert_eq!(
            parse_status_message("Reading 0000ff11-0000-1000-8000-00805f9b34fb"),
            Ok(StatusMessage::Text("Reading 0000ff11-0000-1000-8000-00805f9b34fb".to_string()))
        );
    }

    #[test]
    fn malformed_read_lines() {
        assert!(parse_status_message("Read nothing").is_err());
        assert!(parse_status_message("Read not-a-uuid: 5").is_err());
        assert!(parse_status_message("Read 0000ff2300001000800000805f9b34fb: X").is_err());
        assert!(parse_status_message("Read {0000ff11-0000-1000-8000-00805f9b34fb}: 9").is_err());
        assert!(parse_status_message("Read urn:uuid:0000ff11-0000-1000-8000-00805f9b34fb: 9").is_err());
    }
}
