use indexmap::IndexMap;
use log::debug;

use crate::device::encoding::decode_text;
use crate::device::registry::Parameter;
use crate::device::types::{DeviceEvent, OperationKind, OperationOutcome};
use crate::view::status::{parse_status_message, StatusMessage};

/// Last known value of every readable parameter, as text. Only successful reads update it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterCache {
    values: IndexMap<Parameter, String>,
}

impl ParameterCache {
    pub fn new() -> Self {
        ParameterCache {
            values: Parameter::readable().into_iter().map(|p| (p, String::new())).collect(),
        }
    }

    pub fn get(&self, parameter: Parameter) -> Option<&str> {
        self.values.get(&parameter).map(|v| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, &str)> {
        self.values.iter().map(|(p, v)| (*p, v.as_str()))
    }

    fn set(&mut self, parameter: Parameter, value: String) -> bool {
        match self.values.get_mut(&parameter) {
            Some(slot) => {
                *slot = value;
                true
            },
            None => false,
        }
    }

    /// Forgets every value; they are stale once the clock is disconnected.
    pub fn clear(&mut self) {
        for value in self.values.values_mut() {
            value.clear();
        }
    }

    /// Stores the value of a successful read. Returns whether the cache changed.
    pub fn apply_outcome(&mut self, outcome: &OperationOutcome) -> bool {
        let (OperationKind::Read, Ok(value)) = (outcome.kind, &outcome.result) else {
            return false;
        };

        match outcome.parameter() {
            Some(parameter) => self.set(parameter, decode_text(value)),
            None => false,
        }
    }

    pub fn apply_event(&mut self, event: &DeviceEvent) -> bool {
        match event {
            DeviceEvent::Completed(outcome) => self.apply_outcome(outcome),
            DeviceEvent::Disconnected => {
                self.clear();
                true
            },
            _ => false,
        }
    }

    /// Applies a status line of the form `Read <uuid>: <value>`. Anything else, malformed lines and
    /// unknown characteristics leave the cache untouched.
    pub fn apply_status_message(&mut self, message: &str) -> bool {
        match parse_status_message(message) {
            Ok(StatusMessage::Read { characteristic, value }) => match Parameter::by_characteristic(&characteristic) {
                Some(parameter) => self.set(parameter, value),
                None => false,
            },
            Ok(StatusMessage::Text(_)) => false,
            Err(err) => {
                debug!("Ignoring status line: {}", err);
                false
            },
        }
    }
}

impl Default for ParameterCache {
    fn default() -> Self {
        ParameterCache::new()
    }
}
