use std::fmt::Write;
use enum_iterator::all;

use crate::device::registry::{Access, Parameter, ServiceKind};
use crate::device::types::PeripheralInfo;
use crate::view::cache::ParameterCache;

fn shown_value(parameter: Parameter, value: &str) -> String {
    if parameter == Parameter::WifiPwd && !value.is_empty() {
        return "*".repeat(value.chars().count());
    }
    value.to_string()
}

fn name_width() -> usize {
    Parameter::all().iter().map(|p| p.name().len()).max().unwrap_or(0)
}

/// One block per service, like the configuration screen of the app.
pub fn render_sectioned(cache: &ParameterCache) -> String {
    let width = name_width();
    let mut out = String::new();

    for service in all::<ServiceKind>() {
        let entries: Vec<(Parameter, &str)> = cache
            .iter()
            .filter(|(p, _)| p.descriptor().service == service)
            .collect();
        if entries.is_empty() {
            continue;
        }

        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", service.title());
        for (parameter, value) in entries {
            let _ = writeln!(out, "  {:width$}  {}", parameter.name(), shown_value(parameter, value), width = width);
        }
    }
    out
}

/// Every parameter on its own line, `name=value`.
pub fn render_flat(cache: &ParameterCache) -> String {
    let mut out = String::new();
    for (parameter, value) in cache.iter() {
        let _ = writeln!(out, "{}={}", parameter.name(), shown_value(parameter, value));
    }
    out
}

pub fn render_registry() -> String {
    let width = name_width();
    let mut out = String::new();

    for parameter in Parameter::all() {
        let descriptor = parameter.descriptor();
        let access = match descriptor.access {
            Access::ReadOnly => "r ",
            Access::ReadWrite => "rw",
            Access::WriteOnly => " w",
        };
        let _ = writeln!(
            out,
            "{:width$}  {}  {:?}  {}  {}",
            descriptor.name,
            access,
            descriptor.kind,
            descriptor.service.title(),
            descriptor.characteristic,
            width = width,
        );
    }
    out
}

pub fn render_devices(devices: &[PeripheralInfo]) -> String {
    let mut out = String::new();
    for device in devices {
        let rssi = device.rssi.map(|r| format!("{} dBm", r)).unwrap_or_default();
        let _ = writeln!(out, "{}  {}  {}", device.address, device.name.as_deref().unwrap_or("Unnamed Device"), rssi);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::constants::*;

    fn filled() -> ParameterCache {
        let mut cache = ParameterCache::new();
        cache.apply_status_message(&format!("Read {}: 80", DISPLAY_BRIGHT));
        cache.apply_status_message(&format!("Read {}: secret", WIFI_PWD));
        cache
    }

    #[test]
    fn sectioned_groups_by_service() {
        let text = render_sectioned(&filled());

        let config = text.find("Device Config").unwrap();
        let network = text.find("Network").unwrap();
        let info = text.find("Device Info").unwrap();
        assert!(config < network && network < info);
        assert!(text.contains("displayBright"));
        assert!(text.contains("  80\n"));
        assert!(!text.contains("secret"));
        assert!(text.contains("******"));
    }

    #[test]
    fn flat_lists_every_parameter() {
        let text = render_flat(&filled());

        assert_eq!(text.lines().count(), 21);
        assert!(text.starts_with("displayBright=80\n"));
        assert!(text.contains("wifiPwd=******\n"));
    }

    #[test]
    fn registry_lists_restart() {
        let text = render_registry();
        assert_eq!(text.lines().count(), 22);
        assert!(text.contains(RESTART));
    }
}
