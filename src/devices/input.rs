// src/devices/input.rs
// Operator-facing text forms of device lists.

use super::definitions::{Device, DeviceList};
use super::error::DeviceResult;

/// Parses free-text entry such as `"iPhone 15, iPhone 15 Pro,,Pixel 8"`.
/// Blank entries are skipped and repeats keep their first position.
pub fn parse_device_input(text: &str) -> DeviceResult<DeviceList> {
    DeviceList::from_names(text.split(',').filter(|part| !part.trim().is_empty()))
}

/// Pipe-joined rendering of a list, as it appears in the variation definition
/// column. Display only; lists cross the wire as JSON arrays.
pub fn render_pipe(devices: &[Device]) -> String {
    devices
        .iter()
        .map(Device::as_str)
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_input_splits_and_dedups() {
        let list = parse_device_input(" iPhone 15 , Pixel 8,, iPhone 15 ,").unwrap();
        assert_eq!(render_pipe(list.as_slice()), "iPhone 15|Pixel 8");
    }

    #[test]
    fn test_parse_device_input_empty_text() {
        assert!(parse_device_input("  ,  ").unwrap().is_empty());
    }

    #[test]
    fn test_render_pipe_single() {
        let list = DeviceList::from_names(["Galaxy S24"]).unwrap();
        assert_eq!(render_pipe(list.as_slice()), "Galaxy S24");
    }
}
