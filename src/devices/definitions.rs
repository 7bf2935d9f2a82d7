// src/devices/definitions.rs

use super::error::{DeviceError, DeviceResult};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A phone-model variation value.
///
/// Stored trimmed and compared by exact, case-sensitive string equality.
/// Punctuation and character width are not normalized, so `"iPhone 15"` and
/// `"iPhone１５"` are different devices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Device(String);

impl Device {
    pub fn parse(raw: &str) -> DeviceResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DeviceError::EmptyDevice);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Device {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Device {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Device::parse(s)
    }
}

impl<'de> Deserialize<'de> for Device {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Device::parse(&raw).map_err(de::Error::custom)
    }
}

/// Ordered devices of one product. Never holds the same device twice.
///
/// The order is significant: it becomes the pipe-delimited variation
/// definition written back into the product row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct DeviceList(Vec<Device>);

impl DeviceList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builds a list keeping the first occurrence of every device.
    pub fn from_devices<I>(devices: I) -> Self
    where
        I: IntoIterator<Item = Device>,
    {
        let mut list = Self::new();
        for device in devices {
            list.push_unique(device);
        }
        list
    }

    /// Parses names into devices, dropping repeats.
    pub fn from_names<I, S>(names: I) -> DeviceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for name in names {
            list.push_unique(Device::parse(name.as_ref())?);
        }
        Ok(list)
    }

    /// Wraps an already-built sequence, failing on the first repeated device
    /// instead of dropping it.
    pub fn try_from_vec(devices: Vec<Device>) -> DeviceResult<Self> {
        for (i, device) in devices.iter().enumerate() {
            if devices[..i].contains(device) {
                return Err(DeviceError::DuplicateDeviceInvariant(device.clone()));
            }
        }
        Ok(Self(devices))
    }

    /// Appends `device` unless it is already present. Returns whether it was added.
    pub fn push_unique(&mut self, device: Device) -> bool {
        if self.0.contains(&device) {
            return false;
        }
        self.0.push(device);
        true
    }

    pub fn contains(&self, device: &Device) -> bool {
        self.0.contains(device)
    }

    pub fn position(&self, device: &Device) -> Option<usize> {
        self.0.iter().position(|d| d == device)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Device> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Device] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Device> {
        self.0
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a Device;
    type IntoIter = std::slice::Iter<'a, Device>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for DeviceList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let devices = Vec::<Device>::deserialize(deserializer)?;
        Ok(DeviceList::from_devices(devices))
    }
}

/// Product identifier -> that product's device list, iterated in id order.
pub type ProductDeviceMap = BTreeMap<String, DeviceList>;

/// Rule deciding when two products carry "the same" device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquivalenceRule {
    /// Same devices regardless of order: `[A,B]` equals `[B,A]`.
    SortedSet,
    /// Same devices in the same order: `[A,B]` differs from `[B,A]`.
    Sequence,
}

/// The one rule used for grouping everywhere in the batch pipeline.
pub const GROUPING_RULE: EquivalenceRule = EquivalenceRule::SortedSet;

impl EquivalenceRule {
    /// Key under which equivalent lists collide.
    pub fn key<'a>(&self, list: &'a DeviceList) -> Vec<&'a str> {
        let mut key: Vec<&str> = list.iter().map(Device::as_str).collect();
        if matches!(self, EquivalenceRule::SortedSet) {
            key.sort_unstable();
        }
        key
    }

    pub fn equivalent(&self, a: &DeviceList, b: &DeviceList) -> bool {
        self.key(a) == self.key(b)
    }
}

/// Products sharing an equivalent device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceGroup {
    pub products: Vec<String>,
    /// List of the first product in the group.
    pub devices: DeviceList,
}

impl DeviceGroup {
    pub fn contains_product(&self, product_id: &str) -> bool {
        self.products.iter().any(|p| p == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_parse_trims_and_rejects_empty() {
        assert_eq!(Device::parse("  iPhone 15 ").unwrap().as_str(), "iPhone 15");
        assert_eq!(Device::parse("   "), Err(DeviceError::EmptyDevice));
    }

    #[test]
    fn test_device_equality_is_case_sensitive() {
        assert_ne!(Device::parse("iphone 15").unwrap(), Device::parse("iPhone 15").unwrap());
    }

    #[test]
    fn test_device_list_keeps_first_occurrence() {
        let list = DeviceList::from_names(["B", "A", "B", "C", "A"]).unwrap();
        let names: Vec<&str> = list.iter().map(Device::as_str).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_try_from_vec_rejects_duplicates() {
        let a = Device::parse("A").unwrap();
        let b = Device::parse("B").unwrap();
        let err = DeviceList::try_from_vec(vec![a.clone(), b, a.clone()]).unwrap_err();
        assert_eq!(err, DeviceError::DuplicateDeviceInvariant(a));
    }

    #[test]
    fn test_device_list_deserialize_dedups() {
        let list: DeviceList = serde_json::from_str(r#"["A", " B ", "A"]"#).unwrap();
        assert_eq!(list, DeviceList::from_names(["A", "B"]).unwrap());
    }

    #[test]
    fn test_equivalence_rules_differ_on_order() {
        let ab = DeviceList::from_names(["A", "B"]).unwrap();
        let ba = DeviceList::from_names(["B", "A"]).unwrap();
        assert!(EquivalenceRule::SortedSet.equivalent(&ab, &ba));
        assert!(!EquivalenceRule::Sequence.equivalent(&ab, &ba));
        assert!(EquivalenceRule::Sequence.equivalent(&ab, &ab.clone()));
    }
}
