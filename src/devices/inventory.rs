// src/devices/inventory.rs
//! Per-product device inventory built from uploaded files.
//!
//! Everything here is recomputed from scratch whenever the uploaded files
//! change. Nothing is updated incrementally.

use super::definitions::{
    Device, DeviceGroup, DeviceList, EquivalenceRule, ProductDeviceMap,
};
use super::error::{DeviceError, DeviceResult};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Device data the service parsed out of one uploaded file.
#[derive(Debug, Clone, Default)]
pub struct FileDeviceData {
    pub file_name: String,
    /// File-level device column, first-seen order.
    pub devices: Vec<String>,
    /// Raw per-product device columns, keyed by product id.
    pub product_devices: BTreeMap<String, JsonValue>,
}

/// Builds the product -> device list map for a set of files.
///
/// A file without per-product data contributes its file-level list under the
/// file name. A product seen in several files gets the union of its lists,
/// keeping the order of the first file.
pub fn build_map(files: &[FileDeviceData]) -> DeviceResult<ProductDeviceMap> {
    let mut map = ProductDeviceMap::new();

    for file in files {
        if file.product_devices.is_empty() {
            let list = list_from_names(file.devices.iter().map(String::as_str));
            if !list.is_empty() {
                trace!("'{}': no product data, using file-level devices", file.file_name);
                merge_into(&mut map, &file.file_name, list);
            }
            continue;
        }

        for (product, raw) in &file.product_devices {
            let list = parse_product_column(product, raw)?;
            if !list.is_empty() {
                merge_into(&mut map, product, list);
            }
        }
    }

    debug!("Built device map for {} products from {} files", map.len(), files.len());
    Ok(map)
}

fn parse_product_column(product: &str, raw: &JsonValue) -> DeviceResult<DeviceList> {
    let malformed = || DeviceError::MalformedDeviceColumn {
        product: product.to_string(),
    };
    let JsonValue::Array(items) = raw else {
        return Err(malformed());
    };

    let mut list = DeviceList::new();
    for item in items {
        let JsonValue::String(name) = item else {
            return Err(malformed());
        };
        // Blank cells carry no device.
        if let Ok(device) = Device::parse(name) {
            list.push_unique(device);
        }
    }
    Ok(list)
}

fn list_from_names<'a>(names: impl Iterator<Item = &'a str>) -> DeviceList {
    DeviceList::from_devices(names.filter_map(|name| Device::parse(name).ok()))
}

fn merge_into(map: &mut ProductDeviceMap, product: &str, list: DeviceList) {
    match map.get_mut(product) {
        Some(existing) => {
            for device in list.into_vec() {
                existing.push_unique(device);
            }
        }
        None => {
            map.insert(product.to_string(), list);
        }
    }
}

/// Partitions products into groups of equivalent device lists.
///
/// Groups come out in the order their first product appears in the map, and
/// every product lands in exactly one group.
pub fn group_by_equivalence(map: &ProductDeviceMap, rule: EquivalenceRule) -> Vec<DeviceGroup> {
    let mut groups: Vec<DeviceGroup> = Vec::new();
    let mut group_index: HashMap<Vec<&str>, usize> = HashMap::new();

    for (product, list) in map {
        let key = rule.key(list);
        match group_index.get(&key) {
            Some(&idx) => groups[idx].products.push(product.clone()),
            None => {
                group_index.insert(key, groups.len());
                groups.push(DeviceGroup {
                    products: vec![product.clone()],
                    devices: list.clone(),
                });
            }
        }
    }

    groups
}

/// Devices of `product_id` that no other product carries.
/// An unknown product has no exclusive devices.
pub fn exclusive_devices(map: &ProductDeviceMap, product_id: &str) -> Vec<Device> {
    let Some(list) = map.get(product_id) else {
        return Vec::new();
    };

    list.iter()
        .filter(|device| {
            !map.iter()
                .any(|(other, other_list)| other != product_id && other_list.contains(device))
        })
        .cloned()
        .collect()
}

/// Non-empty exclusive lists for every product. Empty when there are fewer
/// than two products, since nothing can be "only on this model" then.
pub fn exclusive_report(map: &ProductDeviceMap) -> BTreeMap<String, Vec<Device>> {
    if map.len() < 2 {
        return BTreeMap::new();
    }
    map.keys()
        .filter_map(|product| {
            let exclusive = exclusive_devices(map, product);
            (!exclusive.is_empty()).then(|| (product.clone(), exclusive))
        })
        .collect()
}

/// Batch-wide device order.
///
/// Starts from the exact order shared by the most products (first pattern
/// wins a tie), then appends whatever the file-level lists add, in order.
/// Without product data the first file-level list serves as the pattern.
pub fn reference_order(map: &ProductDeviceMap, file_lists: &[Vec<String>]) -> DeviceList {
    let mut patterns: Vec<(&DeviceList, usize)> = Vec::new();
    for list in map.values() {
        match patterns
            .iter_mut()
            .find(|(pattern, _)| EquivalenceRule::Sequence.equivalent(pattern, list))
        {
            Some((_, count)) => *count += 1,
            None => patterns.push((list, 1)),
        }
    }

    let mut best: Option<(&DeviceList, usize)> = None;
    for &(pattern, count) in &patterns {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((pattern, count));
        }
    }

    let mut order = match best {
        Some((pattern, count)) => {
            debug!(
                "Reference order taken from pattern shared by {} products ({} devices)",
                count,
                pattern.len()
            );
            pattern.clone()
        }
        None => file_lists
            .first()
            .map(|names| list_from_names(names.iter().map(String::as_str)))
            .unwrap_or_default(),
    };

    for names in file_lists {
        for name in names {
            if let Ok(device) = Device::parse(name) {
                order.push_unique(device);
            }
        }
    }
    order
}
