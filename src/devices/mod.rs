// src/devices/mod.rs

pub mod definitions;
pub mod error;
pub mod input;
pub mod inventory;
pub mod resolver;

pub use definitions::{
    Device, DeviceGroup, DeviceList, EquivalenceRule, ProductDeviceMap, GROUPING_RULE,
};
pub use error::{DeviceError, DeviceResult};
pub use input::{parse_device_input, render_pipe};
pub use inventory::FileDeviceData;
pub use resolver::{resolve, resolve_per_group, EditIntent, GroupPreview, Position, ResolvedEdit};
