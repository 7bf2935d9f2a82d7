// src/devices/error.rs

use super::definitions::Device;
use thiserror::Error;

/// Validation failures of the device model and the resolver.
/// These are recovered locally; none of them is ever sent to the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Device name is empty.")]
    EmptyDevice,
    #[error("Device column for product '{product}' is not a flat list of strings.")]
    MalformedDeviceColumn { product: String },
    #[error("Device '{0}' is already in the list and cannot be added.")]
    AddAlreadyPresent(Device),
    #[error("Device '{0}' is not in the list and cannot be removed.")]
    RemoveNotPresent(Device),
    #[error("Anchor device '{0}' is not in the list.")]
    AnchorMissing(Device),
    #[error("Anchor device '{0}' is being removed. Pick another anchor or insert at the end.")]
    AnchorRemoved(Device),
    #[error(
        "Custom order must contain exactly the existing devices (missing: [{}], unknown: [{}]).",
        join_names(.missing),
        join_names(.unknown)
    )]
    CustomOrderMismatch {
        missing: Vec<Device>,
        unknown: Vec<Device>,
    },
    #[error("Resolved device list contains '{0}' more than once.")]
    DuplicateDeviceInvariant(Device),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

fn join_names(devices: &[Device]) -> String {
    devices
        .iter()
        .map(Device::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
