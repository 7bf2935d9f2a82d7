// src/devices/resolver.rs
//! Turns an operator's edit intent into a concrete device order.
//!
//! Every intent goes through one normalization step before any splicing:
//! repeated devices in `add`, `remove` and `order` keep their first
//! occurrence, then the intent is checked against the reference list.

use super::definitions::{Device, DeviceGroup, DeviceList};
use super::error::{DeviceError, DeviceResult};
use super::input::render_pipe;
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Where positional additions go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Start,
    End,
    /// Right after the given device, wherever it sits once removals are applied.
    After(Device),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditIntent {
    Positional {
        add: Vec<Device>,
        remove: Vec<Device>,
        position: Position,
    },
    /// `order` is the existing devices after manual reordering; `add` is
    /// spliced in at `insert_index`.
    Custom {
        add: Vec<Device>,
        remove: Vec<Device>,
        order: Vec<Device>,
        insert_index: i64,
    },
    /// The complete final list. Membership differences against the reference
    /// become the add/remove sets.
    FinalOrder { order: Vec<Device> },
}

impl EditIntent {
    pub fn add(&self) -> &[Device] {
        match self {
            EditIntent::Positional { add, .. } | EditIntent::Custom { add, .. } => add.as_slice(),
            EditIntent::FinalOrder { .. } => &[],
        }
    }

    pub fn remove(&self) -> &[Device] {
        match self {
            EditIntent::Positional { remove, .. } | EditIntent::Custom { remove, .. } => remove.as_slice(),
            EditIntent::FinalOrder { .. } => &[],
        }
    }

    /// Same intent with every device list de-duplicated.
    pub fn normalized(&self) -> EditIntent {
        match self {
            EditIntent::Positional { add, remove, position } => EditIntent::Positional {
                add: dedup(add),
                remove: dedup(remove),
                position: position.clone(),
            },
            EditIntent::Custom { add, remove, order, insert_index } => EditIntent::Custom {
                add: dedup(add),
                remove: dedup(remove),
                order: dedup(order),
                insert_index: *insert_index,
            },
            EditIntent::FinalOrder { order } => EditIntent::FinalOrder { order: dedup(order) },
        }
    }

    /// One-line summary for logs and terminal output.
    pub fn describe(&self) -> String {
        match self {
            EditIntent::Positional { add, remove, position } => {
                let at = match position {
                    Position::Start => "at start".to_string(),
                    Position::End => "at end".to_string(),
                    Position::After(anchor) => format!("after '{}'", anchor),
                };
                format!("add [{}] {}, remove [{}]", render_pipe(add), at, render_pipe(remove))
            }
            EditIntent::Custom { add, remove, insert_index, .. } => format!(
                "add [{}] at index {} of custom order, remove [{}]",
                render_pipe(add),
                insert_index,
                render_pipe(remove)
            ),
            EditIntent::FinalOrder { order } => format!("final order [{}]", render_pipe(order)),
        }
    }

    /// Restricts the intent to what applies to one group's list: adds already
    /// present and removes not present are dropped, and a custom order is
    /// projected onto the group's devices.
    pub fn narrowed_to(&self, reference: &DeviceList) -> EditIntent {
        let absent = |list: &[Device]| -> Vec<Device> {
            dedup(list).into_iter().filter(|d| !reference.contains(d)).collect()
        };
        let present = |list: &[Device]| -> Vec<Device> {
            dedup(list).into_iter().filter(|d| reference.contains(d)).collect()
        };

        match self {
            EditIntent::Positional { add, remove, position } => EditIntent::Positional {
                add: absent(add),
                remove: present(remove),
                position: position.clone(),
            },
            EditIntent::Custom { add, remove, order, insert_index } => {
                let order = dedup(order);
                let cut = clamp_index(*insert_index, order.len());
                let projected_index = order[..cut].iter().filter(|d| reference.contains(d)).count();
                let mut projected: Vec<Device> =
                    order.into_iter().filter(|d| reference.contains(d)).collect();
                for device in reference {
                    if !projected.contains(device) {
                        projected.push(device.clone());
                    }
                }
                EditIntent::Custom {
                    add: absent(add),
                    remove: present(remove),
                    order: projected,
                    insert_index: projected_index as i64,
                }
            }
            EditIntent::FinalOrder { order } => EditIntent::FinalOrder { order: dedup(order) },
        }
    }
}

/// Outcome of resolving an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEdit {
    pub final_order: DeviceList,
    pub added: Vec<Device>,
    pub removed: Vec<Device>,
}

/// Resolves `intent` against the `reference` list.
pub fn resolve(reference: &DeviceList, intent: &EditIntent) -> DeviceResult<ResolvedEdit> {
    let (final_order, added, removed) = match intent.normalized() {
        EditIntent::Positional { add, remove, position } => {
            check_changes(reference, &add, &remove)?;
            if let Position::After(anchor) = &position {
                if !reference.contains(anchor) {
                    return Err(DeviceError::AnchorMissing(anchor.clone()));
                }
            }

            let mut kept = without(reference.as_slice(), &remove);
            let at = match &position {
                Position::Start => 0,
                Position::End => kept.len(),
                Position::After(anchor) => match kept.iter().position(|d| d == anchor) {
                    Some(idx) => idx + 1,
                    None => return Err(DeviceError::AnchorRemoved(anchor.clone())),
                },
            };
            kept.splice(at..at, add.iter().cloned());
            (kept, add, remove)
        }
        EditIntent::Custom { add, remove, order, insert_index } => {
            check_changes(reference, &add, &remove)?;
            check_permutation(reference, &order)?;

            let mut kept = without(&order, &remove);
            let at = clamp_index(insert_index, kept.len());
            kept.splice(at..at, add.iter().cloned());
            (kept, add, remove)
        }
        EditIntent::FinalOrder { order } => {
            let added: Vec<Device> = order.iter().filter(|d| !reference.contains(d)).cloned().collect();
            let removed: Vec<Device> = reference.iter().filter(|d| !order.contains(d)).cloned().collect();
            (order, added, removed)
        }
    };

    Ok(ResolvedEdit {
        final_order: DeviceList::try_from_vec(final_order)?,
        added,
        removed,
    })
}

/// Per-group resolution of one intent.
#[derive(Debug, Clone)]
pub struct GroupPreview {
    pub products: Vec<String>,
    pub result: DeviceResult<ResolvedEdit>,
}

/// Resolves `intent` separately for each group, the way the service applies it
/// when products carry different device lists.
pub fn resolve_per_group(groups: &[DeviceGroup], intent: &EditIntent) -> Vec<GroupPreview> {
    groups
        .iter()
        .map(|group| GroupPreview {
            products: group.products.clone(),
            result: resolve(&group.devices, &intent.narrowed_to(&group.devices)),
        })
        .collect()
}

fn dedup(devices: &[Device]) -> Vec<Device> {
    DeviceList::from_devices(devices.iter().cloned()).into_vec()
}

fn without(devices: &[Device], remove: &[Device]) -> Vec<Device> {
    devices.iter().filter(|d| !remove.contains(d)).cloned().collect()
}

fn clamp_index(index: i64, len: usize) -> usize {
    if index <= 0 {
        0
    } else {
        (index as u64).min(len as u64) as usize
    }
}

fn check_changes(reference: &DeviceList, add: &[Device], remove: &[Device]) -> DeviceResult<()> {
    if let Some(device) = add.iter().find(|d| reference.contains(d)) {
        return Err(DeviceError::AddAlreadyPresent(device.clone()));
    }
    if let Some(device) = remove.iter().find(|d| !reference.contains(d)) {
        return Err(DeviceError::RemoveNotPresent(device.clone()));
    }
    Ok(())
}

fn check_permutation(reference: &DeviceList, order: &[Device]) -> DeviceResult<()> {
    let missing: Vec<Device> = reference.iter().filter(|d| !order.contains(d)).cloned().collect();
    let unknown: Vec<Device> = order.iter().filter(|d| !reference.contains(d)).cloned().collect();
    if missing.is_empty() && unknown.is_empty() {
        Ok(())
    } else {
        Err(DeviceError::CustomOrderMismatch { missing, unknown })
    }
}
