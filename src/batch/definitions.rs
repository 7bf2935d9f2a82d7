// src/batch/definitions.rs

use super::summary::BatchSummary;
use crate::devices::{Device, DeviceGroup, DeviceList, EditIntent, ProductDeviceMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Processing status of one file, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    #[default]
    Pending,
    Processing,
    #[serde(alias = "success")]
    Completed,
    #[serde(alias = "failed", alias = "validation_failed")]
    Error,
    /// A status string this client does not know. Treated as still running.
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFile {
    /// Server-assigned id once the upload is accepted.
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    pub status: FileStatus,
    /// 0..=100
    pub progress: u8,
    pub message: Option<String>,
}

impl BatchFile {
    pub fn pending(id: impl Into<String>, name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size_bytes,
            status: FileStatus::Pending,
            progress: 0,
            message: None,
        }
    }
}

/// How an edit is applied across the products of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessMode {
    /// One resolved list for every product.
    SameDevices,
    /// The service re-applies the intent per device group.
    DifferentDevices,
    /// Picked from the group partition at submit time.
    #[default]
    Auto,
}

impl ProcessMode {
    pub fn infer(group_count: usize) -> Self {
        if group_count > 1 {
            ProcessMode::DifferentDevices
        } else {
            ProcessMode::SameDevices
        }
    }

    /// Concrete mode; `Auto` defers to the partition.
    pub fn resolve(self, group_count: usize) -> Self {
        match self {
            ProcessMode::Auto => Self::infer(group_count),
            explicit => explicit,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            ProcessMode::SameDevices => "same_devices",
            ProcessMode::DifferentDevices => "different_devices",
            ProcessMode::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobPhase {
    Uploading,
    Configuring,
    Submitting,
    Polling,
    Completed,
    PartiallyFailed,
    Failed,
    /// Polling gave up after the configured maximum duration.
    Stalled,
}

impl JobPhase {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobPhase::Completed | JobPhase::PartiallyFailed | JobPhase::Failed | JobPhase::Stalled
        )
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobPhase::Uploading => "uploading",
            JobPhase::Configuring => "configuring",
            JobPhase::Submitting => "submitting",
            JobPhase::Polling => "polling",
            JobPhase::Completed => "completed",
            JobPhase::PartiallyFailed => "partially failed",
            JobPhase::Failed => "failed",
            JobPhase::Stalled => "stalled",
        };
        f.write_str(name)
    }
}

/// What was actually sent with the batch-process call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedEdit {
    pub mode: ProcessMode,
    pub devices_to_add: Vec<Device>,
    pub devices_to_remove: Vec<Device>,
    /// Present only when the edit was resolved locally (`SameDevices`).
    pub final_order: Option<DeviceList>,
    pub submitted_at: DateTime<Utc>,
}

/// One uploaded batch. Only ever replaced through `state::reduce`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchJob {
    pub batch_id: String,
    pub files: Vec<BatchFile>,
    /// Operator's choice. See [`BatchJob::effective_mode`].
    pub process_mode: ProcessMode,
    pub intent: Option<EditIntent>,
    pub phase: JobPhase,
    pub inventory: ProductDeviceMap,
    pub groups: Vec<DeviceGroup>,
    pub reference_order: DeviceList,
    pub exclusive: BTreeMap<String, Vec<Device>>,
    pub submitted: Option<SubmittedEdit>,
    pub created_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl BatchJob {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            files: Vec::new(),
            process_mode: ProcessMode::Auto,
            intent: None,
            phase: JobPhase::Uploading,
            inventory: ProductDeviceMap::new(),
            groups: Vec::new(),
            reference_order: DeviceList::new(),
            exclusive: BTreeMap::new(),
            submitted: None,
            created_at: Utc::now(),
            last_error: None,
        }
    }

    pub fn effective_mode(&self) -> ProcessMode {
        self.process_mode.resolve(self.groups.len())
    }

    pub fn tracked_ids(&self) -> Vec<String> {
        self.files.iter().map(|f| f.id.clone()).collect()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_files(&self.files)
    }
}
