// src/service/protocol.rs
//! Wire types for the processing service.
//!
//! Device lists always cross the wire as JSON arrays of strings in order.
//! The batch-process call is a urlencoded form, so its lists are sent as
//! JSON-encoded strings inside form fields.

use crate::batch::definitions::{FileStatus, ProcessMode};
use crate::devices::{Device, DeviceList, EditIntent, FileDeviceData, Position};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One file to send in a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Response of the single-file upload.
#[derive(Debug, Clone, Deserialize)]
pub struct SingleUploadResponse {
    pub file_id: String,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub product_devices: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default)]
    pub column_count: usize,
}

impl SingleUploadResponse {
    pub fn device_data(&self, file_name: &str) -> FileDeviceData {
        FileDeviceData {
            file_name: file_name.to_string(),
            devices: self.devices.clone(),
            product_devices: self.product_devices.clone(),
        }
    }
}

/// One accepted file of a batch upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFileInfo {
    /// Older service builds omit this and identify files by `filename` only.
    #[serde(default)]
    pub file_id: Option<String>,
    /// Name the service stored the file under.
    pub filename: String,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub product_devices: BTreeMap<String, JsonValue>,
}

impl UploadedFileInfo {
    pub fn server_id(&self) -> &str {
        self.file_id.as_deref().unwrap_or(&self.filename)
    }

    pub fn original_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or(&self.filename)
    }

    pub fn device_data(&self) -> FileDeviceData {
        FileDeviceData {
            file_name: self.original_name().to_string(),
            devices: self.devices.clone(),
            product_devices: self.product_devices.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRejection {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchUploadResponse {
    pub batch_id: String,
    #[serde(default, alias = "files")]
    pub uploaded_files: Vec<UploadedFileInfo>,
    #[serde(default)]
    pub errors: Vec<UploadRejection>,
    #[serde(default)]
    pub all_devices: Vec<String>,
    #[serde(default)]
    pub all_product_devices: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// One output file.
    #[default]
    #[serde(rename = "single")]
    Single,
    /// One output file per product.
    #[serde(rename = "per_product")]
    PerProduct,
    /// Chunks of at most 60,000 rows.
    #[serde(rename = "split_60k")]
    Split60k,
}

impl OutputFormat {
    pub fn as_wire(&self) -> &'static str {
        match self {
            OutputFormat::Single => "single",
            OutputFormat::PerProduct => "per_product",
            OutputFormat::Split60k => "split_60k",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "single" => Ok(OutputFormat::Single),
            "per_product" => Ok(OutputFormat::PerProduct),
            "split_60k" => Ok(OutputFormat::Split60k),
            other => Err(format!(
                "Unknown output format '{}' (expected single, per_product or split_60k)",
                other
            )),
        }
    }
}

/// Positional parameters shared by the single and batch process calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PositionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_device: Option<Device>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_device_order: Option<Vec<Device>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_index: Option<i64>,
}

impl PositionParams {
    /// Parameters for `intent`. When the intent was already resolved locally,
    /// `final_order` replaces the operator's custom order with the full result.
    pub fn for_intent(intent: &EditIntent, final_order: Option<&DeviceList>) -> Self {
        let resolved = || final_order.map(|order| order.as_slice().to_vec());
        match intent {
            EditIntent::Positional { position, .. } => match position {
                Position::Start => Self::named("start"),
                Position::End => Self::named("end"),
                Position::After(anchor) => Self {
                    after_device: Some(anchor.clone()),
                    ..Self::named("after")
                },
            },
            EditIntent::Custom { order, insert_index, .. } => Self {
                custom_device_order: Some(resolved().unwrap_or_else(|| order.clone())),
                insert_index: Some(*insert_index),
                ..Self::named("custom")
            },
            EditIntent::FinalOrder { order } => Self {
                custom_device_order: Some(resolved().unwrap_or_else(|| order.clone())),
                ..Self::named("final_order")
            },
        }
    }

    fn named(position: &str) -> Self {
        Self {
            add_position: Some(position.to_string()),
            ..Self::default()
        }
    }
}

/// JSON body of the single-file process call.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRequest {
    pub file_id: String,
    pub devices_to_add: Vec<Device>,
    pub devices_to_remove: Vec<Device>,
    pub output_format: OutputFormat,
    #[serde(flatten)]
    pub position: PositionParams,
    /// Drop every existing device before adding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_all_devices: Option<bool>,
    pub auto_fill_alt_text: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub output_files: Vec<String>,
    #[serde(default)]
    pub total_rows: usize,
    #[serde(default)]
    pub sku_count: usize,
}

/// Form body of the batch-process call.
#[derive(Debug, Clone)]
pub struct BatchProcessRequest {
    pub batch_id: String,
    pub devices_to_add: Vec<Device>,
    pub devices_to_remove: Vec<Device>,
    pub output_format: OutputFormat,
    pub apply_to_all: bool,
    pub auto_fill_alt_text: bool,
    pub position: PositionParams,
    pub process_mode: ProcessMode,
}

impl BatchProcessRequest {
    pub fn to_form(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let mut form = vec![
            ("batch_id", self.batch_id.clone()),
            ("devices_to_add", serde_json::to_string(&self.devices_to_add)?),
            ("devices_to_remove", serde_json::to_string(&self.devices_to_remove)?),
            ("output_format", self.output_format.as_wire().to_string()),
            ("apply_to_all", self.apply_to_all.to_string()),
            ("auto_fill_alt_text", self.auto_fill_alt_text.to_string()),
            ("process_mode", self.process_mode.as_wire().to_string()),
        ];
        if let Some(position) = &self.position.add_position {
            form.push(("add_position", position.clone()));
        }
        if let Some(anchor) = &self.position.after_device {
            form.push(("after_device", anchor.to_string()));
        }
        if let Some(order) = &self.position.custom_device_order {
            form.push(("custom_device_order", serde_json::to_string(order)?));
        }
        if let Some(index) = self.position.insert_index {
            form.push(("insert_index", index.to_string()));
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchProcessAck {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl BatchProcessAck {
    pub fn is_rejected(&self) -> bool {
        self.status.eq_ignore_ascii_case("error")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchLevelStatus {
    Processing,
    Completed,
    Error,
    NotFound,
    #[serde(other)]
    Unknown,
}

impl BatchLevelStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchLevelStatus::Completed | BatchLevelStatus::Error | BatchLevelStatus::NotFound
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileStatusEntry {
    pub file_id: String,
    pub status: FileStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Full status of a batch. Each snapshot replaces the previous one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchStatusSnapshot {
    pub status: BatchLevelStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub files: Vec<FileStatusEntry>,
}

impl BatchStatusSnapshot {
    pub fn entry(&self, file_id: &str) -> Option<&FileStatusEntry> {
        self.files.iter().find(|f| f.file_id == file_id)
    }

    /// True once the batch itself is done or every tracked file is terminal.
    pub fn is_terminal_for(&self, tracked: &[String]) -> bool {
        self.status.is_terminal()
            || tracked
                .iter()
                .all(|id| self.entry(id).is_some_and(|f| f.status.is_terminal()))
    }
}
