// src/settings/mod.rs
pub mod io;

use crate::batch::{OrchestratorConfig, PollConfig};
use crate::service::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const ENV_SERVICE_URL: &str = "DEVICEBATCH_SERVICE_URL";
pub const ENV_POLL_INTERVAL: &str = "DEVICEBATCH_POLL_INTERVAL_SECS";
pub const ENV_MAX_POLL: &str = "DEVICEBATCH_MAX_POLL_SECS";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub service_url: String,
    pub poll_interval_secs: u64,
    /// Polling stops and the batch is reported stalled after this long.
    pub max_poll_duration_secs: u64,
    pub accepted_extension: String,
    pub output_format: OutputFormat,
    pub auto_fill_alt_text: bool,
    pub download_dir: PathBuf,
    pub include_subfolders: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000".to_string(),
            poll_interval_secs: 2,
            max_poll_duration_secs: 600,
            accepted_extension: "csv".to_string(),
            output_format: OutputFormat::Single,
            auto_fill_alt_text: true,
            download_dir: PathBuf::from("."),
            include_subfolders: false,
        }
    }
}

impl AppSettings {
    /// Settings file, then environment. An unreadable file falls back to the
    /// defaults with a warning.
    pub fn load() -> Self {
        let mut settings: AppSettings = io::load_settings_from_file().unwrap_or_else(|e| {
            warn!("AppSettings: {}. Using defaults.", e);
            AppSettings::default()
        });
        settings.apply_overrides(io::env_value);
        settings
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVICE_URL).filter(|v| !v.trim().is_empty()) {
            self.service_url = url.trim().to_string();
        }
        if let Some(secs) = io::seconds_from(&lookup, ENV_POLL_INTERVAL) {
            self.poll_interval_secs = secs;
        }
        if let Some(secs) = io::seconds_from(&lookup, ENV_MAX_POLL) {
            self.max_poll_duration_secs = secs;
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            accepted_extension: self.accepted_extension.clone(),
            include_subfolders: self.include_subfolders,
            output_format: self.output_format,
            auto_fill_alt_text: self.auto_fill_alt_text,
            poll: PollConfig {
                interval: Duration::from_secs(self.poll_interval_secs.max(1)),
                max_duration: Duration::from_secs(self.max_poll_duration_secs),
            },
            download_dir: self.download_dir.clone(),
        }
    }
}
