// src/batch/error.rs

use super::definitions::JobPhase;
use crate::devices::DeviceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Upload failed: {0}")]
    Upload(String),
    #[error("Submission rejected: {0}")]
    Submission(String),
    #[error("Status poll failed: {0}")]
    Polling(String),
    #[error("Download failed: {0}")]
    Download(String),
    #[error("Invalid edit: {0}")]
    Validation(#[from] DeviceError),
    #[error("Cannot apply '{event}' while the job is {from}.")]
    InvalidTransition { from: JobPhase, event: &'static str },
    #[error("No .{extension} files found in the given paths.")]
    NoEligibleFiles { extension: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BatchError {
    /// True when the service has not changed anything for this batch.
    /// Processing that partly failed is reported through the job outcome
    /// and never through an error.
    pub fn is_nothing_happened(&self) -> bool {
        matches!(
            self,
            BatchError::Upload(_)
                | BatchError::Submission(_)
                | BatchError::Validation(_)
                | BatchError::NoEligibleFiles { .. }
        )
    }
}

pub type BatchResult<T> = Result<T, BatchError>;
