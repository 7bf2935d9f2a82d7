// src/batch/state.rs
//! Job state transitions.
//!
//! `reduce` is the only way a [`BatchJob`] changes phase. It takes the job by
//! value and hands back the next one, so a rejected event leaves the caller
//! with nothing half-applied.

use super::definitions::{BatchFile, BatchJob, JobPhase, ProcessMode, SubmittedEdit};
use super::error::{BatchError, BatchResult};
use crate::devices::inventory::{
    build_map, exclusive_report, group_by_equivalence, reference_order,
};
use crate::devices::{EditIntent, FileDeviceData, GROUPING_RULE};
use crate::service::BatchStatusSnapshot;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum JobEvent {
    UploadAccepted {
        files: Vec<BatchFile>,
        device_data: Vec<FileDeviceData>,
    },
    IntentConfigured {
        intent: EditIntent,
        mode: ProcessMode,
    },
    SubmissionStarted,
    SubmissionAccepted(SubmittedEdit),
    SnapshotReceived(BatchStatusSnapshot),
    PollFailed { message: String },
    PollStalled { elapsed: Duration },
}

impl JobEvent {
    fn name(&self) -> &'static str {
        match self {
            JobEvent::UploadAccepted { .. } => "upload accepted",
            JobEvent::IntentConfigured { .. } => "intent configured",
            JobEvent::SubmissionStarted => "submission started",
            JobEvent::SubmissionAccepted(_) => "submission accepted",
            JobEvent::SnapshotReceived(_) => "status snapshot",
            JobEvent::PollFailed { .. } => "poll failed",
            JobEvent::PollStalled { .. } => "poll stalled",
        }
    }
}

pub fn reduce(job: BatchJob, event: JobEvent) -> BatchResult<BatchJob> {
    let from = job.phase;
    let name = event.name();
    let invalid = || BatchError::InvalidTransition { from, event: name };

    let next = match (from, event) {
        (JobPhase::Uploading, JobEvent::UploadAccepted { files, device_data }) => {
            let inventory = build_map(&device_data)?;
            let groups = group_by_equivalence(&inventory, GROUPING_RULE);
            let file_lists: Vec<Vec<String>> =
                device_data.iter().map(|d| d.devices.clone()).collect();
            let reference_order = reference_order(&inventory, &file_lists);
            let exclusive = exclusive_report(&inventory);
            info!(
                "Batch '{}': {} files, {} products in {} device groups",
                job.batch_id,
                files.len(),
                inventory.len(),
                groups.len()
            );
            BatchJob {
                files,
                inventory,
                groups,
                reference_order,
                exclusive,
                phase: JobPhase::Configuring,
                ..job
            }
        }
        (JobPhase::Configuring, JobEvent::IntentConfigured { intent, mode }) => {
            debug!("Batch '{}': {} ({:?})", job.batch_id, intent.describe(), mode);
            BatchJob {
                intent: Some(intent),
                process_mode: mode,
                ..job
            }
        }
        (JobPhase::Configuring, JobEvent::SubmissionStarted) => {
            if job.intent.is_none() {
                return Err(invalid());
            }
            BatchJob {
                phase: JobPhase::Submitting,
                last_error: None,
                ..job
            }
        }
        (JobPhase::Submitting, JobEvent::SubmissionAccepted(submitted)) => BatchJob {
            submitted: Some(submitted),
            phase: JobPhase::Polling,
            ..job
        },
        (JobPhase::Polling, JobEvent::SnapshotReceived(snapshot)) => apply_snapshot(job, snapshot),
        (JobPhase::Polling, JobEvent::PollFailed { message }) => BatchJob {
            last_error: Some(message),
            ..job
        },
        (JobPhase::Polling, JobEvent::PollStalled { elapsed }) => {
            warn!(
                "Batch '{}' stalled after {}s: {}",
                job.batch_id,
                elapsed.as_secs(),
                job.summary().headline()
            );
            BatchJob {
                phase: JobPhase::Stalled,
                last_error: Some(format!("No final status after {}s", elapsed.as_secs())),
                ..job
            }
        }
        _ => return Err(invalid()),
    };
    Ok(next)
}

/// Overwrites every tracked file with its entry in the snapshot and ends the
/// job once the snapshot is terminal.
fn apply_snapshot(mut job: BatchJob, snapshot: BatchStatusSnapshot) -> BatchJob {
    for file in &mut job.files {
        if let Some(entry) = snapshot.entry(&file.id) {
            file.status = entry.status;
            file.progress = entry.progress.clamp(0.0, 100.0).round() as u8;
            file.message = entry.message.clone();
        }
    }

    if snapshot.is_terminal_for(&job.tracked_ids()) {
        let summary = job.summary();
        job.phase = summary.outcome();
        info!("Batch '{}' {}: {}", job.batch_id, job.phase, summary.headline());
    }
    job
}
