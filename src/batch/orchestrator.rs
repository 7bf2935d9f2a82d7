// src/batch/orchestrator.rs
//! Drives a batch from local files to downloaded results.
//!
//! Every step takes the current [`BatchJob`] by reference and returns the next
//! one. A failed step therefore leaves the caller holding the job exactly as
//! it was, which is how a rejected submission "stays in Configuring".

use super::definitions::{BatchJob, JobPhase, ProcessMode, SubmittedEdit};
use super::error::{BatchError, BatchResult};
use super::poller::{PollConfig, PollEvent, PollHandle};
use super::state::{reduce, JobEvent};
use super::upload::UploadDraft;
use crate::devices::inventory::{build_map, reference_order};
use crate::devices::{
    resolve, resolve_per_group, DeviceList, EditIntent, GroupPreview, ProductDeviceMap,
};
use crate::service::{
    BatchProcessRequest, OutputFormat, PositionParams, ProcessRequest, ProcessResponse,
    ProcessingService, UploadedFileInfo,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub accepted_extension: String,
    pub include_subfolders: bool,
    pub output_format: OutputFormat,
    pub auto_fill_alt_text: bool,
    pub poll: PollConfig,
    pub download_dir: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            accepted_extension: "csv".to_string(),
            include_subfolders: false,
            output_format: OutputFormat::Single,
            auto_fill_alt_text: true,
            poll: PollConfig::default(),
            download_dir: PathBuf::from("."),
        }
    }
}

/// A single uploaded file outside any batch.
#[derive(Debug, Clone)]
pub struct SingleFile {
    pub file_id: String,
    pub name: String,
    /// File-wide device order, used as the reference for edits.
    pub devices: DeviceList,
    pub inventory: ProductDeviceMap,
    pub row_count: usize,
}

pub struct BatchOrchestrator<S: ProcessingService + ?Sized> {
    service: Arc<S>,
    config: OrchestratorConfig,
}

impl<S> BatchOrchestrator<S>
where
    S: ProcessingService + ?Sized + 'static,
{
    pub fn new(service: Arc<S>, config: OrchestratorConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn collect(&self, paths: &[PathBuf]) -> BatchResult<UploadDraft> {
        UploadDraft::collect(
            paths,
            &self.config.accepted_extension,
            self.config.include_subfolders,
        )
    }

    /// Uploads every file of `draft` in one request. No job exists unless all
    /// of them were accepted.
    pub async fn upload(&self, draft: &UploadDraft) -> BatchResult<BatchJob> {
        let parts = draft.read_parts().await?;
        let response = self
            .service
            .upload_batch(parts)
            .await
            .map_err(|e| BatchError::Upload(e.to_string()))?;
        let files = draft.accept(&response)?;
        let device_data = response
            .uploaded_files
            .iter()
            .map(UploadedFileInfo::device_data)
            .collect();

        reduce(
            BatchJob::new(response.batch_id.clone()),
            JobEvent::UploadAccepted { files, device_data },
        )
    }

    /// Attaches `intent` after checking it resolves for the mode it will be
    /// submitted in.
    pub fn configure(
        &self,
        job: &BatchJob,
        intent: EditIntent,
        mode: ProcessMode,
    ) -> BatchResult<BatchJob> {
        for preview in self.preview(job, &intent, mode) {
            if let Err(e) = preview.result {
                debug!("Intent rejected for products {:?}: {}", preview.products, e);
                return Err(e.into());
            }
        }
        reduce(job.clone(), JobEvent::IntentConfigured { intent, mode })
    }

    /// What `intent` would produce, without contacting the service. One entry
    /// per device group in `DifferentDevices` mode, a single entry otherwise.
    pub fn preview(&self, job: &BatchJob, intent: &EditIntent, mode: ProcessMode) -> Vec<GroupPreview> {
        match mode.resolve(job.groups.len()) {
            ProcessMode::DifferentDevices => resolve_per_group(&job.groups, intent),
            _ => vec![GroupPreview {
                products: job.inventory.keys().cloned().collect(),
                result: resolve(&job.reference_order, intent),
            }],
        }
    }

    pub async fn submit(&self, job: &BatchJob) -> BatchResult<BatchJob> {
        let started = reduce(job.clone(), JobEvent::SubmissionStarted)?;
        let Some(intent) = started.intent.clone() else {
            return Err(BatchError::InvalidTransition {
                from: job.phase,
                event: "submit",
            });
        };
        let mode = started.effective_mode();
        let (request, submitted) = self.batch_request(&started, &intent, mode)?;

        info!(
            "Submitting batch '{}' ({} files, {}): {}",
            started.batch_id,
            started.files.len(),
            mode.as_wire(),
            intent.describe()
        );
        match self.service.submit_batch(&request).await {
            Ok(ack) if !ack.is_rejected() => {
                reduce(started, JobEvent::SubmissionAccepted(submitted))
            }
            Ok(ack) => Err(BatchError::Submission(ack.message.unwrap_or(ack.status))),
            Err(e) => Err(BatchError::Submission(e.to_string())),
        }
    }

    fn batch_request(
        &self,
        job: &BatchJob,
        intent: &EditIntent,
        mode: ProcessMode,
    ) -> BatchResult<(BatchProcessRequest, SubmittedEdit)> {
        let (devices_to_add, devices_to_remove, position, final_order) = match mode {
            ProcessMode::DifferentDevices => {
                let normalized = intent.normalized();
                let (add, remove) = match &normalized {
                    // Membership changes are batch-wide; the service reorders per group.
                    EditIntent::FinalOrder { .. } => {
                        let edit = resolve(&job.reference_order, &normalized)?;
                        (edit.added, edit.removed)
                    }
                    _ => (normalized.add().to_vec(), normalized.remove().to_vec()),
                };
                let position = PositionParams::for_intent(&normalized, None);
                (add, remove, position, None)
            }
            _ => {
                let edit = resolve(&job.reference_order, intent)?;
                let position = match intent {
                    EditIntent::Positional { .. } => PositionParams::for_intent(intent, None),
                    _ => PositionParams::for_intent(intent, Some(&edit.final_order)),
                };
                (edit.added, edit.removed, position, Some(edit.final_order))
            }
        };

        let request = BatchProcessRequest {
            batch_id: job.batch_id.clone(),
            devices_to_add: devices_to_add.clone(),
            devices_to_remove: devices_to_remove.clone(),
            output_format: self.config.output_format,
            apply_to_all: true,
            auto_fill_alt_text: self.config.auto_fill_alt_text,
            position,
            process_mode: mode,
        };
        let submitted = SubmittedEdit {
            mode,
            devices_to_add,
            devices_to_remove,
            final_order,
            submitted_at: Utc::now(),
        };
        Ok((request, submitted))
    }

    pub fn start_polling(&self, job: &BatchJob) -> BatchResult<PollHandle> {
        if job.phase != JobPhase::Polling {
            return Err(BatchError::InvalidTransition {
                from: job.phase,
                event: "start polling",
            });
        }
        Ok(PollHandle::start(
            Arc::clone(&self.service),
            job.batch_id.clone(),
            job.tracked_ids(),
            self.config.poll,
        ))
    }

    /// Folds poll events into the job until it finishes or the poller stops.
    pub async fn track(&self, job: BatchJob, handle: &mut PollHandle) -> BatchResult<BatchJob> {
        self.track_with(job, handle, |_| {}).await
    }

    /// Like [`track`](Self::track), calling `on_update` after every event.
    pub async fn track_with<F>(
        &self,
        mut job: BatchJob,
        handle: &mut PollHandle,
        mut on_update: F,
    ) -> BatchResult<BatchJob>
    where
        F: FnMut(&BatchJob),
    {
        while let Some(event) = handle.next_event().await {
            let event = match event {
                PollEvent::Snapshot(snapshot) => JobEvent::SnapshotReceived(snapshot),
                PollEvent::TransientError(message) => JobEvent::PollFailed { message },
                PollEvent::Stalled { elapsed } => JobEvent::PollStalled { elapsed },
            };
            job = reduce(job, event)?;
            on_update(&job);
            if job.phase.is_finished() {
                handle.cancel();
                break;
            }
        }
        if !job.phase.is_finished() {
            warn!("Polling for '{}' stopped before the batch finished", job.batch_id);
        }
        Ok(job)
    }

    /// Upload, configure, submit and track in one go.
    pub async fn run(
        &self,
        paths: &[PathBuf],
        intent: EditIntent,
        mode: ProcessMode,
    ) -> BatchResult<BatchJob> {
        let draft = self.collect(paths)?;
        let job = self.upload(&draft).await?;
        let job = self.configure(&job, intent, mode)?;
        let job = self.submit(&job).await?;
        let mut handle = self.start_polling(&job)?;
        let job = self.track(job, &mut handle).await?;
        handle.shutdown().await;
        Ok(job)
    }

    /// Saves the batch archive as `batch_<id>_results.zip`.
    pub async fn download_all(&self, batch_id: &str) -> BatchResult<PathBuf> {
        let bytes = self
            .service
            .download_batch(batch_id)
            .await
            .map_err(|e| BatchError::Download(e.to_string()))?;
        self.save(&format!("batch_{}_results.zip", batch_id), &bytes).await
    }

    pub async fn download_one(&self, name: &str) -> BatchResult<PathBuf> {
        let bytes = self
            .service
            .download_file(name)
            .await
            .map_err(|e| BatchError::Download(e.to_string()))?;
        self.save(name, &bytes).await
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> BatchResult<PathBuf> {
        // Never let a server-supplied name escape the download dir.
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| BatchError::Download(format!("invalid file name '{}'", name)))?;
        let target = self.config.download_dir.join(file_name);
        let write = async {
            tokio::fs::create_dir_all(&self.config.download_dir).await?;
            tokio::fs::write(&target, bytes).await
        };
        write
            .await
            .map_err(|e| BatchError::Download(format!("{}: {}", target.display(), e)))?;
        info!("Saved {} bytes to {}", bytes.len(), target.display());
        Ok(target)
    }

    /// Registers one file on its own, outside any batch.
    pub async fn upload_single(&self, path: &Path) -> BatchResult<SingleFile> {
        let draft = UploadDraft::collect(&[path.to_path_buf()], &self.config.accepted_extension, false)?;
        let mut parts = draft.read_parts().await?;
        let Some(part) = parts.pop() else {
            return Err(BatchError::NoEligibleFiles {
                extension: self.config.accepted_extension.clone(),
            });
        };
        let name = part.file_name.clone();
        let response = self
            .service
            .upload_single(part)
            .await
            .map_err(|e| BatchError::Upload(e.to_string()))?;

        let data = response.device_data(&name);
        let inventory = build_map(std::slice::from_ref(&data))?;
        let devices = reference_order(&inventory, std::slice::from_ref(&data.devices));
        info!(
            "Uploaded '{}' as '{}': {} rows, {} devices",
            name,
            response.file_id,
            response.row_count,
            devices.len()
        );
        Ok(SingleFile {
            file_id: response.file_id,
            name,
            devices,
            inventory,
            row_count: response.row_count,
        })
    }

    /// Resolves `intent` against the file's devices and processes it.
    /// With `reset_all_devices` the resolved order replaces every existing
    /// device instead of being applied as a diff.
    pub async fn process_single(
        &self,
        file: &SingleFile,
        intent: &EditIntent,
        reset_all_devices: bool,
    ) -> BatchResult<ProcessResponse> {
        let edit = resolve(&file.devices, intent)?;
        let request = if reset_all_devices {
            let order = EditIntent::FinalOrder {
                order: edit.final_order.as_slice().to_vec(),
            };
            ProcessRequest {
                file_id: file.file_id.clone(),
                devices_to_add: edit.final_order.as_slice().to_vec(),
                devices_to_remove: Vec::new(),
                output_format: self.config.output_format,
                position: PositionParams::for_intent(&order, None),
                reset_all_devices: Some(true),
                auto_fill_alt_text: self.config.auto_fill_alt_text,
            }
        } else {
            let position = match intent {
                EditIntent::Positional { .. } => PositionParams::for_intent(intent, None),
                _ => PositionParams::for_intent(intent, Some(&edit.final_order)),
            };
            ProcessRequest {
                file_id: file.file_id.clone(),
                devices_to_add: edit.added,
                devices_to_remove: edit.removed,
                output_format: self.config.output_format,
                position,
                reset_all_devices: None,
                auto_fill_alt_text: self.config.auto_fill_alt_text,
            }
        };

        let response = self
            .service
            .process_single(&request)
            .await
            .map_err(|e| BatchError::Submission(e.to_string()))?;
        if !response.success {
            return Err(BatchError::Submission(format!(
                "service could not process '{}'",
                file.name
            )));
        }
        info!(
            "Processed '{}': {} rows, {} SKUs, {} output file(s)",
            file.name,
            response.total_rows,
            response.sku_count,
            response.output_files.len()
        );
        Ok(response)
    }
}
