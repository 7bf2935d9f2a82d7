// src/batch/upload.rs

use super::definitions::BatchFile;
use super::error::{BatchError, BatchResult};
use crate::service::{BatchUploadResponse, UploadPart};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// A local file waiting to be uploaded. `temp_id` identifies it until the
/// service assigns a real id.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub temp_id: Uuid,
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

/// Files selected for one batch upload.
#[derive(Debug, Clone, Default)]
pub struct UploadDraft {
    pub files: Vec<PendingUpload>,
    /// Paths dropped for having the wrong extension or a repeated name.
    pub skipped: Vec<PathBuf>,
}

impl UploadDraft {
    /// Collects files with `extension` from `paths`. Directories are scanned
    /// one level deep, or fully when `recursive` is set.
    pub fn collect(paths: &[PathBuf], extension: &str, recursive: bool) -> BatchResult<Self> {
        let mut draft = UploadDraft::default();

        for path in paths {
            if path.is_dir() {
                let depth = if recursive { usize::MAX } else { 1 };
                for entry in WalkDir::new(path)
                    .max_depth(depth)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_file())
                {
                    draft.consider(entry.path(), extension)?;
                }
            } else {
                draft.consider(path, extension)?;
            }
        }

        if draft.files.is_empty() {
            return Err(BatchError::NoEligibleFiles {
                extension: extension.to_string(),
            });
        }
        info!(
            "Selected {} files for upload ({} skipped)",
            draft.files.len(),
            draft.skipped.len()
        );
        Ok(draft)
    }

    fn consider(&mut self, path: &Path, extension: &str) -> BatchResult<()> {
        let accepted = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(extension));
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            self.skipped.push(path.to_path_buf());
            return Ok(());
        };
        if !accepted {
            debug!("Skipping '{}': not a .{} file", path.display(), extension);
            self.skipped.push(path.to_path_buf());
            return Ok(());
        }
        // Server ids are matched back by file name.
        if self.files.iter().any(|f| f.file_name == file_name) {
            warn!("Skipping '{}': another file is already named '{}'", path.display(), file_name);
            self.skipped.push(path.to_path_buf());
            return Ok(());
        }

        let size_bytes = std::fs::metadata(path)?.len();
        self.files.push(PendingUpload {
            temp_id: Uuid::new_v4(),
            path: path.to_path_buf(),
            file_name,
            size_bytes,
        });
        Ok(())
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    /// Reads every selected file into a multipart part.
    pub async fn read_parts(&self) -> BatchResult<Vec<UploadPart>> {
        let mut parts = Vec::with_capacity(self.files.len());
        for file in &self.files {
            parts.push(UploadPart {
                file_name: file.file_name.clone(),
                bytes: tokio::fs::read(&file.path).await?,
            });
        }
        Ok(parts)
    }

    /// Replaces temporary ids with the server's. Any rejected or unmatched
    /// file fails the whole upload.
    pub fn accept(&self, response: &BatchUploadResponse) -> BatchResult<Vec<BatchFile>> {
        if !response.errors.is_empty() {
            let reasons: Vec<String> = response
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.file, e.error))
                .collect();
            return Err(BatchError::Upload(format!(
                "service rejected {} file(s): {}",
                reasons.len(),
                reasons.join("; ")
            )));
        }

        self.files
            .iter()
            .map(|pending| {
                let uploaded = response
                    .uploaded_files
                    .iter()
                    .find(|u| u.original_name() == pending.file_name)
                    .ok_or_else(|| {
                        BatchError::Upload(format!(
                            "'{}' ({}) missing from the upload response",
                            pending.file_name, pending.temp_id
                        ))
                    })?;
                Ok(BatchFile::pending(
                    uploaded.server_id(),
                    pending.file_name.clone(),
                    uploaded.size.unwrap_or(pending.size_bytes),
                ))
            })
            .collect()
    }
}
