// src/service/fake.rs
//! Scripted in-memory service for unit tests.

use super::error::{ServiceError, ServiceResult};
use super::protocol::{
    BatchProcessAck, BatchProcessRequest, BatchStatusSnapshot, BatchUploadResponse,
    ProcessRequest, ProcessResponse, SingleUploadResponse, UploadPart,
};
use super::ProcessingService;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

fn unavailable() -> ServiceError {
    ServiceError::Status {
        status: 503,
        body: "not scripted".to_string(),
    }
}

#[derive(Default)]
pub(crate) struct ScriptedService {
    upload: Mutex<Option<ServiceResult<BatchUploadResponse>>>,
    single_upload: Mutex<Option<ServiceResult<SingleUploadResponse>>>,
    statuses: Mutex<VecDeque<ServiceResult<BatchStatusSnapshot>>>,
    submit: Mutex<Option<ServiceResult<BatchProcessAck>>>,
    pub submitted: Mutex<Vec<BatchProcessRequest>>,
    pub processed: Mutex<Vec<ProcessRequest>>,
    pub uploaded_names: Mutex<Vec<String>>,
    status_calls: AtomicUsize,
    hang_status: AtomicBool,
    download_error: Mutex<Option<ServiceError>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload(self, response: ServiceResult<BatchUploadResponse>) -> Self {
        *self.upload.lock().unwrap() = Some(response);
        self
    }

    pub fn with_single_upload(self, response: ServiceResult<SingleUploadResponse>) -> Self {
        *self.single_upload.lock().unwrap() = Some(response);
        self
    }

    pub fn with_submit(self, response: ServiceResult<BatchProcessAck>) -> Self {
        *self.submit.lock().unwrap() = Some(response);
        self
    }

    pub fn with_statuses(self, statuses: Vec<ServiceResult<BatchStatusSnapshot>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    /// Every status request waits forever.
    pub fn with_hanging_status(self) -> Self {
        self.hang_status.store(true, Ordering::SeqCst);
        self
    }

    /// The next download of either kind fails with `error`.
    pub fn with_download_error(self, error: ServiceError) -> Self {
        *self.download_error.lock().unwrap() = Some(error);
        self
    }

    fn take_download_error(&self) -> ServiceResult<()> {
        match self.download_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessingService for ScriptedService {
    async fn upload_single(&self, part: UploadPart) -> ServiceResult<SingleUploadResponse> {
        self.uploaded_names.lock().unwrap().push(part.file_name);
        self.single_upload.lock().unwrap().take().unwrap_or_else(|| Err(unavailable()))
    }

    async fn upload_batch(&self, parts: Vec<UploadPart>) -> ServiceResult<BatchUploadResponse> {
        self.uploaded_names
            .lock()
            .unwrap()
            .extend(parts.into_iter().map(|p| p.file_name));
        self.upload.lock().unwrap().take().unwrap_or_else(|| Err(unavailable()))
    }

    async fn process_single(&self, request: &ProcessRequest) -> ServiceResult<ProcessResponse> {
        self.processed.lock().unwrap().push(request.clone());
        Ok(ProcessResponse {
            success: true,
            output_files: vec![format!("item_{}", request.file_id)],
            total_rows: 10,
            sku_count: 8,
        })
    }

    async fn submit_batch(&self, request: &BatchProcessRequest) -> ServiceResult<BatchProcessAck> {
        self.submitted.lock().unwrap().push(request.clone());
        self.submit.lock().unwrap().take().unwrap_or_else(|| {
            Ok(BatchProcessAck {
                status: "processing".to_string(),
                message: None,
            })
        })
    }

    async fn batch_status(&self, _batch_id: &str) -> ServiceResult<BatchStatusSnapshot> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_status.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.statuses.lock().unwrap().pop_front().unwrap_or_else(|| Err(unavailable()))
    }

    async fn download_batch(&self, batch_id: &str) -> ServiceResult<Vec<u8>> {
        self.take_download_error()?;
        Ok(format!("zip:{}", batch_id).into_bytes())
    }

    async fn download_file(&self, name: &str) -> ServiceResult<Vec<u8>> {
        self.take_download_error()?;
        Ok(format!("file:{}", name).into_bytes())
    }
}
