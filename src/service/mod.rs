// src/service/mod.rs
//! Remote processing service: the only place that talks HTTP.

pub mod client;
pub mod error;
pub mod protocol;

#[cfg(test)]
pub(crate) mod fake;

pub use client::HttpProcessingClient;
pub use error::{ServiceError, ServiceResult};
pub use protocol::{
    BatchLevelStatus, BatchProcessAck, BatchProcessRequest, BatchStatusSnapshot,
    BatchUploadResponse, FileStatusEntry, OutputFormat, PositionParams, ProcessRequest,
    ProcessResponse, SingleUploadResponse, UploadPart, UploadedFileInfo,
};

use async_trait::async_trait;

/// Calls the batch pipeline makes against the processing service.
///
/// All methods take `&self` so downloads can run while a poll task holds
/// its own handle to the same service.
#[async_trait]
pub trait ProcessingService: Send + Sync {
    async fn upload_single(&self, part: UploadPart) -> ServiceResult<SingleUploadResponse>;

    /// Sends every part in one multipart request.
    async fn upload_batch(&self, parts: Vec<UploadPart>) -> ServiceResult<BatchUploadResponse>;

    async fn process_single(&self, request: &ProcessRequest) -> ServiceResult<ProcessResponse>;

    async fn submit_batch(&self, request: &BatchProcessRequest) -> ServiceResult<BatchProcessAck>;

    async fn batch_status(&self, batch_id: &str) -> ServiceResult<BatchStatusSnapshot>;

    /// Server-built archive of every output file in the batch.
    async fn download_batch(&self, batch_id: &str) -> ServiceResult<Vec<u8>>;

    async fn download_file(&self, name: &str) -> ServiceResult<Vec<u8>>;
}
