// src/service/client.rs
//! HTTP implementation of [`ProcessingService`].

use super::error::{ServiceError, ServiceResult};
use super::protocol::{
    BatchProcessAck, BatchProcessRequest, BatchStatusSnapshot, BatchUploadResponse,
    ProcessRequest, ProcessResponse, SingleUploadResponse, UploadPart,
};
use super::ProcessingService;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

const CSV_MIME: &str = "text/csv";

#[derive(Debug, Clone)]
pub struct HttpProcessingClient {
    api_base: String,
    http: reqwest::Client,
}

impl HttpProcessingClient {
    /// `service_url` is the server root; `/api` is appended unless present.
    pub fn new(service_url: &str) -> Self {
        Self::with_client(service_url, reqwest::Client::new())
    }

    pub fn with_client(service_url: &str, http: reqwest::Client) -> Self {
        Self {
            api_base: api_base(service_url),
            http,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// `path` under the API base with `segment` appended as one encoded path
    /// segment, so names containing `/`, `?` or `#` stay intact.
    fn segment_url(&self, path: &str, segment: &str) -> ServiceResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.url(path))
            .map_err(|e| ServiceError::InvalidUrl(format!("{}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn csv_part(part: UploadPart) -> ServiceResult<Part> {
        Ok(Part::bytes(part.bytes)
            .file_name(part.file_name)
            .mime_str(CSV_MIME)?)
    }
}

fn api_base(service_url: &str) -> String {
    let root = service_url.trim().trim_end_matches('/');
    if root.ends_with("/api") {
        root.to_string()
    } else {
        format!("{}/api", root)
    }
}

/// FastAPI-style error body.
#[derive(Deserialize)]
struct ErrorDetail {
    detail: String,
}

async fn check(response: reqwest::Response) -> ServiceResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let raw = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorDetail>(&raw)
        .map(|e| e.detail)
        .unwrap_or(raw);
    warn!("Service responded with {}: {}", status, body);
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn json_body<T: DeserializeOwned>(response: reqwest::Response) -> ServiceResult<T> {
    let text = check(response).await?.text().await?;
    Ok(serde_json::from_str(&text)?)
}

async fn bytes_body(response: reqwest::Response) -> ServiceResult<Vec<u8>> {
    Ok(check(response).await?.bytes().await?.to_vec())
}

#[async_trait]
impl ProcessingService for HttpProcessingClient {
    async fn upload_single(&self, part: UploadPart) -> ServiceResult<SingleUploadResponse> {
        info!("Uploading '{}' ({} bytes)", part.file_name, part.bytes.len());
        let form = Form::new().part("file", Self::csv_part(part)?);
        let response = self.http.post(self.url("upload")).multipart(form).send().await?;
        json_body(response).await
    }

    async fn upload_batch(&self, parts: Vec<UploadPart>) -> ServiceResult<BatchUploadResponse> {
        info!("Uploading {} files in one batch request", parts.len());
        let mut form = Form::new();
        for part in parts {
            form = form.part("files", Self::csv_part(part)?);
        }
        let response = self
            .http
            .post(self.url("batch-upload"))
            .multipart(form)
            .send()
            .await?;
        json_body(response).await
    }

    async fn process_single(&self, request: &ProcessRequest) -> ServiceResult<ProcessResponse> {
        debug!("Processing file '{}'", request.file_id);
        let response = self.http.post(self.url("process")).json(request).send().await?;
        json_body(response).await
    }

    async fn submit_batch(&self, request: &BatchProcessRequest) -> ServiceResult<BatchProcessAck> {
        debug!(
            "Submitting batch '{}' in {} mode",
            request.batch_id,
            request.process_mode.as_wire()
        );
        let form = request.to_form()?;
        let response = self
            .http
            .post(self.url("batch-process"))
            .form(&form)
            .send()
            .await?;
        json_body(response).await
    }

    async fn batch_status(&self, batch_id: &str) -> ServiceResult<BatchStatusSnapshot> {
        let response = self
            .http
            .get(self.segment_url("batch-status", batch_id)?)
            .send()
            .await?;
        json_body(response).await
    }

    async fn download_batch(&self, batch_id: &str) -> ServiceResult<Vec<u8>> {
        let response = self
            .http
            .get(self.segment_url("batch-download", batch_id)?)
            .send()
            .await?;
        bytes_body(response).await
    }

    async fn download_file(&self, name: &str) -> ServiceResult<Vec<u8>> {
        let response = self
            .http
            .get(self.segment_url("download", name)?)
            .send()
            .await?;
        bytes_body(response).await
    }
}
