//! Image hosting: upload bytes, get back a public URL.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::{config::UploadSettings, errors::UploadError};

pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.cloudinary.com/v1_1";

/// A picked image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Uploads the image and returns its public URL.
    async fn upload(&self, image: ImageUpload) -> Result<String, UploadError>;
}

/// Unsigned uploads to Cloudinary using an upload preset.
pub struct CloudinaryUploader {
    http: reqwest::Client,
    endpoint: String,
    cloud_name: Option<String>,
    upload_preset: Option<String>,
}

impl CloudinaryUploader {
    pub fn new(settings: &UploadSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_UPLOAD_ENDPOINT.to_string()),
            cloud_name: non_blank(settings.cloud_name.as_deref()),
            upload_preset: non_blank(settings.upload_preset.as_deref()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.cloud_name.is_some() && self.upload_preset.is_some()
    }

    /// `{endpoint}/{cloud_name}/image/upload`
    pub fn upload_url(&self) -> Result<String, UploadError> {
        let cloud_name = self.cloud_name.as_deref().ok_or(UploadError::NotConfigured)?;
        Ok(format!("{}/{cloud_name}/image/upload", self.endpoint.trim_end_matches('/')))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

#[async_trait]
impl ImageUploader for CloudinaryUploader {
    async fn upload(&self, image: ImageUpload) -> Result<String, UploadError> {
        let url = self.upload_url()?;
        let preset = self.upload_preset.clone().ok_or(UploadError::NotConfigured)?;
        if image.bytes.is_empty() {
            return Err(UploadError::EmptyPayload);
        }

        debug!("uploading {} ({} bytes)", image.file_name, image.bytes.len());
        let form = Form::new()
            .part("file", Part::bytes(image.bytes).file_name(image.file_name))
            .text("upload_preset", preset);
        let response = self.http.post(url).multipart(form).send().await?;
        let success = response.status().is_success();
        let body = response.text().await?;
        parse_upload_response(success, &body)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<UploadFailure>,
}

#[derive(Deserialize)]
struct UploadFailure {
    message: Option<String>,
}

/// Extracts `secure_url` from a successful response, or the service's error message.
pub fn parse_upload_response(success: bool, body: &str) -> Result<String, UploadError> {
    let parsed: Option<UploadResponse> = serde_json::from_str(body).ok();
    if !success {
        let message = parsed
            .and_then(|response| response.error)
            .and_then(|failure| failure.message)
            .unwrap_or_else(|| "Upload failed".to_string());
        warn!("image upload rejected: {message}");
        return Err(UploadError::Rejected { message });
    }
    parsed
        .and_then(|response| response.secure_url)
        .ok_or_else(|| UploadError::MalformedResponse {
            message: "response has no secure_url".to_string(),
        })
}

/// Uploader keeping nothing but a counter; for tests and local runs.
#[derive(Clone, Default)]
pub struct MemoryUploader {
    uploads: Arc<AtomicU64>,
    failure: Option<String>,
}

impl MemoryUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// An uploader that rejects every upload with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            uploads: Arc::default(),
            failure: Some(message.into()),
        }
    }

    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageUploader for MemoryUploader {
    async fn upload(&self, image: ImageUpload) -> Result<String, UploadError> {
        if let Some(message) = &self.failure {
            return Err(UploadError::Rejected {
                message: message.clone(),
            });
        }
        if image.bytes.is_empty() {
            return Err(UploadError::EmptyPayload);
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("memory://uploads/{n}/{}", image.file_name))
    }
}
