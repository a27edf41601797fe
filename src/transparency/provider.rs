//! Transparency providers
//!
//! One capability, several backends: the in-process threshold pass and the
//! external background-removal endpoint both turn image bytes into a PNG
//! with a transparent background.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::assembler::ImageFormat;
use crate::error::{SignError, SignResult};

use super::threshold;
use super::types::{ThresholdOptions, TransparencyMode};

/// Transparency provider trait
#[async_trait]
pub trait TransparencyProvider: Send + Sync {
    fn mode(&self) -> TransparencyMode;

    /// Check if the provider can be used
    async fn is_available(&self) -> bool;

    /// Return a PNG of `image_data` with its background removed
    async fn remove_background(&self, image_data: &[u8]) -> SignResult<Vec<u8>>;
}

/// Local colour-threshold provider
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdProvider {
    options: ThresholdOptions,
}

impl ThresholdProvider {
    pub fn new(options: ThresholdOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ThresholdOptions {
        self.options
    }
}

#[async_trait]
impl TransparencyProvider for ThresholdProvider {
    fn mode(&self) -> TransparencyMode {
        TransparencyMode::Local
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn remove_background(&self, image_data: &[u8]) -> SignResult<Vec<u8>> {
        let data = image_data.to_vec();
        let options = self.options;
        tokio::task::spawn_blocking(move || threshold::remove_background(&data, options))
            .await
            .map_err(|e| SignError::Internal(format!("Task join error: {}", e)))?
    }
}

/// HTTP background-removal collaborator
///
/// Posts the image as multipart field `signatureFile` and expects PNG bytes
/// back. Failures are reported, never retried.
pub struct RemoteProvider {
    url: String,
    client: reqwest::Client,
}

impl RemoteProvider {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransparencyProvider for RemoteProvider {
    fn mode(&self) -> TransparencyMode {
        TransparencyMode::Remote
    }

    async fn is_available(&self) -> bool {
        reqwest::Url::parse(&self.url).is_ok()
    }

    async fn remove_background(&self, image_data: &[u8]) -> SignResult<Vec<u8>> {
        let (file_name, mime) = match ImageFormat::detect(image_data) {
            Ok(ImageFormat::Jpeg) => ("signature.jpg", "image/jpeg"),
            _ => ("signature.png", "image/png"),
        };
        let part = Part::bytes(image_data.to_vec())
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| SignError::Internal(format!("Invalid MIME type: {}", e)))?;
        let form = Form::new().part("signatureFile", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Background removal request failed: {}", e);
                SignError::ServiceError {
                    status: None,
                    message: format!("Failed to call background removal service: {}", e),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SignError::ServiceError {
                status: Some(status.as_u16()),
                message: format!("Background removal service returned {}: {}", status, body),
            });
        }

        let bytes = response.bytes().await.map_err(|e| SignError::ServiceError {
            status: Some(status.as_u16()),
            message: format!("Failed to read response: {}", e),
        })?;
        debug!(size = bytes.len(), "Background removal response received");

        if ImageFormat::detect(&bytes).ok() != Some(ImageFormat::Png) {
            return Err(SignError::ServiceError {
                status: Some(status.as_u16()),
                message: "Background removal service did not return a PNG".to_string(),
            });
        }
        Ok(bytes.to_vec())
    }
}

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    /// Bytes to return; `None` fails with a 503 service error
    pub output: Option<Vec<u8>>,
    pub available: bool,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    pub fn returning(output: Option<Vec<u8>>) -> Self {
        Self {
            output,
            available: true,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl TransparencyProvider for MockProvider {
    fn mode(&self) -> TransparencyMode {
        TransparencyMode::Remote
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn remove_background(&self, _image_data: &[u8]) -> SignResult<Vec<u8>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.output.clone().ok_or_else(|| SignError::ServiceError {
            status: Some(503),
            message: "mock failure".to_string(),
        })
    }
}
