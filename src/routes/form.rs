//! Multipart upload helpers shared by the handlers

use axum::{
    body::Body,
    extract::multipart::Field,
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

pub(crate) const PDF_EXTENSIONS: &[&str] = &["pdf"];
pub(crate) const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// A file part read into memory
#[derive(Debug)]
pub(crate) struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// File name without its extension
    pub fn stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file_name,
        }
    }

    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Reject empty names and extensions outside `allowed`
    pub fn require_extension(&self, allowed: &[&str], what: &str) -> Result<(), AppError> {
        if self.file_name.is_empty() {
            return Err(AppError::BadRequest("No selected file.".to_string()));
        }
        match self.extension() {
            Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
            _ => Err(AppError::BadRequest(format!(
                "Invalid {} file type. Allowed: {}",
                what,
                allowed.join(", ")
            ))),
        }
    }
}

/// Running total of bytes read from one request
pub(crate) struct UploadBudget {
    used: usize,
    limit: usize,
}

impl UploadBudget {
    pub fn new(limit: usize) -> Self {
        Self { used: 0, limit }
    }

    fn take(&mut self, size: usize) -> Result<(), AppError> {
        self.used += size;
        if self.used > self.limit {
            return Err(AppError::PayloadTooLarge {
                size: self.used,
                limit: self.limit,
            });
        }
        Ok(())
    }

    pub async fn file(&mut self, field: Field<'_>) -> Result<Upload, AppError> {
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        self.take(bytes.len())?;
        Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        })
    }

    pub async fn text(&mut self, field: Field<'_>) -> Result<String, AppError> {
        let text = field.text().await?;
        self.take(text.len())?;
        Ok(text)
    }
}

/// Bytes as a file download
pub(crate) fn attachment(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        file_name.replace(['"', '\\'], "_")
    );
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(bytes),
    )
        .into_response()
}
