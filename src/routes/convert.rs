//! Signature background removal endpoint

use axum::{
    extract::{Multipart, State},
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::transparency::TransparencyProvider;

use super::form::{attachment, UploadBudget, IMAGE_EXTENSIONS};

/// POST /convert_signature
///
/// Takes multipart field `signatureFile` and returns the image as a PNG with
/// its background made transparent.
pub async fn convert_signature(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut budget = UploadBudget::new(state.config().server.max_upload_bytes);

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("signatureFile") {
            continue;
        }
        let upload = budget.file(field).await?;
        upload.require_extension(IMAGE_EXTENSIONS, "image")?;

        let png = state.threshold().remove_background(&upload.bytes).await?;
        tracing::info!(
            file_name = %upload.file_name,
            input_size = upload.bytes.len(),
            output_size = png.len(),
            "Signature converted"
        );

        let download = format!("{}_transparent.png", upload.stem());
        return Ok(attachment(png, "image/png", &download));
    }

    Err(AppError::BadRequest(
        "Missing 'signatureFile' in request.".to_string(),
    ))
}
