//! PDF signing endpoint
//!
//! Accepts the multi-signature form (`signatureFiles[<id>]` parts plus a
//! `placements` JSON array) and the older single-signature form
//! (`signatureFile` plus flat coordinate fields).

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::Response,
};
use serde::Deserialize;

use crate::error::{AppError, SignError, SignResult};
use crate::geometry::{PixelBox, RenderedBounds};
use crate::pdf::LopdfDocument;
use crate::placement::PlacementStore;
use crate::state::AppState;

use super::form::{attachment, Upload, UploadBudget, IMAGE_EXTENSIONS, PDF_EXTENSIONS};

/// Text fields read from the form
const SCALAR_FIELDS: &[&str] = &[
    "pageNum",
    "x",
    "y",
    "signatureWidthPx",
    "signatureHeightPx",
    "pageWidthPx",
    "pageHeightPx",
    "removeBackground",
];

/// One entry of the `placements` JSON array
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    #[serde(default)]
    pub placement_id: Option<String>,
    pub signature_id: String,
    /// Zero-based
    pub page_num: usize,
    pub x: f64,
    pub y: f64,
    pub width_px: f64,
    pub height_px: f64,
    /// Rendered page size the box was positioned against
    #[serde(default)]
    pub page_width_px: Option<f64>,
    #[serde(default)]
    pub page_height_px: Option<f64>,
}

#[derive(Default)]
struct SignForm {
    pdf: Option<Upload>,
    signatures: BTreeMap<String, Upload>,
    legacy_signature: Option<Upload>,
    placements: Option<String>,
    fields: HashMap<String, String>,
}

impl SignForm {
    async fn read(multipart: &mut Multipart, budget: &mut UploadBudget) -> Result<Self, AppError> {
        let mut form = SignForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "pdfFile" => form.pdf = Some(budget.file(field).await?),
                "signatureFile" => form.legacy_signature = Some(budget.file(field).await?),
                "placements" => form.placements = Some(budget.text(field).await?),
                other if SCALAR_FIELDS.contains(&other) => {
                    let value = budget.text(field).await?;
                    form.fields.insert(name, value);
                }
                other => match signature_field_id(other) {
                    Some(id) => {
                        let id = id.to_string();
                        form.signatures.insert(id, budget.file(field).await?);
                    }
                    None => tracing::debug!(field = %other, "Ignoring form field"),
                },
            }
        }
        Ok(form)
    }

    fn number(&self, key: &str) -> Result<f64, AppError> {
        self.fields
            .get(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                AppError::BadRequest(format!("Missing or invalid placement data: {}", key))
            })
    }

    fn optional_number(&self, key: &str) -> Result<Option<f64>, AppError> {
        match self.fields.get(key) {
            Some(_) => self.number(key).map(Some),
            None => Ok(None),
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes"))
            .unwrap_or(false)
    }

    /// Signature files keyed by client id, and the placements that use them
    fn into_requests(
        mut self,
    ) -> Result<(Upload, BTreeMap<String, Upload>, Vec<PlacementRequest>), AppError> {
        let pdf = self
            .pdf
            .take()
            .ok_or_else(|| AppError::BadRequest("Missing PDF file.".to_string()))?;

        if let Some(raw) = self.placements.take() {
            let mut requests: Vec<PlacementRequest> = serde_json::from_str(&raw)
                .map_err(|e| AppError::BadRequest(format!("Invalid placements JSON: {}", e)))?;
            let page_width = self.optional_number("pageWidthPx")?;
            let page_height = self.optional_number("pageHeightPx")?;
            for request in &mut requests {
                request.page_width_px = request.page_width_px.or(page_width);
                request.page_height_px = request.page_height_px.or(page_height);
            }
            return Ok((pdf, self.signatures, requests));
        }

        let signature = self.legacy_signature.take().ok_or_else(|| {
            AppError::BadRequest("Missing PDF or signature file.".to_string())
        })?;
        let page_num = self
            .fields
            .get("pageNum")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or_else(|| {
                AppError::BadRequest("Missing or invalid placement data: pageNum".to_string())
            })?;
        let request = PlacementRequest {
            placement_id: None,
            signature_id: LEGACY_SIGNATURE_ID.to_string(),
            page_num,
            x: self.number("x")?,
            y: self.number("y")?,
            width_px: self.number("signatureWidthPx")?,
            height_px: self.number("signatureHeightPx")?,
            page_width_px: Some(self.number("pageWidthPx")?),
            page_height_px: Some(self.number("pageHeightPx")?),
        };

        let mut signatures = BTreeMap::new();
        signatures.insert(LEGACY_SIGNATURE_ID.to_string(), signature);
        Ok((pdf, signatures, vec![request]))
    }
}

const LEGACY_SIGNATURE_ID: &str = "signatureFile";

/// `signatureFiles[abc]` -> `abc`
fn signature_field_id(name: &str) -> Option<&str> {
    name.strip_prefix("signatureFiles[")?
        .strip_suffix(']')
        .filter(|id| !id.is_empty())
}

/// GIF uploads are re-encoded as PNG; other formats pass through
fn normalize_signature_image(bytes: Vec<u8>) -> SignResult<Vec<u8>> {
    if image::guess_format(&bytes).ok() != Some(image::ImageFormat::Gif) {
        return Ok(bytes);
    }
    let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Gif)
        .map_err(|e| SignError::UnsupportedImageFormat(e.to_string()))?;
    let mut out = Vec::new();
    img.to_rgba8()
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| SignError::Internal(format!("PNG encoding failed: {}", e)))?;
    Ok(out)
}

/// POST /sign
///
/// Every placement is validated and committed to a fresh store before the
/// document is assembled; any failure aborts with no output.
pub async fn sign_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut budget = UploadBudget::new(state.config().server.max_upload_bytes);
    let form = SignForm::read(&mut multipart, &mut budget).await?;
    let remove_background = form.flag("removeBackground");
    let (pdf, signatures, requests) = form.into_requests()?;

    pdf.require_extension(PDF_EXTENSIONS, "PDF")?;
    if requests.is_empty() {
        return Err(AppError::BadRequest("No placements provided.".to_string()));
    }

    let mut store = PlacementStore::new();
    let mut asset_ids = HashMap::with_capacity(signatures.len());
    for (client_id, upload) in signatures {
        upload.require_extension(IMAGE_EXTENSIONS, "signature image")?;
        let bytes = normalize_signature_image(upload.bytes)?;
        let id = store.add_asset(bytes, upload.file_name, false);
        if remove_background {
            state.transparency().process_asset(&mut store, id).await?;
        }
        asset_ids.insert(client_id, id);
    }

    for request in &requests {
        let asset_id = *asset_ids.get(&request.signature_id).ok_or_else(|| {
            AppError::BadRequest(format!(
                "No signature file for signatureId '{}'",
                request.signature_id
            ))
        })?;
        let rendered = match (request.page_width_px, request.page_height_px) {
            (Some(w), Some(h)) => RenderedBounds::new(w, h),
            _ => {
                return Err(AppError::BadRequest(
                    "Missing rendered page size (pageWidthPx/pageHeightPx).".to_string(),
                ))
            }
        };
        let pixel_box = PixelBox::new(request.x, request.y, request.width_px, request.height_px);
        store.commit_placement(asset_id, request.page_num, pixel_box, rendered)?;
    }

    let signed = state
        .assembler()
        .assemble::<LopdfDocument>(Arc::new(pdf.bytes.clone()), &store.snapshot())
        .await?;

    tracing::info!(
        file_name = %pdf.file_name,
        placements = store.len(),
        assets = store.assets().len(),
        remove_background,
        size = signed.len(),
        "PDF signed"
    );

    let download = format!("{}_signed.pdf", pdf.stem());
    Ok(attachment(signed, "application/pdf", &download))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use lopdf::Document;

    use super::super::test_support::{server, server_with};
    use super::*;
    use crate::config::Config;
    use crate::pdf::pages::test_support::build_pdf;
    use crate::pdf::test_images::png_with_alpha;
    use crate::render::testing::RecordingRasterizer;

    fn pdf_part(pages: &[(i64, i64, i64)]) -> Part {
        Part::bytes(build_pdf(pages))
            .file_name("contract.pdf")
            .mime_type("application/pdf")
    }

    fn png_part(name: &str) -> Part {
        Part::bytes(png_with_alpha(4, 2))
            .file_name(name)
            .mime_type("image/png")
    }

    fn first_page_content(pdf: &[u8]) -> String {
        let doc = Document::load_mem(pdf).unwrap();
        let id = doc.get_pages().into_values().next().unwrap();
        String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned()
    }

    #[test]
    fn test_signature_field_id() {
        assert_eq!(signature_field_id("signatureFiles[sig_1]"), Some("sig_1"));
        assert_eq!(signature_field_id("signatureFiles[]"), None);
        assert_eq!(signature_field_id("signatureFile"), None);
    }

    #[test]
    fn test_gif_is_reencoded_as_png() {
        let mut gif = Vec::new();
        image::RgbaImage::from_pixel(3, 3, image::Rgba([0, 0, 0, 255]))
            .write_to(&mut Cursor::new(&mut gif), image::ImageFormat::Gif)
            .unwrap();
        let out = normalize_signature_image(gif).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), image::ImageFormat::Png);

        let png = png_with_alpha(2, 2);
        assert_eq!(normalize_signature_image(png.clone()).unwrap(), png);
    }

    #[tokio::test]
    async fn test_sign_with_placements_json() {
        let placements = r#"[{"placementId":"p1","signatureId":"a","pageNum":0,
            "x":40,"y":50,"widthPx":160,"heightPx":60}]"#;
        let form = MultipartForm::new()
            .add_part("pdfFile", pdf_part(&[(612, 792, 0)]))
            .add_part("signatureFiles[a]", png_part("a.png"))
            .add_text("placements", placements)
            .add_text("pageWidthPx", "800")
            .add_text("pageHeightPx", "1000");

        let response = server().post("/sign").multipart(form).await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "application/pdf");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"contract_signed.pdf\""
        );

        let content = first_page_content(response.as_bytes());
        assert!(content.contains("122.4 0 0 47.52 30.6 704.88 cm"));
    }

    #[tokio::test]
    async fn test_sign_legacy_single_signature() {
        let form = MultipartForm::new()
            .add_part("pdfFile", pdf_part(&[(612, 792, 0)]))
            .add_part("signatureFile", png_part("sig.png"))
            .add_text("pageNum", "0")
            .add_text("x", "40")
            .add_text("y", "50")
            .add_text("signatureWidthPx", "160")
            .add_text("signatureHeightPx", "60")
            .add_text("pageWidthPx", "800")
            .add_text("pageHeightPx", "1000");

        let response = server().post("/sign").multipart(form).await;
        response.assert_status_ok();
        let content = first_page_content(response.as_bytes());
        assert!(content.contains("122.4 0 0 47.52 30.6 704.88 cm"));
    }

    #[tokio::test]
    async fn test_sign_legacy_missing_coordinates() {
        let form = MultipartForm::new()
            .add_part("pdfFile", pdf_part(&[(612, 792, 0)]))
            .add_part("signatureFile", png_part("sig.png"))
            .add_text("pageNum", "0")
            .add_text("x", "forty");

        let response = server().post("/sign").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let json: serde_json::Value = response.json();
        assert!(json["message"].as_str().unwrap().contains("x"));
    }

    #[tokio::test]
    async fn test_sign_unknown_signature_id() {
        let placements = r#"[{"signatureId":"missing","pageNum":0,"x":0,"y":0,
            "widthPx":10,"heightPx":10,"pageWidthPx":100,"pageHeightPx":100}]"#;
        let form = MultipartForm::new()
            .add_part("pdfFile", pdf_part(&[(612, 792, 0)]))
            .add_part("signatureFiles[a]", png_part("a.png"))
            .add_text("placements", placements);

        server()
            .post("/sign")
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sign_page_out_of_range() {
        let placements = r#"[{"signatureId":"a","pageNum":4,"x":0,"y":0,
            "widthPx":10,"heightPx":10,"pageWidthPx":100,"pageHeightPx":100}]"#;
        let form = MultipartForm::new()
            .add_part("pdfFile", pdf_part(&[(612, 792, 0)]))
            .add_part("signatureFiles[a]", png_part("a.png"))
            .add_text("placements", placements);

        let response = server().post("/sign").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let json: serde_json::Value = response.json();
        assert_eq!(json["error"], "page_index_out_of_range");
    }

    #[tokio::test]
    async fn test_sign_box_outside_page_is_rejected() {
        let placements = r#"[{"signatureId":"a","pageNum":0,"x":90,"y":0,
            "widthPx":50,"heightPx":10,"pageWidthPx":100,"pageHeightPx":100}]"#;
        let form = MultipartForm::new()
            .add_part("pdfFile", pdf_part(&[(612, 792, 0)]))
            .add_part("signatureFiles[a]", png_part("a.png"))
            .add_text("placements", placements);

        let response = server().post("/sign").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let json: serde_json::Value = response.json();
        assert_eq!(json["error"], "invalid_geometry");
    }

    #[tokio::test]
    async fn test_sign_missing_pdf() {
        let form = MultipartForm::new()
            .add_part("signatureFile", png_part("sig.png"))
            .add_text("placements", "[]");
        server()
            .post("/sign")
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sign_rejects_non_pdf_name() {
        let form = MultipartForm::new()
            .add_part(
                "pdfFile",
                Part::bytes(build_pdf(&[(612, 792, 0)])).file_name("contract.docx"),
            )
            .add_part("signatureFiles[a]", png_part("a.png"))
            .add_text(
                "placements",
                r#"[{"signatureId":"a","pageNum":0,"x":0,"y":0,"widthPx":10,"heightPx":10}]"#,
            )
            .add_text("pageWidthPx", "100")
            .add_text("pageHeightPx", "100");
        server()
            .post("/sign")
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sign_rotated_page_rasterizes_once() {
        let rasterizer = RecordingRasterizer::default();
        let server = server_with(Config::default(), rasterizer.clone());

        let placements = r#"[
            {"signatureId":"a","pageNum":0,"x":0,"y":0,"widthPx":79.2,"heightPx":61.2,
             "pageWidthPx":792,"pageHeightPx":612},
            {"signatureId":"a","pageNum":1,"x":40,"y":50,"widthPx":160,"heightPx":60}
        ]"#;
        let form = MultipartForm::new()
            .add_part("pdfFile", pdf_part(&[(612, 792, 90), (612, 792, 0)]))
            .add_part("signatureFiles[a]", png_part("a.png"))
            .add_text("placements", placements)
            .add_text("pageWidthPx", "800")
            .add_text("pageHeightPx", "1000");

        server.post("/sign").multipart(form).await.assert_status_ok();
        assert_eq!(rasterizer.rendered_pages(), vec![0]);
    }

    #[tokio::test]
    async fn test_sign_rotated_page_with_default_rasterizer() {
        let state = AppState::new(Config::default());
        let server = axum_test::TestServer::new(super::super::router(state)).unwrap();

        let placements = r#"[
            {"signatureId":"a","pageNum":0,"x":0,"y":0,"widthPx":79.2,"heightPx":61.2,
             "pageWidthPx":792,"pageHeightPx":612},
            {"signatureId":"a","pageNum":1,"x":40,"y":50,"widthPx":160,"heightPx":60,
             "pageWidthPx":612,"pageHeightPx":792}
        ]"#;
        let form = MultipartForm::new()
            .add_part("pdfFile", pdf_part(&[(612, 792, 90), (612, 792, 0)]))
            .add_part("signatureFiles[a]", png_part("a.png"))
            .add_text("placements", placements);

        let response = server.post("/sign").multipart(form).await;
        response.assert_status_ok();

        let doc = Document::load_mem(response.as_bytes()).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        let content = first_page_content(response.as_bytes());
        assert!(content.contains("79.2 0 0 61.2 0 550.8 cm"), "{}", content);
    }

    #[tokio::test]
    async fn test_sign_with_background_removal() {
        let placements = r#"[{"signatureId":"a","pageNum":0,"x":0,"y":0,
            "widthPx":10,"heightPx":10,"pageWidthPx":100,"pageHeightPx":100}]"#;
        let form = MultipartForm::new()
            .add_part("pdfFile", pdf_part(&[(612, 792, 0)]))
            .add_part("signatureFiles[a]", png_part("a.png"))
            .add_text("placements", placements)
            .add_text("removeBackground", "true");

        server().post("/sign").multipart(form).await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_upload_limit() {
        let config = Config {
            server: crate::config::ServerConfig {
                max_upload_bytes: 256,
                ..Config::default().server
            },
            ..Config::default()
        };
        let server = server_with(config, RecordingRasterizer::default());
        let form = MultipartForm::new()
            .add_part("pdfFile", Part::bytes(vec![b'%'; 4096]).file_name("big.pdf"));

        server
            .post("/sign")
            .multipart(form)
            .await
            .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }
}
