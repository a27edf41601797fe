//! MuPDF rasterizer
//!
//! MuPDF documents are not thread-safe, so every render opens a fresh
//! document from the shared bytes inside a blocking task, serialized by a
//! per-document lock. Page metadata comes from lopdf at open time.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use mupdf::{Colorspace, Document, Matrix};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{SignError, SignResult};
use crate::geometry::PageGeometry;

use super::probe::ProbedDocument;
use super::traits::{RasterBitmap, RasterDocument, Rasterizer};

const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfRasterizer;

impl Rasterizer for MupdfRasterizer {
    fn open_document(&self, bytes: Arc<Vec<u8>>) -> SignResult<Arc<dyn RasterDocument>> {
        let meta = ProbedDocument::from_bytes(&bytes)?;

        // Reject what MuPDF itself cannot open before handing out a handle
        let doc = Document::from_bytes(&bytes, PDF_MIME)
            .map_err(|e| SignError::InvalidPdf(e.to_string()))?;
        drop(doc);

        Ok(Arc::new(MupdfDocument {
            source: bytes,
            meta,
            lock: Arc::new(Mutex::new(())),
        }))
    }
}

pub struct MupdfDocument {
    source: Arc<Vec<u8>>,
    meta: ProbedDocument,
    lock: Arc<Mutex<()>>,
}

#[async_trait]
impl RasterDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.meta.page_count()
    }

    fn page(&self, index: usize) -> SignResult<PageGeometry> {
        self.meta.page_geometry(index)
    }

    async fn render_page(&self, index: usize, scale: f32) -> SignResult<RasterBitmap> {
        self.meta.page_geometry(index)?;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(SignError::render_failed(index, format!("invalid scale {}", scale)));
        }

        let source = self.source.clone();
        let lock = self.lock.clone();

        let bitmap = tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            render_blocking(&source, index, scale)
        })
        .await
        .map_err(|e| SignError::Internal(format!("Task join error: {}", e)))??;

        debug!(
            page_index = index,
            scale,
            width = bitmap.width,
            height = bitmap.height,
            "Rendered page"
        );
        Ok(bitmap)
    }
}

fn render_blocking(source: &[u8], index: usize, scale: f32) -> SignResult<RasterBitmap> {
    let fail = |e: mupdf::Error| SignError::render_failed(index, e);

    let doc = Document::from_bytes(source, PDF_MIME).map_err(fail)?;
    let page = doc.load_page(index as i32).map_err(fail)?;

    // MuPDF applies /Rotate itself, so the raster comes out upright
    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();
    let pixmap = page
        .to_pixmap(&matrix, &colorspace, false, true)
        .map_err(fail)?;

    encode_png(&pixmap).map_err(|e| SignError::render_failed(index, e))
}

fn encode_png(pixmap: &mupdf::Pixmap) -> Result<RasterBitmap, String> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for i in 0..(width as usize * height as usize) {
        let offset = i * n;
        for c in 0..3 {
            rgb.push(samples.get(offset + c).copied().unwrap_or(u8::MAX));
        }
    }

    let img = image::RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| "Failed to create image buffer".to_string())?;

    let mut data = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
        .map_err(|e| e.to_string())?;

    Ok(RasterBitmap {
        width,
        height,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::pages::test_support::build_pdf;

    fn decoded_size(bitmap: &RasterBitmap) -> (u32, u32) {
        let img = image::load_from_memory_with_format(&bitmap.data, image::ImageFormat::Png)
            .unwrap();
        (img.width(), img.height())
    }

    #[tokio::test]
    async fn test_rotated_page_renders_upright() {
        let bytes = Arc::new(build_pdf(&[(612, 792, 90), (612, 792, 0)]));
        let doc = MupdfRasterizer.open_document(bytes).unwrap();
        assert_eq!(doc.page_count(), 2);

        let size = doc.page(0).unwrap().normalized_size().unwrap();
        assert_eq!((size.width, size.height), (792.0, 612.0));

        let bitmap = doc.render_page(0, 2.0).await.unwrap();
        let expected = ((size.width * 2.0) as i64, (size.height * 2.0) as i64);
        assert!((bitmap.width as i64 - expected.0).abs() <= 1);
        assert!((bitmap.height as i64 - expected.1).abs() <= 1);
        assert_eq!(decoded_size(&bitmap), (bitmap.width, bitmap.height));
    }

    #[tokio::test]
    async fn test_upright_page_keeps_portrait_raster() {
        let bytes = Arc::new(build_pdf(&[(612, 792, 0)]));
        let doc = MupdfRasterizer.open_document(bytes).unwrap();

        let bitmap = doc.render_page(0, 1.0).await.unwrap();
        assert!(bitmap.height > bitmap.width);
    }

    #[tokio::test]
    async fn test_out_of_range_page_and_bad_scale_fail() {
        let bytes = Arc::new(build_pdf(&[(612, 792, 0)]));
        let doc = MupdfRasterizer.open_document(bytes).unwrap();

        assert!(matches!(
            doc.render_page(3, 1.0).await,
            Err(SignError::PageIndexOutOfRange { index: 3, .. })
        ));
        assert!(matches!(
            doc.render_page(0, 0.0).await,
            Err(SignError::RenderFailed { .. })
        ));
    }

    #[test]
    fn test_broken_bytes_are_invalid_pdf() {
        let result = MupdfRasterizer.open_document(Arc::new(b"%PDF-broken".to_vec()));
        assert!(matches!(result, Err(SignError::InvalidPdf(_))));
    }
}
