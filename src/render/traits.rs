//! Rasterizer contract

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SignResult;
use crate::geometry::{PageGeometry, RenderedBounds};

/// A rendered page
#[derive(Debug, Clone)]
pub struct RasterBitmap {
    pub width: u32,
    pub height: u32,
    /// PNG-encoded pixels, upright (page rotation applied)
    pub data: Vec<u8>,
}

impl RasterBitmap {
    pub fn bounds(&self) -> RenderedBounds {
        RenderedBounds::new(self.width as f64, self.height as f64)
    }
}

/// Opens documents for rasterization
pub trait Rasterizer: Send + Sync {
    /// Fails with `InvalidPdf` when the bytes cannot be parsed
    fn open_document(&self, bytes: Arc<Vec<u8>>) -> SignResult<Arc<dyn RasterDocument>>;
}

/// An opened document
#[async_trait]
pub trait RasterDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Point size and rotation of a page; fails with `PageIndexOutOfRange`
    fn page(&self, index: usize) -> SignResult<PageGeometry>;

    /// Rasterize a page at `scale` pixels per point; fails with `RenderFailed`
    async fn render_page(&self, index: usize, scale: f32) -> SignResult<RasterBitmap>;
}
