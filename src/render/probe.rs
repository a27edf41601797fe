//! Metadata-only rasterizer
//!
//! Page counts, sizes and rotations come from lopdf; rendering is
//! unavailable. Enough for documents that never need rasterizing.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{SignError, SignResult};
use crate::geometry::PageGeometry;
use crate::pdf::pages;

use super::traits::{RasterBitmap, RasterDocument, Rasterizer};

#[derive(Debug, Default, Clone, Copy)]
pub struct PageProbe;

impl Rasterizer for PageProbe {
    fn open_document(&self, bytes: Arc<Vec<u8>>) -> SignResult<Arc<dyn RasterDocument>> {
        Ok(Arc::new(ProbedDocument::from_bytes(&bytes)?))
    }
}

/// Page geometry read once at open time
#[derive(Debug, Clone)]
pub struct ProbedDocument {
    pages: Vec<PageGeometry>,
}

impl ProbedDocument {
    pub fn from_bytes(bytes: &[u8]) -> SignResult<Self> {
        let doc = pages::load_document(bytes)?;
        Ok(Self {
            pages: pages::read_page_geometry(&doc)?,
        })
    }

    pub fn page_geometry(&self, index: usize) -> SignResult<PageGeometry> {
        self.pages
            .get(index)
            .copied()
            .ok_or(SignError::PageIndexOutOfRange {
                index,
                page_count: self.pages.len(),
            })
    }
}

#[async_trait]
impl RasterDocument for ProbedDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> SignResult<PageGeometry> {
        self.page_geometry(index)
    }

    async fn render_page(&self, index: usize, _scale: f32) -> SignResult<RasterBitmap> {
        self.page_geometry(index)?;
        Err(SignError::render_failed(
            index,
            "metadata-only rasterizer cannot render pages",
        ))
    }
}
