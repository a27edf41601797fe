//! Page render session
//!
//! Tracks which page of the open document is shown and at what zoom, along
//! with the pixel size of the raster that produced the current view. Those
//! bounds are what the interaction controller clamps against and what new
//! placements record.
//!
//! Renders are split in three steps so the caller can await the rasterizer
//! without holding the session:
//!
//! ```text
//! request() ──▶ PendingRender::execute().await ──▶ apply()
//!  (bumps generation)                              (drops stale results)
//! ```
//!
//! Only the most recent request can be applied. Opening or closing a
//! document also invalidates anything in flight.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EditorConfig;
use crate::error::{SignError, SignResult};
use crate::geometry::{PageGeometry, RenderedBounds};

use super::traits::{RasterBitmap, RasterDocument, Rasterizer};

/// What is currently on screen
#[derive(Debug, Clone)]
pub struct RenderState {
    pub page_index: usize,
    pub zoom: f32,
    pub bounds: RenderedBounds,
    pub bitmap: Arc<RasterBitmap>,
}

/// A render that has been requested but not yet executed
pub struct PendingRender {
    generation: u64,
    page_index: usize,
    zoom: f32,
    document: Arc<dyn RasterDocument>,
}

impl PendingRender {
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Run the rasterizer
    pub async fn execute(self) -> SignResult<CompletedRender> {
        let bitmap = self
            .document
            .render_page(self.page_index, self.zoom)
            .await?;
        Ok(CompletedRender {
            generation: self.generation,
            page_index: self.page_index,
            zoom: self.zoom,
            bitmap,
        })
    }
}

/// A finished raster waiting to be applied
pub struct CompletedRender {
    generation: u64,
    page_index: usize,
    zoom: f32,
    bitmap: RasterBitmap,
}

pub struct PageRenderSession {
    document: Option<Arc<dyn RasterDocument>>,
    default_zoom: f32,
    current: Option<RenderState>,
    generation: u64,
}

impl PageRenderSession {
    pub fn new(default_zoom: f32) -> Self {
        Self {
            document: None,
            default_zoom,
            current: None,
            generation: 0,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.default_zoom)
    }

    /// Open a document, replacing any previous one
    ///
    /// On failure the previous document stays open. Returns the page count.
    pub fn open(&mut self, rasterizer: &dyn Rasterizer, bytes: Arc<Vec<u8>>) -> SignResult<usize> {
        let document = rasterizer.open_document(bytes)?;
        let page_count = document.page_count();
        if page_count == 0 {
            return Err(SignError::InvalidPdf("document has no pages".to_string()));
        }

        self.generation += 1;
        self.document = Some(document);
        self.current = None;
        info!(page_count, "Document opened");
        Ok(page_count)
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.document = None;
        self.current = None;
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&Arc<dyn RasterDocument>> {
        self.document.as_ref()
    }

    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.page_count())
    }

    pub fn page_geometry(&self, index: usize) -> SignResult<PageGeometry> {
        self.open_document()?.page(index)
    }

    pub fn current(&self) -> Option<&RenderState> {
        self.current.as_ref()
    }

    pub fn current_page_index(&self) -> Option<usize> {
        self.current.as_ref().map(|c| c.page_index)
    }

    /// One-based page number for display
    pub fn current_page_number(&self) -> Option<usize> {
        self.current_page_index().map(|i| i + 1)
    }

    pub fn zoom(&self) -> f32 {
        self.current.as_ref().map_or(self.default_zoom, |c| c.zoom)
    }

    /// Pixel size of the raster currently shown
    pub fn bounds(&self) -> Option<RenderedBounds> {
        self.current.as_ref().map(|c| c.bounds)
    }

    fn open_document(&self) -> SignResult<&Arc<dyn RasterDocument>> {
        self.document
            .as_ref()
            .ok_or_else(|| SignError::InvalidPdf("no document is open".to_string()))
    }

    /// Start a render, superseding any earlier request
    pub fn request(&mut self, page_index: usize, zoom: f32) -> SignResult<PendingRender> {
        let document = self.open_document()?.clone();
        let page_count = document.page_count();
        if page_index >= page_count {
            return Err(SignError::PageIndexOutOfRange {
                index: page_index,
                page_count,
            });
        }
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(SignError::InvalidGeometry(format!("invalid zoom {}", zoom)));
        }

        self.generation += 1;
        debug!(page_index, zoom, generation = self.generation, "Render requested");
        Ok(PendingRender {
            generation: self.generation,
            page_index,
            zoom,
            document,
        })
    }

    /// Install a finished render
    ///
    /// Returns `Ok(None)` when a newer request, or an open/close, has made
    /// this result stale.
    pub fn apply(&mut self, completed: CompletedRender) -> SignResult<Option<RenderedBounds>> {
        if completed.generation != self.generation {
            warn!(
                page_index = completed.page_index,
                generation = completed.generation,
                current = self.generation,
                "Discarding stale render"
            );
            return Ok(None);
        }

        let bounds = completed.bitmap.bounds();
        if !bounds.is_valid() {
            return Err(SignError::render_failed(
                completed.page_index,
                "rasterizer returned an empty bitmap",
            ));
        }

        self.current = Some(RenderState {
            page_index: completed.page_index,
            zoom: completed.zoom,
            bounds,
            bitmap: Arc::new(completed.bitmap),
        });
        Ok(Some(bounds))
    }

    /// Render `page_index` at `zoom` and make it current
    pub async fn render(&mut self, page_index: usize, zoom: f32) -> SignResult<RenderedBounds> {
        let pending = self.request(page_index, zoom)?;
        let completed = pending.execute().await?;
        self.apply(completed)?
            .ok_or_else(|| SignError::Internal("render superseded".to_string()))
    }

    /// Move to a one-based page number; out-of-range numbers are ignored
    pub async fn go_to_page(&mut self, page_number: usize) -> SignResult<Option<RenderedBounds>> {
        if page_number == 0 || page_number > self.page_count() {
            return Ok(None);
        }
        let zoom = self.zoom();
        self.render(page_number - 1, zoom).await.map(Some)
    }

    pub async fn next_page(&mut self) -> SignResult<Option<RenderedBounds>> {
        match self.current_page_number() {
            Some(n) => self.go_to_page(n + 1).await,
            None => self.go_to_page(1).await,
        }
    }

    pub async fn previous_page(&mut self) -> SignResult<Option<RenderedBounds>> {
        match self.current_page_number() {
            Some(n) if n > 1 => self.go_to_page(n - 1).await,
            _ => Ok(None),
        }
    }

    /// Re-render the current page at a new zoom
    pub async fn set_zoom(&mut self, zoom: f32) -> SignResult<Option<RenderedBounds>> {
        let page_index = self.current_page_index().unwrap_or(0);
        if !self.is_open() {
            return Ok(None);
        }
        self.render(page_index, zoom).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::RecordingRasterizer;
    use super::*;
    use crate::pdf::pages::test_support::build_pdf;

    fn open_session(pages: &[(i64, i64, i64)]) -> (PageRenderSession, RecordingRasterizer) {
        let rasterizer = RecordingRasterizer::default();
        let mut session = PageRenderSession::from_config(&EditorConfig::default());
        session
            .open(&rasterizer, Arc::new(build_pdf(pages)))
            .unwrap();
        (session, rasterizer)
    }

    #[test]
    fn test_configured_zoom_applies_before_first_render() {
        let config = EditorConfig {
            default_zoom: 2.25,
            ..EditorConfig::default()
        };
        let session = PageRenderSession::from_config(&config);
        assert_eq!(session.zoom(), 2.25);
        assert!(session.bounds().is_none());
    }

    #[tokio::test]
    async fn test_render_stores_bounds() {
        let (mut session, _) = open_session(&[(612, 792, 0)]);
        assert!(session.bounds().is_none());

        let bounds = session.render(0, 1.5).await.unwrap();
        assert_eq!(bounds, RenderedBounds::new(918.0, 1188.0));
        assert_eq!(session.bounds(), Some(bounds));
        assert_eq!(session.current_page_number(), Some(1));
    }

    #[tokio::test]
    async fn test_failed_render_leaves_state_unchanged() {
        let (mut session, rasterizer) = open_session(&[(612, 792, 0), (612, 792, 0)]);
        session.render(0, 1.0).await.unwrap();
        rasterizer.fail_page(1);

        let err = session.render(1, 2.0).await.unwrap_err();
        assert!(matches!(err, SignError::RenderFailed { page_index: 1, .. }));
        assert_eq!(session.current_page_index(), Some(0));
        assert_eq!(session.zoom(), 1.0);
        assert_eq!(session.bounds(), Some(RenderedBounds::new(612.0, 792.0)));
    }

    #[tokio::test]
    async fn test_stale_render_is_discarded() {
        let (mut session, _) = open_session(&[(612, 792, 0), (300, 400, 0)]);

        let first = session.request(0, 1.0).unwrap();
        let second = session.request(1, 1.0).unwrap();
        let first = first.execute().await.unwrap();
        let second = second.execute().await.unwrap();

        assert_eq!(session.apply(first).unwrap(), None);
        assert!(session.bounds().is_none());
        assert_eq!(
            session.apply(second).unwrap(),
            Some(RenderedBounds::new(300.0, 400.0))
        );
        assert_eq!(session.current_page_index(), Some(1));
    }

    #[tokio::test]
    async fn test_close_discards_in_flight_render() {
        let (mut session, _) = open_session(&[(612, 792, 0)]);
        let pending = session.request(0, 1.0).unwrap();
        session.close();

        let completed = pending.execute().await.unwrap();
        assert_eq!(session.apply(completed).unwrap(), None);
        assert!(session.current().is_none());
        assert_eq!(session.page_count(), 0);
    }

    #[tokio::test]
    async fn test_navigation_is_bounds_checked() {
        let (mut session, rasterizer) = open_session(&[(612, 792, 0), (612, 792, 0)]);
        session.render(0, 1.5).await.unwrap();

        assert!(session.previous_page().await.unwrap().is_none());
        assert_eq!(session.current_page_number(), Some(1));

        assert!(session.next_page().await.unwrap().is_some());
        assert_eq!(session.current_page_number(), Some(2));
        assert!(session.next_page().await.unwrap().is_none());
        assert_eq!(session.current_page_number(), Some(2));

        assert!(session.go_to_page(0).await.unwrap().is_none());
        assert!(session.go_to_page(3).await.unwrap().is_none());
        assert_eq!(rasterizer.render_count(), 2);
    }

    #[tokio::test]
    async fn test_set_zoom_rerenders_current_page() {
        let (mut session, _) = open_session(&[(100, 200, 0), (612, 792, 0)]);
        session.go_to_page(1).await.unwrap();
        let bounds = session.set_zoom(2.0).await.unwrap().unwrap();

        assert_eq!(bounds, RenderedBounds::new(200.0, 400.0));
        assert_eq!(session.zoom(), 2.0);
        assert_eq!(session.current_page_index(), Some(0));
    }

    #[tokio::test]
    async fn test_request_validation() {
        let mut session = PageRenderSession::new(1.5);
        assert!(matches!(
            session.request(0, 1.0),
            Err(SignError::InvalidPdf(_))
        ));

        let (mut session, _) = open_session(&[(612, 792, 0)]);
        assert!(matches!(
            session.request(1, 1.0),
            Err(SignError::PageIndexOutOfRange {
                index: 1,
                page_count: 1
            })
        ));
        assert!(matches!(
            session.request(0, 0.0),
            Err(SignError::InvalidGeometry(_))
        ));
    }
}
