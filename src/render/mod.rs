//! Page rendering
//!
//! - [`Rasterizer`] / [`RasterDocument`]: the rasterization collaborator
//! - [`PageRenderSession`]: current page, zoom and raster bounds
//! - [`MupdfRasterizer`]: MuPDF rendering, used by the server
//! - [`PageProbe`]: lopdf-backed metadata, no pixels

mod mupdf;
mod probe;
mod session;
mod traits;

pub use self::mupdf::{MupdfDocument, MupdfRasterizer};
pub use probe::{PageProbe, ProbedDocument};
pub use session::{CompletedRender, PageRenderSession, PendingRender, RenderState};
pub use traits::{RasterBitmap, RasterDocument, Rasterizer};

use std::sync::Arc;

/// The rasterizer the server runs with
pub fn default_rasterizer() -> Arc<dyn Rasterizer> {
    Arc::new(MupdfRasterizer)
}
