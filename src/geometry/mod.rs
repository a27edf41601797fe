//! Coordinate transform
//!
//! Stateless conversion between the three coordinate spaces the editor deals
//! with:
//!
//! ```text
//!  screen / client px ──ScreenMapping──▶ rendered-page px ──box_to_points──▶ PDF points
//!   (CSS layout, DPR)                     (top-left origin)                  (bottom-left origin)
//! ```
//!
//! Rendered-page pixel space is the canonical frame: placements, drag and
//! resize state, and clamping all work in it. Conversion to and from other
//! frames happens only at the boundaries.

mod transform;
mod types;

pub use transform::{box_to_points, clamp_box, normalize_rotation, pixel_to_point};
pub use types::{
    PageGeometry, PageSize, PixelBox, Point, PointRect, RenderedBounds, Rotation, ScreenMapping,
};
