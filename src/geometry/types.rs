//! Geometry value types

use serde::{Deserialize, Serialize};

use crate::error::SignResult;

use super::transform::normalize_rotation;

/// A point in rendered-page pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Box in rendered-page pixel space (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Whether the box lies within `[0, w] x [0, h]`, allowing `tolerance` px of slack
    pub fn fits_within(&self, bounds: RenderedBounds, tolerance: f64) -> bool {
        self.x >= -tolerance
            && self.y >= -tolerance
            && self.right() <= bounds.width + tolerance
            && self.bottom() <= bounds.height + tolerance
    }
}

/// Rectangle in PDF point space (bottom-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PointRect {
    /// Top edge in point space
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

/// Page size in PDF points, after rotation normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size as displayed after applying `rotation`
    pub fn rotated(self, rotation: Rotation) -> Self {
        if rotation.swaps_axes() {
            Self {
                width: self.height,
                height: self.width,
            }
        } else {
            self
        }
    }
}

/// Point-space geometry of one source page
///
/// `size` is the unrotated CropBox (or MediaBox) extent and `origin_*` its
/// lower-left corner. `rotation_degrees` is the raw `/Rotate` value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub size: PageSize,
    pub rotation_degrees: i64,
}

impl PageGeometry {
    pub fn rotation(&self) -> SignResult<Rotation> {
        normalize_rotation(self.rotation_degrees)
    }

    /// Size of the page as displayed, with quarter turns applied
    pub fn normalized_size(&self) -> SignResult<PageSize> {
        Ok(self.size.rotated(self.rotation()?))
    }
}

/// Pixel dimensions of a rendered page raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderedBounds {
    pub width: f64,
    pub height: f64,
}

impl RenderedBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Page rotation, restricted to quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn is_rotated(self) -> bool {
        self != Rotation::Deg0
    }

    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Maps client (screen) coordinates onto the rendered page raster
///
/// The canvas may be laid out at a CSS size that differs from its backing
/// raster (device pixel ratio, CSS scaling). `origin_*` is the canvas'
/// top-left corner in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenMapping {
    pub origin_x: f64,
    pub origin_y: f64,
    pub css_width: f64,
    pub css_height: f64,
    pub raster: RenderedBounds,
}

impl ScreenMapping {
    /// Mapping for a canvas whose CSS size equals its raster size
    pub fn identity(origin_x: f64, origin_y: f64, raster: RenderedBounds) -> Self {
        Self {
            origin_x,
            origin_y,
            css_width: raster.width,
            css_height: raster.height,
            raster,
        }
    }

    fn ratio(&self) -> (f64, f64) {
        let rx = if self.css_width > 0.0 {
            self.raster.width / self.css_width
        } else {
            1.0
        };
        let ry = if self.css_height > 0.0 {
            self.raster.height / self.css_height
        } else {
            1.0
        };
        (rx, ry)
    }

    /// Client position to rendered-page pixels
    pub fn to_page(&self, client_x: f64, client_y: f64) -> Point {
        let (rx, ry) = self.ratio();
        Point::new(
            (client_x - self.origin_x) * rx,
            (client_y - self.origin_y) * ry,
        )
    }

    /// Rendered-page box back to client coordinates, for drawing overlays
    pub fn to_client(&self, b: PixelBox) -> PixelBox {
        let (rx, ry) = self.ratio();
        PixelBox::new(
            b.x / rx + self.origin_x,
            b.y / ry + self.origin_y,
            b.width / rx,
            b.height / ry,
        )
    }
}
