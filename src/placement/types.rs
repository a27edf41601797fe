//! Placement store records

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{PixelBox, RenderedBounds};

/// Opaque signature asset identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque placement identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(Uuid);

impl PlacementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlacementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An uploaded or drawn signature image
#[derive(Debug, Clone)]
pub struct SignatureAsset {
    pub id: AssetId,
    /// Encoded raster (PNG/JPEG), shared with snapshots
    pub image_bytes: Arc<Vec<u8>>,
    pub display_name: String,
    /// False while an upload may still carry an opaque background
    pub is_background_processed: bool,
    /// Bumped every time the bytes are replaced
    pub revision: u32,
    pub created_at: DateTime<Utc>,
}

impl SignatureAsset {
    /// Pixel dimensions read from the image header, if the format is known
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image::ImageReader::new(Cursor::new(self.image_bytes.as_slice()))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }

    /// Width over height
    pub fn aspect_ratio(&self) -> Option<f64> {
        match self.dimensions()? {
            (w, h) if w > 0 && h > 0 => Some(w as f64 / h as f64),
            _ => None,
        }
    }
}

/// A committed signature position on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: PlacementId,
    pub asset_id: AssetId,
    /// Zero-based
    pub page_index: usize,
    /// Box in the pixel space of the render that was visible at commit
    pub pixel_box: PixelBox,
    /// That render's dimensions
    pub rendered: RenderedBounds,
}

/// One row of the placement summary list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementSummary {
    pub placement_id: PlacementId,
    pub page_number: usize,
    pub label: String,
}

impl PlacementSummary {
    pub(crate) fn new(placement: &Placement, asset_name: Option<&str>) -> Self {
        let page_number = placement.page_index + 1;
        let name = match asset_name {
            Some(name) => format!("{}...", name.chars().take(15).collect::<String>()),
            None => {
                let id = placement.asset_id.to_string();
                format!("ID: {}...", &id[..8])
            }
        };
        Self {
            placement_id: placement.id,
            page_number,
            label: format!("Sig: {} on Page {}", name, page_number),
        }
    }
}
