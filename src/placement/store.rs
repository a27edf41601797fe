//! Ordered placement store with referential checks

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::{SignError, SignResult};
use crate::geometry::{PixelBox, RenderedBounds};

use super::types::{AssetId, Placement, PlacementId, PlacementSummary, SignatureAsset};

/// Slack allowed on the containment check, covering sub-pixel rounding of
/// client layout values
const CONTAINMENT_TOLERANCE_PX: f64 = 0.5;

/// Assets and placements for one editing session
///
/// Placement order is insertion order; it drives z-order on the page and the
/// summary list, and stays stable across re-renders.
#[derive(Debug, Default)]
pub struct PlacementStore {
    assets: Vec<SignatureAsset>,
    placements: Vec<Placement>,
}

impl PlacementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new signature asset
    pub fn add_asset(
        &mut self,
        bytes: Vec<u8>,
        name: impl Into<String>,
        processed: bool,
    ) -> AssetId {
        let asset = SignatureAsset {
            id: AssetId::new(),
            image_bytes: Arc::new(bytes),
            display_name: name.into(),
            is_background_processed: processed,
            revision: 0,
            created_at: Utc::now(),
        };
        let id = asset.id;
        debug!(asset_id = %id, name = %asset.display_name, processed, "Asset added");
        self.assets.push(asset);
        id
    }

    /// Swap an asset's bytes in place, keeping its id
    ///
    /// Returns the new revision. Previews built from the old bytes are stale.
    pub fn replace_asset_bytes(
        &mut self,
        id: AssetId,
        bytes: Vec<u8>,
        processed: bool,
    ) -> SignResult<u32> {
        let asset = self
            .assets
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(SignError::AssetNotFound(id))?;

        asset.image_bytes = Arc::new(bytes);
        asset.is_background_processed = processed;
        asset.revision += 1;
        debug!(asset_id = %id, revision = asset.revision, "Asset bytes replaced");
        Ok(asset.revision)
    }

    pub fn asset(&self, id: AssetId) -> Option<&SignatureAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn assets(&self) -> &[SignatureAsset] {
        &self.assets
    }

    /// Append a placement
    ///
    /// The box must have positive size and lie within `rendered`, the
    /// dimensions of the render it was positioned against.
    pub fn commit_placement(
        &mut self,
        asset_id: AssetId,
        page_index: usize,
        pixel_box: PixelBox,
        rendered: RenderedBounds,
    ) -> SignResult<PlacementId> {
        if self.asset(asset_id).is_none() {
            return Err(SignError::AssetNotFound(asset_id));
        }
        if !pixel_box.is_finite() {
            return Err(SignError::InvalidGeometry(format!(
                "non-finite box {:?}",
                pixel_box
            )));
        }
        if pixel_box.width <= 0.0 || pixel_box.height <= 0.0 {
            return Err(SignError::InvalidGeometry(format!(
                "box size must be positive, got {}x{}",
                pixel_box.width, pixel_box.height
            )));
        }
        if !rendered.is_valid() {
            return Err(SignError::InvalidGeometry(format!(
                "invalid rendered page size {}x{}",
                rendered.width, rendered.height
            )));
        }
        if !pixel_box.fits_within(rendered, CONTAINMENT_TOLERANCE_PX) {
            return Err(SignError::InvalidGeometry(format!(
                "box ({}, {}, {}, {}) exceeds rendered page {}x{}",
                pixel_box.x,
                pixel_box.y,
                pixel_box.width,
                pixel_box.height,
                rendered.width,
                rendered.height
            )));
        }

        let placement = Placement {
            id: PlacementId::new(),
            asset_id,
            page_index,
            pixel_box,
            rendered,
        };
        let id = placement.id;
        debug!(placement_id = %id, asset_id = %asset_id, page_index, "Placement committed");
        self.placements.push(placement);
        Ok(id)
    }

    /// Remove a placement; unknown ids are ignored
    ///
    /// Returns whether anything was removed.
    pub fn remove_placement(&mut self, id: PlacementId) -> bool {
        match self.placements.iter().position(|p| p.id == id) {
            Some(pos) => {
                self.placements.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn placements_for_page(&self, page_index: usize) -> Vec<&Placement> {
        self.placements
            .iter()
            .filter(|p| p.page_index == page_index)
            .collect()
    }

    pub fn unique_asset_ids_in_use(&self) -> BTreeSet<AssetId> {
        self.placements.iter().map(|p| p.asset_id).collect()
    }

    /// Number of placements
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Drop every asset and placement
    pub fn reset(&mut self) {
        self.assets.clear();
        self.placements.clear();
    }

    /// Owned copy of the placements plus every asset they reference
    pub fn snapshot(&self) -> StoreSnapshot {
        let in_use = self.unique_asset_ids_in_use();
        let assets = self
            .assets
            .iter()
            .filter(|a| in_use.contains(&a.id))
            .map(|a| (a.id, a.clone()))
            .collect();
        StoreSnapshot {
            assets,
            placements: self.placements.clone(),
        }
    }

    pub fn summaries(&self) -> Vec<PlacementSummary> {
        self.placements
            .iter()
            .map(|p| {
                let name = self.asset(p.asset_id).map(|a| a.display_name.as_str());
                PlacementSummary::new(p, name)
            })
            .collect()
    }
}

/// Immutable view of a store taken at the start of assembly
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub assets: HashMap<AssetId, SignatureAsset>,
    pub placements: Vec<Placement>,
}

impl StoreSnapshot {
    pub fn placements_for_page(&self, page_index: usize) -> impl Iterator<Item = &Placement> {
        self.placements
            .iter()
            .filter(move |p| p.page_index == page_index)
    }

    pub fn unique_asset_ids_in_use(&self) -> BTreeSet<AssetId> {
        self.placements.iter().map(|p| p.asset_id).collect()
    }
}
