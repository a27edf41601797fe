//! Drag/resize state machine for the active signature box

use tracing::debug;

use crate::config::EditorConfig;
use crate::error::{SignError, SignResult};
use crate::geometry::{clamp_box, PixelBox, Point, RenderedBounds};
use crate::placement::{AssetId, Placement, PlacementStore, SignatureAsset};
use crate::render::PageRenderSession;

use super::handle::ResizeHandle;

const DEFAULT_OFFSET: f64 = 10.0;
const DEFAULT_WIDTH: f64 = 150.0;
const FALLBACK_HEIGHT: f64 = 75.0;
/// Heights at or below this come from broken aspect ratios
const MIN_DERIVED_HEIGHT: f64 = 10.0;

/// The box being positioned before it is committed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveGeometry {
    pub asset_id: AssetId,
    pub pixel_box: PixelBox,
}

/// What the pointer is doing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging {
        start: Point,
        initial: PixelBox,
    },
    Resizing {
        handle: ResizeHandle,
        start: Point,
        initial: PixelBox,
    },
}

/// Where a pointer-down landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Body,
    Handle(ResizeHandle),
}

/// Turns pointer events (in rendered-page pixels) into active box geometry
///
/// Dragging moves freely and is clamped on release. Resizing enforces the
/// minimum size while moving, keeping the edge opposite the handle fixed,
/// and is also clamped on release.
#[derive(Debug, Clone)]
pub struct InteractionController {
    active: Option<ActiveGeometry>,
    gesture: Gesture,
    min_size: f64,
}

impl InteractionController {
    pub fn new(min_size: f64) -> Self {
        Self {
            active: None,
            gesture: Gesture::Idle,
            min_size,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.min_box_size)
    }

    pub fn active(&self) -> Option<&ActiveGeometry> {
        self.active.as_ref()
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn min_size(&self) -> f64 {
        self.min_size
    }

    /// Make `asset` the live signature with a default box
    ///
    /// The box starts at (10, 10), 150 px wide, with its height following
    /// the image aspect ratio.
    pub fn select_asset(&mut self, asset: &SignatureAsset, bounds: Option<RenderedBounds>) {
        let height = asset
            .aspect_ratio()
            .map(|aspect| DEFAULT_WIDTH / aspect)
            .filter(|h| h.is_finite() && *h > MIN_DERIVED_HEIGHT)
            .unwrap_or(FALLBACK_HEIGHT);

        let mut pixel_box = PixelBox::new(DEFAULT_OFFSET, DEFAULT_OFFSET, DEFAULT_WIDTH, height);
        if let Some(b) = bounds {
            pixel_box = clamp_box(pixel_box, b.width, b.height);
        }

        debug!(asset_id = %asset.id, ?pixel_box, "Signature selected");
        self.active = Some(ActiveGeometry {
            asset_id: asset.id,
            pixel_box,
        });
        self.gesture = Gesture::Idle;
    }

    pub fn deselect(&mut self) {
        self.active = None;
        self.gesture = Gesture::Idle;
    }

    /// Begin a drag or resize; ignored without an active box
    pub fn pointer_down(&mut self, target: PointerTarget, at: Point) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        let initial = active.pixel_box;
        self.gesture = match target {
            PointerTarget::Body => Gesture::Dragging { start: at, initial },
            PointerTarget::Handle(handle) => Gesture::Resizing {
                handle,
                start: at,
                initial,
            },
        };
        true
    }

    /// Update the active box for the pointer now at `at`
    pub fn pointer_move(&mut self, at: Point) -> Option<PixelBox> {
        let active = self.active.as_mut()?;
        match self.gesture {
            Gesture::Idle => return None,
            Gesture::Dragging { start, initial } => {
                active.pixel_box = PixelBox {
                    x: initial.x + (at.x - start.x),
                    y: initial.y + (at.y - start.y),
                    ..initial
                };
            }
            Gesture::Resizing {
                handle,
                start,
                initial,
            } => {
                active.pixel_box =
                    resize(handle, initial, at.x - start.x, at.y - start.y, self.min_size);
            }
        }
        Some(active.pixel_box)
    }

    /// Finish the gesture, clamping into `bounds` when a page is rendered
    pub fn pointer_up(&mut self, bounds: Option<RenderedBounds>) -> Option<PixelBox> {
        let was_active = self.gesture != Gesture::Idle;
        self.gesture = Gesture::Idle;
        if !was_active {
            return None;
        }
        if let Some(b) = bounds {
            self.reclamp(b);
        }
        self.active.map(|a| a.pixel_box)
    }

    /// Pull the active box back inside new render bounds
    pub fn reclamp(&mut self, bounds: RenderedBounds) {
        if let Some(active) = self.active.as_mut() {
            active.pixel_box = clamp_box(active.pixel_box, bounds.width, bounds.height);
        }
    }

    /// Commit the active box as a placement on the current page
    ///
    /// Needs a selected signature, an open document and a rendered page.
    pub fn commit_active_placement(
        &mut self,
        store: &mut PlacementStore,
        session: &PageRenderSession,
    ) -> SignResult<Placement> {
        let active = self
            .active
            .ok_or_else(|| SignError::NothingToCommit("no signature selected".to_string()))?;
        if !session.is_open() {
            return Err(SignError::NothingToCommit("no document loaded".to_string()));
        }
        let view = session
            .current()
            .ok_or_else(|| SignError::NothingToCommit("page not rendered".to_string()))?;

        let pixel_box = clamp_box(active.pixel_box, view.bounds.width, view.bounds.height);
        let id = store.commit_placement(active.asset_id, view.page_index, pixel_box, view.bounds)?;

        self.gesture = Gesture::Idle;
        self.active = Some(ActiveGeometry {
            pixel_box,
            ..active
        });

        store
            .placements()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| SignError::Internal("committed placement missing".to_string()))
    }
}

/// Apply a resize delta for `handle` to `initial`
///
/// Below the floor the size sticks at `min_size` and any moving left/top
/// edge is placed so the opposite edge stays where it was.
fn resize(handle: ResizeHandle, initial: PixelBox, dx: f64, dy: f64, min_size: f64) -> PixelBox {
    let edges = handle.edges();
    let mut b = initial;

    if edges.left {
        b.x = initial.x + dx;
        b.width = initial.width - dx;
    } else if edges.right {
        b.width = initial.width + dx;
    }
    if edges.top {
        b.y = initial.y + dy;
        b.height = initial.height - dy;
    } else if edges.bottom {
        b.height = initial.height + dy;
    }

    if b.width < min_size {
        b.width = min_size;
        if edges.left {
            b.x = initial.right() - min_size;
        }
    }
    if b.height < min_size {
        b.height = min_size;
        if edges.top {
            b.y = initial.bottom() - min_size;
        }
    }
    b
}
