//! Resize handles

use serde::{Deserialize, Serialize};

/// One of the eight grab points around the active box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResizeHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

/// Which box edges a handle moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleEdges {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl HandleEdges {
    const fn new(left: bool, top: bool, right: bool, bottom: bool) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::TopLeft,
        ResizeHandle::Top,
        ResizeHandle::TopRight,
        ResizeHandle::Right,
        ResizeHandle::BottomRight,
        ResizeHandle::Bottom,
        ResizeHandle::BottomLeft,
        ResizeHandle::Left,
    ];

    pub fn edges(self) -> HandleEdges {
        match self {
            ResizeHandle::TopLeft => HandleEdges::new(true, true, false, false),
            ResizeHandle::Top => HandleEdges::new(false, true, false, false),
            ResizeHandle::TopRight => HandleEdges::new(false, true, true, false),
            ResizeHandle::Right => HandleEdges::new(false, false, true, false),
            ResizeHandle::BottomRight => HandleEdges::new(false, false, true, true),
            ResizeHandle::Bottom => HandleEdges::new(false, false, false, true),
            ResizeHandle::BottomLeft => HandleEdges::new(true, false, false, true),
            ResizeHandle::Left => HandleEdges::new(true, false, false, false),
        }
    }

    pub fn is_corner(self) -> bool {
        let e = self.edges();
        (e.left || e.right) && (e.top || e.bottom)
    }

    /// CSS cursor shown while hovering the handle
    pub fn cursor(self) -> &'static str {
        match self {
            ResizeHandle::TopLeft | ResizeHandle::BottomRight => "nwse-resize",
            ResizeHandle::TopRight | ResizeHandle::BottomLeft => "nesw-resize",
            ResizeHandle::Top | ResizeHandle::Bottom => "ns-resize",
            ResizeHandle::Left | ResizeHandle::Right => "ew-resize",
        }
    }
}
