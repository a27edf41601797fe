//! Interaction controller
//!
//! All positions here are rendered-page pixels; client coordinates are
//! converted with [`crate::geometry::ScreenMapping`] before they arrive.

mod controller;
mod handle;

pub use controller::{ActiveGeometry, Gesture, InteractionController, PointerTarget};
pub use handle::{HandleEdges, ResizeHandle};
