//! Placement store
//!
//! Owns the signature assets of one editing session and the ordered list of
//! committed placements. A store is created per session and discarded (or
//! [`PlacementStore::reset`]) when the session ends; nothing here is global.

mod capture;
mod store;
mod types;

pub use capture::{drawn_signature_name, DataUrlCapture, DrawingCapture};
pub use store::{PlacementStore, StoreSnapshot};
pub use types::{AssetId, Placement, PlacementId, PlacementSummary, SignatureAsset};
