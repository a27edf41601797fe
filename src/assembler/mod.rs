//! Document assembly
//!
//! Turns a snapshot of committed placements into signed PDF bytes.
//! Documents without rotated pages are stamped in place; otherwise the
//! output is rebuilt page by page with rotated pages replaced by upright
//! rasters, so signatures are never sideways relative to page content.

mod assemble;
mod mutator;

pub use assemble::{DocumentAssembler, DEFAULT_ROTATED_PAGE_SCALE};
pub use mutator::{ImageFormat, PdfMutator};
