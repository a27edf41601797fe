//! PDF access through lopdf
//!
//! - [`pages`]: page tree walking (inherited boxes, rotation)
//! - [`LopdfDocument`]: the [`crate::assembler::PdfMutator`] used for output
//! - image XObject embedding (PNG with soft mask, JPEG pass-through)

mod document;
pub mod pages;
mod xobject;

pub use document::{LopdfDocument, PageRef};
pub use xobject::ImageRef;

#[cfg(test)]
pub(crate) use xobject::test_images;
