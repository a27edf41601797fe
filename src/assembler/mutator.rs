//! PDF mutation seam
//!
//! The assembler only talks to this trait; [`crate::pdf::LopdfDocument`] is
//! the production implementation.

use crate::error::{SignError, SignResult};
use crate::geometry::{PageGeometry, PageSize, PointRect};

/// Raster formats that can be embedded as image XObjects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Sniff the format from magic bytes
    pub fn detect(bytes: &[u8]) -> SignResult<Self> {
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Png) => Ok(Self::Png),
            Ok(image::ImageFormat::Jpeg) => Ok(Self::Jpeg),
            Ok(other) => Err(SignError::UnsupportedImageFormat(format!("{:?}", other))),
            Err(_) => Err(SignError::UnsupportedImageFormat(
                "unrecognized image data".to_string(),
            )),
        }
    }
}

/// A loaded, mutable PDF
///
/// Page handles come from [`source_page`](Self::source_page),
/// [`copy_page`](Self::copy_page) or [`add_image_page`](Self::add_image_page).
/// Once [`begin_output`](Self::begin_output) has been called, only pages
/// copied or added afterwards end up in the saved document, in that order.
pub trait PdfMutator: Sized + Send + 'static {
    type Image: Copy + Send + 'static;
    type Page: Copy + Send + 'static;

    fn load(bytes: &[u8]) -> SignResult<Self>;

    fn page_count(&self) -> usize;

    /// Geometry of a source page
    fn page_geometry(&self, index: usize) -> SignResult<PageGeometry>;

    fn source_page(&self, index: usize) -> SignResult<Self::Page>;

    fn embed_image(&mut self, bytes: &[u8], format: ImageFormat) -> SignResult<Self::Image>;

    /// Draw an image into `rect`, in the page's default user space
    fn draw_image(&mut self, page: Self::Page, image: Self::Image, rect: PointRect)
        -> SignResult<()>;

    /// Start a fresh page sequence for the output
    fn begin_output(&mut self);

    /// Append a source page to the output, keeping its vector content
    fn copy_page(&mut self, index: usize) -> SignResult<Self::Page>;

    /// Append a blank page of `size` showing `image` edge to edge
    fn add_image_page(&mut self, image: Self::Image, size: PageSize) -> SignResult<Self::Page>;

    fn save(self) -> SignResult<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(
            ImageFormat::detect(b"\x89PNG\r\n\x1a\n....").unwrap(),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]).unwrap(),
            ImageFormat::Jpeg
        );
        assert!(matches!(
            ImageFormat::detect(b"GIF89a......"),
            Err(SignError::UnsupportedImageFormat(_))
        ));
        assert!(matches!(
            ImageFormat::detect(b"hello"),
            Err(SignError::UnsupportedImageFormat(_))
        ));
    }
}
