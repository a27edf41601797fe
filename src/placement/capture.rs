//! Drawing capture boundary
//!
//! The freehand pad lives in the browser; the core only sees the raster it
//! emits and whether anything was drawn.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};

use crate::error::{SignError, SignResult};

/// Source of a drawn signature raster
pub trait DrawingCapture {
    /// True when no stroke has been made
    fn is_empty(&self) -> bool;

    /// Encoded PNG of the drawing
    fn to_png(&self) -> SignResult<Vec<u8>>;
}

/// Name given to drawn signatures
pub fn drawn_signature_name(at: DateTime<Utc>) -> String {
    format!("signature_{}.png", at.timestamp_millis())
}

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Capture backed by a canvas `toDataURL("image/png")` string
#[derive(Debug, Clone)]
pub struct DataUrlCapture {
    png: Vec<u8>,
    blank: bool,
}

impl DataUrlCapture {
    pub fn parse(data_url: &str) -> SignResult<Self> {
        let payload = data_url
            .trim()
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or_else(|| {
                SignError::UnsupportedImageFormat("expected a PNG data URL".to_string())
            })?;
        let png = STANDARD
            .decode(payload)
            .map_err(|e| SignError::UnsupportedImageFormat(format!("bad base64 payload: {}", e)))?;
        let blank = png.is_empty() || is_transparent(&png)?;
        Ok(Self { png, blank })
    }
}

/// A blank canvas exports a fully transparent PNG
fn is_transparent(png: &[u8]) -> SignResult<bool> {
    let img = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| SignError::UnsupportedImageFormat(format!("bad PNG payload: {}", e)))?;
    Ok(img.to_rgba8().pixels().all(|p| p.0[3] == 0))
}

impl DrawingCapture for DataUrlCapture {
    fn is_empty(&self) -> bool {
        self.blank
    }

    fn to_png(&self) -> SignResult<Vec<u8>> {
        if self.png.is_empty() {
            return Err(SignError::NothingToCommit("drawing is empty".to_string()));
        }
        Ok(self.png.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_data_url(img: &RgbaImage) -> String {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(out))
    }

    #[test]
    fn test_blank_canvas_is_empty() {
        let blank = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        let capture = DataUrlCapture::parse(&png_data_url(&blank)).unwrap();
        assert!(capture.is_empty());
    }

    #[test]
    fn test_stroked_canvas_is_not_empty() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 2, Rgba([0, 0, 0, 255]));
        let capture = DataUrlCapture::parse(&png_data_url(&img)).unwrap();
        assert!(!capture.is_empty());
        assert!(!capture.to_png().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_png_data_url() {
        assert!(matches!(
            DataUrlCapture::parse("data:image/jpeg;base64,AAAA"),
            Err(SignError::UnsupportedImageFormat(_))
        ));
    }

    #[test]
    fn test_corrupt_png_payload_is_unsupported() {
        let payload = STANDARD.encode(b"\x89PNG\r\n\x1a\nbroken");
        let url = format!("{}{}", PNG_DATA_URL_PREFIX, payload);
        assert!(matches!(
            DataUrlCapture::parse(&url),
            Err(SignError::UnsupportedImageFormat(_))
        ));
    }

    #[test]
    fn test_empty_payload_is_empty() {
        let capture = DataUrlCapture::parse(PNG_DATA_URL_PREFIX).unwrap();
        assert!(capture.is_empty());
        assert!(matches!(
            capture.to_png(),
            Err(SignError::NothingToCommit(_))
        ));
    }

    #[test]
    fn test_drawn_signature_name() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(drawn_signature_name(at), "signature_1700000000123.png");
    }
}
