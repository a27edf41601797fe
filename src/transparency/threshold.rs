//! Colour-threshold background removal

use std::io::Cursor;

use image::{Rgba, RgbaImage};

use crate::error::{SignError, SignResult};

use super::types::ThresholdOptions;

const TRANSPARENT: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Make the background of an image transparent; output is always PNG
///
/// The background colour is the top-left pixel (white for an empty image).
/// A pixel is cleared when each RGB channel is within `tolerance` of it, or
/// when its alpha is below `alpha_floor`.
pub fn remove_background(bytes: &[u8], options: ThresholdOptions) -> SignResult<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| SignError::UnsupportedImageFormat(e.to_string()))?
        .to_rgba8();

    let cleared = clear_background(img, options);

    let mut out = Vec::new();
    cleared
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| SignError::Internal(format!("PNG encoding failed: {}", e)))?;
    Ok(out)
}

pub(crate) fn clear_background(mut img: RgbaImage, options: ThresholdOptions) -> RgbaImage {
    let background = if img.width() > 0 && img.height() > 0 {
        *img.get_pixel(0, 0)
    } else {
        Rgba([255, 255, 255, 255])
    };
    let tolerance = options.tolerance as i16;

    for pixel in img.pixels_mut() {
        let near = (0..3).all(|c| (pixel.0[c] as i16 - background.0[c] as i16).abs() <= tolerance);
        if near || pixel.0[3] < options.alpha_floor {
            *pixel = TRANSPARENT;
        }
    }
    img
}
