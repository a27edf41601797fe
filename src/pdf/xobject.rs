//! Image XObject construction

use std::io::Cursor;

use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder};
use lopdf::{dictionary, Document, ObjectId, Stream};

use crate::assembler::ImageFormat;
use crate::error::{SignError, SignResult};

/// An embedded image and its pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    pub(crate) id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Add `bytes` to `doc` as an image XObject
pub fn embed(doc: &mut Document, bytes: &[u8], format: ImageFormat) -> SignResult<ImageRef> {
    match format {
        ImageFormat::Jpeg => match jpeg_header(bytes)? {
            Some(header) => Ok(embed_dct(doc, bytes, header)),
            // CMYK goes through the decoder
            None => embed_decoded(doc, bytes, image::ImageFormat::Jpeg),
        },
        ImageFormat::Png => embed_decoded(doc, bytes, image::ImageFormat::Png),
    }
}

fn embed_dct(doc: &mut Document, bytes: &[u8], header: JpegHeader) -> ImageRef {
    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => header.width as i64,
            "Height" => header.height as i64,
            "ColorSpace" => header.colorspace,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        bytes.to_vec(),
    )
    .with_compression(false);

    ImageRef {
        id: doc.add_object(stream),
        width: header.width,
        height: header.height,
    }
}

/// Decode to RGB plus an `SMask` when any pixel is not opaque
fn embed_decoded(
    doc: &mut Document,
    bytes: &[u8],
    format: image::ImageFormat,
) -> SignResult<ImageRef> {
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| SignError::UnsupportedImageFormat(e.to_string()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(SignError::UnsupportedImageFormat(
            "image has no pixels".to_string(),
        ));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in img.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if alpha.iter().any(|&a| a != u8::MAX) {
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        dict.set("SMask", smask_id);
    }

    Ok(ImageRef {
        id: doc.add_object(Stream::new(dict, rgb)),
        width,
        height,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u32,
    height: u32,
    colorspace: &'static str,
}

/// Frame size and colour model, read without decoding the scan data
///
/// `None` when the colour model has no direct PDF equivalent.
fn jpeg_header(bytes: &[u8]) -> SignResult<Option<JpegHeader>> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))
        .map_err(|e| SignError::UnsupportedImageFormat(e.to_string()))?;
    let (width, height) = decoder.dimensions();
    if width == 0 || height == 0 {
        return Err(SignError::UnsupportedImageFormat(
            "image has no pixels".to_string(),
        ));
    }

    let colorspace = match decoder.original_color_type() {
        ExtendedColorType::L8 => "DeviceGray",
        ExtendedColorType::Rgb8 => "DeviceRGB",
        _ => return Ok(None),
    };
    Ok(Some(JpegHeader {
        width,
        height,
        colorspace,
    }))
}

#[cfg(test)]
pub(crate) mod test_images {
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    pub fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    pub fn opaque_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    pub fn gray_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = image::GrayImage::from_pixel(width, height, image::Luma([90]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)
            .unwrap();
        out
    }

    pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 100, 50]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)
            .unwrap();
        out
    }
}
