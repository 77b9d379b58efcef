// SPDX-License-Identifier: MIT
//! # Raster Encoding and Decoding
//!
//! PNG is the only output format: it is lossless, so a bitmap survives the
//! trip to the inference service and back pixel for pixel. Decoding accepts
//! anything the `image` crate can sniff, while uploads are restricted to PNG
//! and JPEG by [`is_supported_upload`].

use std::borrow::Cow;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::error::{CodecError, CodecResult};

/// Serialize a bitmap to PNG bytes in memory.
///
/// Float bitmaps are stored as 16-bit PNG, the widest depth PNG supports.
pub fn encode_to_bytes(image: &DynamicImage) -> CodecResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    png_compatible(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|source| CodecError::Encode {
            format: "png",
            source,
        })?;
    Ok(buffer.into_inner())
}

/// PNG has no float colour types.
fn png_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image {
        DynamicImage::ImageRgba32F(_) => Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16())),
        DynamicImage::ImageRgb32F(_) => Cow::Owned(DynamicImage::ImageRgb16(image.to_rgb16())),
        _ => Cow::Borrowed(image),
    }
}

/// Decode raster bytes into a bitmap.
///
/// Fails with [`CodecError::Decode`] for empty input or bytes that are not a
/// recognizable, well-formed image.
pub fn decode_from_bytes(bytes: &[u8]) -> CodecResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(CodecError::decode("input is empty"));
    }
    image::load_from_memory(bytes).map_err(|source| CodecError::Decode {
        reason: source.to_string(),
        source: Some(source),
    })
}

/// Guess the raster format from the leading magic bytes.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Returns true for the upload formats the file picker accepts (PNG, JPEG).
pub fn is_supported_upload(bytes: &[u8]) -> bool {
    matches!(
        sniff_format(bytes),
        Some(ImageFormat::Png | ImageFormat::Jpeg)
    )
}
