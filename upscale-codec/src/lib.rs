// SPDX-License-Identifier: MIT
//! # upscale-codec: Image Payload Encoding for Remote Upscaling
//!
//! This crate turns in-memory bitmaps into the payloads a hosted inference API
//! accepts, and turns the bytes it sends back into bitmaps again.
//!
//! ## Key Components
//!
//! - [`raster`]: lossless PNG encoding, raster decoding and upload format sniffing
//! - [`embed`]: `data:` URI embedding (`data:image/png;base64,...`) and its inverse
//! - [`error`]: the [`CodecError`] type shared by both
//!
//! ## Usage Example
//!
//! ```rust
//! use image::{DynamicImage, RgbaImage};
//! use upscale_codec::{decode_embeddable_image, encode_to_embeddable, PNG_DATA_URI_PREFIX};
//!
//! let bitmap = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
//! let uri = encode_to_embeddable(&bitmap)?;
//! assert!(uri.starts_with(PNG_DATA_URI_PREFIX));
//!
//! let back = decode_embeddable_image(&uri)?;
//! assert_eq!(back.to_rgba8(), bitmap.to_rgba8());
//! # Ok::<(), upscale_codec::CodecError>(())
//! ```
//!
//! No size limit is enforced here. A remote service may reject oversized
//! payloads; that surfaces as an error in the caller.

pub mod embed;
pub mod error;
pub mod raster;

pub use embed::{
    PNG_DATA_URI_PREFIX, PNG_MIME, decode_embeddable, decode_embeddable_image, embed_bytes,
    encode_to_embeddable, is_embedded,
};
pub use error::{CodecError, CodecResult};
pub use raster::{decode_from_bytes, encode_to_bytes, is_supported_upload, sniff_format};
