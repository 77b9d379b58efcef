// SPDX-License-Identifier: MIT
//! # Data-URI Embedding
//!
//! Hosted inference APIs accept images inline as `data:` URIs, which avoids a
//! separate upload step. The format is `data:<mime>;base64,<payload>` with the
//! standard, padded base64 alphabet.

use base64::{Engine as _, engine::general_purpose};
use image::DynamicImage;

use crate::error::{CodecError, CodecResult};
use crate::raster::{decode_from_bytes, encode_to_bytes};

/// MIME type of every payload produced by [`encode_to_embeddable`].
pub const PNG_MIME: &str = "image/png";

/// Scheme marker that prefixes every PNG payload.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Encode a bitmap as a PNG `data:` URI usable directly as an image reference.
pub fn encode_to_embeddable(image: &DynamicImage) -> CodecResult<String> {
    let bytes = encode_to_bytes(image)?;
    Ok(embed_bytes(PNG_MIME, &bytes))
}

/// Wrap already-encoded bytes in a `data:` URI.
pub fn embed_bytes(mime: &str, bytes: &[u8]) -> String {
    let encoded = general_purpose::STANDARD.encode(bytes);
    let mut uri = String::with_capacity(mime.len() + encoded.len() + 13);
    uri.push_str("data:");
    uri.push_str(mime);
    uri.push_str(";base64,");
    uri.push_str(&encoded);
    uri
}

/// Cheap check for the `data:` scheme.
pub fn is_embedded(reference: &str) -> bool {
    reference
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Split a base64 `data:` URI into its MIME type and decoded bytes.
pub fn decode_embeddable(uri: &str) -> CodecResult<(String, Vec<u8>)> {
    if !is_embedded(uri) {
        return Err(CodecError::embedding("missing 'data:' scheme"));
    }
    let (header, payload) = uri[5..]
        .split_once(',')
        .ok_or_else(|| CodecError::embedding("missing ',' between header and payload"))?;

    let mime = header
        .rsplit_once(';')
        .filter(|(_, encoding)| encoding.eq_ignore_ascii_case("base64"))
        .map(|(mime, _)| mime)
        .ok_or_else(|| CodecError::embedding("only base64 payloads are supported"))?;

    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| CodecError::embedding(format!("invalid base64: {}", e)))?;

    Ok((mime.to_string(), bytes))
}

/// Decode a `data:` URI straight to a bitmap.
pub fn decode_embeddable_image(uri: &str) -> CodecResult<DynamicImage> {
    let (_, bytes) = decode_embeddable(uri)?;
    decode_from_bytes(&bytes)
}
