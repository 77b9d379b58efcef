// SPDX-License-Identifier: MIT
//! Error type for encoding and decoding image payloads.

use std::{error::Error as StdError, fmt};

/// Errors produced by the codec.
#[derive(Debug)]
pub enum CodecError {
    /// The bitmap could not be serialized to the requested raster format
    Encode {
        format: &'static str,
        source: image::ImageError,
    },
    /// The bytes are not a valid raster image
    Decode {
        reason: String,
        source: Option<image::ImageError>,
    },
    /// The string is not a well-formed base64 `data:` URI
    Embedding { reason: String },
}

impl CodecError {
    /// Create a decode error without an underlying image error
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
            source: None,
        }
    }

    /// Create an embedding error
    pub fn embedding(reason: impl Into<String>) -> Self {
        Self::Embedding {
            reason: reason.into(),
        }
    }

    /// Whether the failure happened while reading input rather than writing output
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Embedding { .. })
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Encode { format, source } => {
                write!(f, "Failed to encode image as {}: {}", format, source)
            }
            CodecError::Decode { reason, .. } => write!(f, "Failed to decode image: {}", reason),
            CodecError::Embedding { reason } => write!(f, "Malformed data URI: {}", reason),
        }
    }
}

impl StdError for CodecError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Encode { source, .. } => Some(source),
            Self::Decode {
                source: Some(source),
                ..
            } => Some(source),
            _ => None,
        }
    }
}

/// Result alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
