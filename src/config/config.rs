//! # Upscaling Parameters
//!
//! The tunable knobs of a single upscale action. They are the values a user
//! sets before pressing "upscale", validated here and then frozen into an
//! [`UpscaleRequest`](crate::client::UpscaleRequest).
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Default | Description |
//! |-----------|------|-------|---------|-------------|
//! | `prompt` | `String` | any | `masterpiece, best quality, highres` | Text guidance for the model |
//! | `creativity` | `f64` | 0.0-1.0 | 0.35 | How far the model may deviate from the source |
//! | `resemblance` | `f64` | 0.0-1.0 | 0.6 | How strongly the output must match the source structure |
//! | `upscale_factor` | `f64` | 1.0-4.0 | 2.0 | Output size multiplier |
//!
//! ## Examples
//!
//! ```rust
//! use image_upscaler::config::UpscaleConfig;
//!
//! let config = UpscaleConfig::default();
//! assert!(config.validate().is_ok());
//!
//! let config = UpscaleConfig::new("sharp photo".to_string(), 0.2, 0.8, 4.0);
//! assert!(config.validate().is_ok());
//! ```

use std::ops::RangeInclusive;

use crate::error::{UpscalerError, UpscalerResult};

/// Default text prompt sent alongside the image.
pub const DEFAULT_PROMPT: &str = "masterpiece, best quality, highres";

/// Allowed range for `creativity` and `resemblance`.
pub const UNIT_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Allowed range for `upscale_factor`.
pub const FACTOR_RANGE: RangeInclusive<f64> = 1.0..=4.0;

/// Tunable parameters for one upscale action.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleConfig {
    /// Text prompt guiding the diffusion-based upscaler.
    pub prompt: String,

    /// Freedom given to the model to invent detail, in `[0, 1]`.
    pub creativity: f64,

    /// Faithfulness to the source image, in `[0, 1]`.
    pub resemblance: f64,

    /// Output size multiplier, in `[1, 4]`.
    pub upscale_factor: f64,
}

impl Default for UpscaleConfig {
    /// Defaults match the slider positions users start from:
    /// creativity 0.35, resemblance 0.6, factor 2.0.
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            creativity: 0.35,
            resemblance: 0.6,
            upscale_factor: 2.0,
        }
    }
}

impl UpscaleConfig {
    /// Creates a new parameter set.
    pub fn new(prompt: String, creativity: f64, resemblance: f64, upscale_factor: f64) -> Self {
        Self {
            prompt,
            creativity,
            resemblance,
            upscale_factor,
        }
    }

    /// Validates every parameter against its range.
    ///
    /// NaN fails every range check, so it is rejected as well.
    pub fn validate(&self) -> UpscalerResult<()> {
        check_range("creativity", self.creativity, &UNIT_RANGE)?;
        check_range("resemblance", self.resemblance, &UNIT_RANGE)?;
        check_range("upscale_factor", self.upscale_factor, &FACTOR_RANGE)?;
        Ok(())
    }
}

fn check_range(field: &str, value: f64, range: &RangeInclusive<f64>) -> UpscalerResult<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(UpscalerError::validation(
            field,
            format!("must be between {} and {}", range.start(), range.end()),
            value.to_string(),
        ))
    }
}
