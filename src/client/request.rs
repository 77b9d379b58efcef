//! The argument map sent to the upscaling model.

use crate::config::UpscaleConfig;
use crate::error::UpscalerResult;

/// The safety checker is always disabled for upscaling jobs.
pub const ENABLE_SAFETY_CHECKER: bool = false;

/// Classifier-free guidance scale used for every job.
pub const GUIDANCE_SCALE: f64 = 4.0;

/// Diffusion steps used for every job.
pub const NUM_INFERENCE_STEPS: u32 = 18;

/// One upscaling job's arguments. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleRequest {
    image_url: String,
    prompt: String,
    creativity: f64,
    resemblance: f64,
    upscale_factor: f64,
    enable_safety_checker: bool,
    guidance_scale: f64,
    num_inference_steps: u32,
}

impl UpscaleRequest {
    /// Validate `config` and freeze it together with the embedded image.
    pub fn new(image_url: String, config: &UpscaleConfig) -> UpscalerResult<Self> {
        config.validate()?;
        Ok(Self {
            image_url,
            prompt: config.prompt.clone(),
            creativity: config.creativity,
            resemblance: config.resemblance,
            upscale_factor: config.upscale_factor,
            enable_safety_checker: ENABLE_SAFETY_CHECKER,
            guidance_scale: GUIDANCE_SCALE,
            num_inference_steps: NUM_INFERENCE_STEPS,
        })
    }

    /// JSON argument map as the remote endpoint expects it.
    pub fn to_arguments(&self) -> serde_json::Value {
        serde_json::json!({
            "image_url": self.image_url,
            "prompt": self.prompt,
            "creativity": self.creativity,
            "resemblance": self.resemblance,
            "upscale_factor": self.upscale_factor,
            "enable_safety_checker": self.enable_safety_checker,
            "guidance_scale": self.guidance_scale,
            "num_inference_steps": self.num_inference_steps,
        })
    }
}
