//! # Configuration Module
//!
//! Upscaling parameters and per-session settings (credentials, endpoint,
//! polling, output path).

pub mod config;
pub mod session;

pub use config::UpscaleConfig;
pub use session::{Credentials, Endpoint, SessionConfig};
