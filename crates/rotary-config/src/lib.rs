//! Rotation configuration loading and validation (`rotation.toml`).

pub mod config;
pub mod validate;

pub use config::{RotationConfig, TargetConfig};
pub use validate::validate_config;
