//! Configuration types for model-bridge.

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{BridgeError, Result};
use crate::inference::element_count;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Model artifact configuration.
    #[serde(default)]
    pub model: ModelConfig,

    /// Inference configuration.
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Method-call boundary configuration.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the model artifact comes from and where it is cached.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Filename of the cached artifact.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Writable directory the artifact is copied into.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Root of the read-only asset bundle.
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,

    /// Relative asset paths searched in order; first hit wins.
    #[serde(default = "default_asset_candidates")]
    pub asset_candidates: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            cache_dir: default_cache_dir(),
            asset_root: default_asset_root(),
            asset_candidates: default_asset_candidates(),
        }
    }
}

impl ModelConfig {
    /// Full path of the cached artifact.
    pub fn cached_path(&self) -> PathBuf {
        self.cache_dir.join(&self.file_name)
    }
}

/// Tensor names and shapes used for one forward pass.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Name the input tensor is bound under.
    #[serde(default = "default_input_name")]
    pub input_name: String,

    /// Fixed input shape (B, C, H, W).
    #[serde(default = "default_input_shape")]
    pub input_shape: Vec<usize>,

    /// Output names tried in order before falling back to the first output.
    #[serde(default = "default_output_names")]
    pub output_names: Vec<String>,

    /// Output shape assumed when the engine reports none.
    #[serde(default = "default_fallback_output_shape")]
    pub fallback_output_shape: Vec<usize>,

    /// Intra-op threads for the engine.
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            input_name: default_input_name(),
            input_shape: default_input_shape(),
            output_names: default_output_names(),
            fallback_output_shape: default_fallback_output_shape(),
            intra_threads: default_intra_threads(),
        }
    }
}

impl InferenceConfig {
    /// Number of floats the input must contain.
    ///
    /// Saturates at `usize::MAX` for shapes `validate` would reject, so no
    /// real buffer can match them.
    pub fn input_len(&self) -> usize {
        element_count(&self.input_shape).unwrap_or(usize::MAX)
    }

    /// Number of floats read when the output shape is unknown.
    pub fn fallback_output_len(&self) -> usize {
        element_count(&self.fallback_output_shape).unwrap_or(usize::MAX)
    }
}

/// Method-call boundary names.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Channel name the host registers the handler under.
    #[serde(default = "default_channel_name")]
    pub name: String,

    /// Method that runs the model.
    #[serde(default = "default_method")]
    pub method: String,

    /// Argument carrying the input buffer.
    #[serde(default = "default_input_argument")]
    pub input_argument: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: default_channel_name(),
            method: default_method(),
            input_argument: default_input_argument(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Maximum level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_file_name() -> String {
    "best.onnx".to_string()
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("model-bridge")
}

fn default_asset_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_asset_candidates() -> Vec<String> {
    vec![
        "flutter_assets/assets/best.onnx".to_string(),
        "assets/best.onnx".to_string(),
        "best.onnx".to_string(),
    ]
}

fn default_input_name() -> String {
    "images".to_string()
}

fn default_input_shape() -> Vec<usize> {
    vec![1, 3, 640, 640]
}

fn default_output_names() -> Vec<String> {
    vec![
        "output0".to_string(),
        "output".to_string(),
        "output_0".to_string(),
    ]
}

fn default_fallback_output_shape() -> Vec<usize> {
    vec![1, 300, 6]
}

fn default_intra_threads() -> usize {
    1
}

fn default_channel_name() -> String {
    "poultech/onnx".to_string()
}

fn default_method() -> String {
    "runModel".to_string()
}

fn default_input_argument() -> String {
    "input".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that could never produce a working session.
    pub fn validate(&self) -> Result<()> {
        if self.model.file_name.trim().is_empty() {
            return Err(BridgeError::config("model.file_name must not be empty"));
        }
        if self.model.asset_candidates.is_empty() {
            return Err(BridgeError::config(
                "model.asset_candidates must list at least one path",
            ));
        }
        if self.inference.input_shape.is_empty() || self.inference.input_shape.contains(&0) {
            return Err(BridgeError::config(format!(
                "inference.input_shape must be non-empty with no zero dimension, got {:?}",
                self.inference.input_shape
            )));
        }
        if element_count(&self.inference.input_shape).is_none() {
            return Err(BridgeError::config(format!(
                "inference.input_shape {:?} has too many elements",
                self.inference.input_shape
            )));
        }
        if self.inference.fallback_output_shape.is_empty() {
            return Err(BridgeError::config(
                "inference.fallback_output_shape must not be empty",
            ));
        }
        if element_count(&self.inference.fallback_output_shape).is_none() {
            return Err(BridgeError::config(format!(
                "inference.fallback_output_shape {:?} has too many elements",
                self.inference.fallback_output_shape
            )));
        }
        if self.inference.intra_threads == 0 {
            return Err(BridgeError::config("inference.intra_threads must be >= 1"));
        }
        Ok(())
    }
}
