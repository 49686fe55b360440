//! Error types for model-bridge.

use thiserror::Error;

/// Result type alias for model-bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while loading or running the bundled model.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Input was missing or could not be converted to a float buffer.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model artifact could not be resolved or the session could not be built.
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    /// The engine failed while executing a forward pass.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The output buffer holds fewer values than its shape declares.
    #[error("Output buffer too small. Capacity: {capacity}, Expected: {expected}")]
    OutputTooSmall { capacity: usize, expected: usize },

    /// No output tensor matched any candidate name.
    #[error("Could not find output tensor in result (tried: {})", .tried.join(", "))]
    OutputNotFound { tried: Vec<String> },

    /// The invoker was torn down and can no longer run the model.
    #[error("Model session has been shut down")]
    ShutDown,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a model load error.
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create an inference error.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable tag reported to callers across the method-call boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_ARGUMENT",
            Self::ModelLoad(_) => "MODEL_LOAD_ERROR",
            Self::Inference(_) => "INFERENCE_ERROR",
            Self::OutputTooSmall { .. } => "OUTPUT_TOO_SMALL",
            Self::OutputNotFound { .. } => "OUTPUT_NOT_FOUND",
            Self::ShutDown => "MODEL_SHUT_DOWN",
            Self::Config(_) | Self::Yaml(_) => "CONFIG_ERROR",
            Self::Json(_) => "INVALID_ARGUMENT",
            Self::Io(_) => "INFERENCE_ERROR",
        }
    }
}
