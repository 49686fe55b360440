//! Method-call boundary in front of the invoker.
//!
//! Calls arrive untyped: a method name plus a map of named arguments. Every
//! failure is turned into an error response here; nothing propagates past
//! [`MethodChannel::handle`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::config::{ChannelConfig, Config};
use crate::error::BridgeError;
use crate::inference::{
    AssetSource, DirAssets, InferenceEngine, InferenceInvoker, InputBuffer, OnnxEngine,
};

/// One inbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Method name.
    pub method: String,
    /// Named arguments.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl MethodCall {
    /// Create a call with no arguments.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Map::new(),
        }
    }

    /// Add a named argument.
    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Look up a named argument.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }
}

/// Reply to one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    /// The method ran and produced a flat float result.
    Success { result: Vec<f32> },
    /// The method failed.
    Error { code: String, message: String },
    /// No handler for the method name.
    NotImplemented,
}

impl MethodResponse {
    /// Build an error response from a bridge error.
    pub fn from_error(err: &BridgeError) -> Self {
        Self::Error {
            code: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Dispatches method calls to an owned invoker.
pub struct MethodChannel<E: InferenceEngine, A: AssetSource = DirAssets> {
    config: ChannelConfig,
    invoker: InferenceInvoker<E, A>,
}

impl MethodChannel<OnnxEngine, DirAssets> {
    /// Build a channel backed by ONNX Runtime.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.channel.clone(), InferenceInvoker::from_config(config))
    }
}

impl<E: InferenceEngine, A: AssetSource> MethodChannel<E, A> {
    /// Create a channel around an invoker.
    pub fn new(config: ChannelConfig, invoker: InferenceInvoker<E, A>) -> Self {
        Self { config, invoker }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Borrow the invoker.
    pub fn invoker(&self) -> &InferenceInvoker<E, A> {
        &self.invoker
    }

    /// Handle one call.
    pub fn handle(&mut self, call: &MethodCall) -> MethodResponse {
        if call.method != self.config.method {
            warn!(method = %call.method, "Unknown method");
            return MethodResponse::NotImplemented;
        }

        debug!(method = %call.method, "Method called");
        match self.run_model(call) {
            Ok(result) => {
                debug!(size = result.len(), "Method succeeded");
                MethodResponse::Success { result }
            }
            Err(e) => {
                error!(method = %call.method, kind = e.kind(), error = %e, "Method failed");
                MethodResponse::from_error(&e)
            }
        }
    }

    /// Tear down the invoker's session.
    pub fn shutdown(&mut self) {
        self.invoker.shutdown();
    }

    fn run_model(&mut self, call: &MethodCall) -> crate::Result<Vec<f32>> {
        let arg = &self.config.input_argument;
        let value = call.argument(arg).ok_or_else(|| {
            BridgeError::invalid_input(format!("Missing argument '{}'", arg))
        })?;
        let input = InputBuffer::from_json(value)?;
        self.invoker.run_model(input)
    }
}
