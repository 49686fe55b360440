//! Lazily loaded model invoker.

use tracing::{debug, info, warn};

use super::artifact::{AssetSource, DirAssets, ModelArtifact};
use super::engine::{InferenceEngine, ModelSession, OutputSet};
use super::input::InputBuffer;
use super::onnx::OnnxEngine;
use super::tensor::{InputTensor, OutputView, TensorData};
use crate::config::{Config, InferenceConfig, ModelConfig};
use crate::error::{BridgeError, Result};

/// Lifecycle of the session owned by an invoker.
enum SessionState<S> {
    /// No session yet; the next call loads one.
    Unloaded,
    /// Session loaded and reused for every call.
    Ready(S),
    /// Torn down; the invoker can no longer run.
    ShutDown,
}

/// Runs the bundled model on flat input buffers.
///
/// The session is created on first use and reused afterwards. Calls take
/// `&mut self`, so concurrent callers must share the invoker behind a lock,
/// which also serializes the one-time load.
///
/// # Example
///
/// ```ignore
/// use model_bridge::{Config, InferenceInvoker, InputBuffer};
///
/// let mut invoker = InferenceInvoker::from_config(&Config::default());
/// let pixels = vec![0.0_f32; 3 * 640 * 640];
/// let detections = invoker.run_model(InputBuffer::from(pixels))?;
/// println!("{} values", detections.len());
/// ```
pub struct InferenceInvoker<E: InferenceEngine, A: AssetSource = DirAssets> {
    engine: E,
    assets: A,
    model: ModelConfig,
    inference: InferenceConfig,
    state: SessionState<E::Session>,
}

impl InferenceInvoker<OnnxEngine, DirAssets> {
    /// Build an ONNX Runtime invoker reading assets from `model.asset_root`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            OnnxEngine::new(config.inference.intra_threads),
            DirAssets::new(&config.model.asset_root),
            config,
        )
    }
}

impl<E: InferenceEngine, A: AssetSource> InferenceInvoker<E, A> {
    /// Create an unloaded invoker.
    pub fn new(engine: E, assets: A, config: &Config) -> Self {
        Self {
            engine,
            assets,
            model: config.model.clone(),
            inference: config.inference.clone(),
            state: SessionState::Unloaded,
        }
    }

    /// Whether a session is currently loaded.
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Whether the invoker has been torn down.
    pub fn is_shut_down(&self) -> bool {
        matches!(self.state, SessionState::ShutDown)
    }

    /// Inference settings in use.
    pub fn inference_config(&self) -> &InferenceConfig {
        &self.inference
    }

    /// Resolve the model artifact and create the session, once.
    ///
    /// A failed attempt leaves the invoker unloaded so a later call may
    /// retry.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ModelLoad`] if the artifact cannot be found or
    /// the session cannot be built, and [`BridgeError::ShutDown`] after
    /// [`InferenceInvoker::shutdown`].
    pub fn ensure_loaded(&mut self) -> Result<()> {
        match self.state {
            SessionState::Ready(_) => return Ok(()),
            SessionState::ShutDown => return Err(BridgeError::ShutDown),
            SessionState::Unloaded => {}
        }

        info!("Loading ONNX model...");
        let artifact = ModelArtifact::resolve(
            &self.assets,
            &self.model.cache_dir,
            &self.model.file_name,
            &self.model.asset_candidates,
        )?;

        let session = self.engine.open(artifact.path()).map_err(|e| match e {
            BridgeError::ModelLoad(_) => e,
            other => BridgeError::model_load(other.to_string()),
        })?;

        self.state = SessionState::Ready(session);
        info!(path = %artifact.path().display(), "ONNX model loaded successfully");
        Ok(())
    }

    /// Run one forward pass and return the primary output, flattened.
    pub fn run_model(&mut self, input: InputBuffer) -> Result<Vec<f32>> {
        self.run(input).map(TensorData::into_values)
    }

    /// Run one forward pass and return the primary output with its shape.
    ///
    /// The input must hold exactly as many values as the configured input
    /// shape. Input and output tensors are released before this returns,
    /// whether or not it succeeds.
    pub fn run(&mut self, input: InputBuffer) -> Result<TensorData> {
        let expected = self.inference.input_len();
        debug!(kind = input.kind(), size = input.len(), expected, "Input received");
        if input.len() != expected {
            return Err(BridgeError::invalid_input(format!(
                "Input size {} does not match expected {} for shape {:?}",
                input.len(),
                expected,
                self.inference.input_shape
            )));
        }
        let tensor = InputTensor::new(&self.inference.input_shape, input.into_f32())?;

        self.ensure_loaded()?;
        let SessionState::Ready(session) = &mut self.state else {
            return Err(BridgeError::ShutDown);
        };

        let registered = session.output_names();
        debug!("Running inference...");
        let outputs = session.run(&self.inference.input_name, tensor)?;

        let (name, view) = locate_output(&outputs, &self.inference.output_names, &registered)?;
        debug!(
            output = %name,
            shape = ?view.shape,
            capacity = view.capacity(),
            "Found output"
        );

        let data = view.to_tensor_data(&self.inference.fallback_output_shape)?;
        debug!(size = data.len(), shape = ?data.shape(), "Inference completed");
        Ok(data)
    }

    /// Release the session. The invoker cannot run afterwards.
    pub fn shutdown(&mut self) {
        if let SessionState::Ready(_) = self.state {
            info!("Releasing ONNX session");
        }
        self.state = SessionState::ShutDown;
    }
}

/// Find the primary output: configured names first, then the first output
/// the session registers.
fn locate_output<'o, O: OutputSet>(
    outputs: &'o O,
    candidates: &[String],
    registered: &[String],
) -> Result<(String, OutputView<'o>)> {
    let fallback = registered.first().filter(|name| !candidates.contains(name));

    for name in candidates.iter().chain(fallback) {
        match outputs.float_output(name) {
            Some(Ok(view)) => return Ok((name.clone(), view)),
            Some(Err(e)) => warn!(output = %name, error = %e, "Output not readable"),
            None => debug!(output = %name, "Output name not found"),
        }
    }

    Err(BridgeError::OutputNotFound {
        tried: candidates.iter().chain(fallback).cloned().collect(),
    })
}
