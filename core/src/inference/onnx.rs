//! ONNX Runtime implementation of the engine traits.

use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::Tensor;
use std::path::Path;
use tracing::info;

use super::engine::{InferenceEngine, ModelSession, OutputSet};
use super::tensor::{InputTensor, OutputView};
use crate::error::{BridgeError, Result};

/// Opens `.onnx` files with ONNX Runtime.
#[derive(Debug, Clone)]
pub struct OnnxEngine {
    intra_threads: usize,
}

impl OnnxEngine {
    /// Create an engine using the given number of intra-op threads.
    pub fn new(intra_threads: usize) -> Self {
        Self {
            intra_threads: intra_threads.max(1),
        }
    }
}

impl Default for OnnxEngine {
    fn default() -> Self {
        Self::new(1)
    }
}

impl InferenceEngine for OnnxEngine {
    type Session = OnnxSession;

    fn open(&self, path: &Path) -> Result<OnnxSession> {
        let load_err = |e: ort::Error| {
            BridgeError::model_load(format!(
                "Failed to create session from {}: {}",
                path.display(),
                e
            ))
        };

        let session = Session::builder()
            .map_err(load_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_err)?
            .with_intra_threads(self.intra_threads)
            .map_err(load_err)?
            .commit_from_file(path)
            .map_err(load_err)?;

        let inputs: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        let outputs: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        info!(
            path = %path.display(),
            threads = self.intra_threads,
            inputs = ?inputs,
            outputs = ?outputs,
            "ONNX session created"
        );

        Ok(OnnxSession { session })
    }
}

/// A loaded ONNX Runtime session.
pub struct OnnxSession {
    session: Session,
}

impl ModelSession for OnnxSession {
    type Outputs<'s> = OnnxOutputs<'s> where Self: 's;

    fn output_names(&self) -> Vec<String> {
        self.session.outputs.iter().map(|o| o.name.clone()).collect()
    }

    fn run(&mut self, input_name: &str, input: InputTensor) -> Result<OnnxOutputs<'_>> {
        let (shape, values) = input.into_parts();
        let tensor = Tensor::from_array((shape, values))
            .map_err(|e| BridgeError::inference(format!("Failed to create input tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input_name => tensor])
            .map_err(|e| BridgeError::inference(format!("Failed to run inference: {}", e)))?;

        Ok(OnnxOutputs { outputs })
    }
}

/// Outputs of one ONNX Runtime run.
pub struct OnnxOutputs<'s> {
    outputs: SessionOutputs<'s>,
}

impl OutputSet for OnnxOutputs<'_> {
    fn float_output(&self, name: &str) -> Option<Result<OutputView<'_>>> {
        let value = self.outputs.get(name)?;
        Some(
            value
                .try_extract_tensor::<f32>()
                .map(|(shape, data)| OutputView::new(shape, data))
                .map_err(|e| {
                    BridgeError::inference(format!("Output '{}' is not an f32 tensor: {}", name, e))
                }),
        )
    }
}
