//! Engine boundary consumed by the invoker.
//!
//! These traits describe exactly what the invoker needs from an inference
//! runtime: open a model file, run one input, and look up float outputs by
//! name. Every handle is released by `Drop`.

use std::path::Path;

use super::tensor::{InputTensor, OutputView};
use crate::error::Result;

/// A runtime able to open model files into sessions.
pub trait InferenceEngine {
    /// Session type produced by [`InferenceEngine::open`].
    type Session: ModelSession;

    /// Build a session bound to the model file at `path`.
    fn open(&self, path: &Path) -> Result<Self::Session>;
}

/// A loaded model capable of executing forward passes.
pub trait ModelSession {
    /// Result set of one run. Dropping it releases every output tensor.
    type Outputs<'s>: OutputSet
    where
        Self: 's;

    /// Output names in the order the model registers them.
    fn output_names(&self) -> Vec<String>;

    /// Execute one synchronous forward pass with `input` bound to `input_name`.
    fn run(&mut self, input_name: &str, input: InputTensor) -> Result<Self::Outputs<'_>>;
}

/// Outputs produced by one forward pass.
pub trait OutputSet {
    /// Look up a float output by name.
    ///
    /// Returns `None` if no output has that name, and `Some(Err(_))` if it
    /// exists but cannot be read as f32.
    fn float_output(&self, name: &str) -> Option<Result<OutputView<'_>>>;
}
