//! Model inference module.
//!
//! This module defines the engine boundary, its ONNX Runtime
//! implementation, and the lazily loaded invoker built on top of them.

mod artifact;
mod engine;
mod input;
mod invoker;
mod onnx;
mod tensor;

pub use artifact::{AssetSource, DirAssets, ModelArtifact};
pub use engine::{InferenceEngine, ModelSession, OutputSet};
pub use input::InputBuffer;
pub use invoker::InferenceInvoker;
pub use onnx::{OnnxEngine, OnnxOutputs, OnnxSession};
pub use tensor::{element_count, InputTensor, OutputView, TensorData};
