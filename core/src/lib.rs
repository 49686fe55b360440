//! model-bridge: run a bundled ONNX model behind a method-call boundary.
//!
//! The crate loads a model file shipped in a read-only asset bundle into
//! ONNX Runtime on first use, runs one forward pass per call on a fixed-shape
//! input, and returns the primary output as a flat list of floats.
//!
//! # Example
//!
//! ```ignore
//! use model_bridge::{Config, MethodCall, MethodChannel, MethodResponse};
//! use serde_json::json;
//!
//! let mut channel = MethodChannel::from_config(&Config::default());
//! let pixels = vec![0.0; 3 * 640 * 640];
//! let call = MethodCall::new("runModel").with_argument("input", json!(pixels));
//!
//! match channel.handle(&call) {
//!     MethodResponse::Success { result } => println!("{} values", result.len()),
//!     other => eprintln!("{:?}", other),
//! }
//! channel.shutdown();
//! ```
//!
//! # Building
//!
//! ONNX Runtime binaries are fetched by the `ort` crate at build time.
//!
//! ```bash
//! cargo build --release
//! ```

pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;

// Re-export commonly used types
pub use channel::{MethodCall, MethodChannel, MethodResponse};
pub use config::Config;
pub use error::{BridgeError, Result};
pub use inference::{InferenceInvoker, InputBuffer, OnnxEngine, TensorData};
