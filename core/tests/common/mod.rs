//! Scripted engine and scratch directories shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use model_bridge::inference::{
    AssetSource, DirAssets, InferenceEngine, InputTensor, ModelSession, OutputSet, OutputView,
};
use model_bridge::{BridgeError, Config, Result};

static NEXT_SCRATCH: AtomicUsize = AtomicUsize::new(0);

/// Temporary directory removed on drop.
pub struct Scratch {
    root: PathBuf,
}

impl Scratch {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!(
            "model-bridge-test-{}-{}",
            std::process::id(),
            NEXT_SCRATCH.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).expect("create scratch dir");
        Self { root }
    }

    pub fn bundle(&self) -> PathBuf {
        self.root.join("bundle")
    }

    pub fn cache(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Place a model file in the bundle at `relative`.
    pub fn add_asset(&self, relative: &str) {
        let path = self.bundle().join(relative);
        fs::create_dir_all(path.parent().expect("asset parent")).expect("create bundle dir");
        fs::write(path, b"fake onnx bytes").expect("write asset");
    }

    /// Default config pointed at this scratch directory, with a small input.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.model.cache_dir = self.cache();
        config.model.asset_root = self.bundle();
        config.inference.input_shape = vec![1, 3, 4, 4];
        config
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// Asset bundle that counts how often it is opened.
pub struct CountingAssets {
    inner: DirAssets,
    pub opens: Arc<AtomicUsize>,
}

impl CountingAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: DirAssets::new(root),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl AssetSource for CountingAssets {
    fn open(&self, relative: &str) -> io::Result<Box<dyn Read + '_>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(relative)
    }
}

/// A canned output tensor.
#[derive(Debug, Clone)]
pub struct CannedOutput {
    pub name: String,
    pub shape: Option<Vec<i64>>,
    pub data: Vec<f32>,
    /// Present in the result set but not readable as f32.
    pub unreadable: bool,
}

impl CannedOutput {
    pub fn new(name: &str, shape: &[i64], data: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            shape: Some(shape.to_vec()),
            data,
            unreadable: false,
        }
    }

    pub fn without_shape(name: &str, data: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            shape: None,
            data,
            unreadable: false,
        }
    }

    /// An output holding non-float data, e.g. int64 class ids.
    pub fn unreadable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shape: Some(vec![1, 300]),
            data: Vec::new(),
            unreadable: true,
        }
    }
}

/// Counters observed by the tests.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub sessions_opened: Arc<AtomicUsize>,
    pub runs: Arc<AtomicUsize>,
    pub live_tensors: Arc<AtomicUsize>,
    pub last_input: Arc<Mutex<Option<(String, Vec<usize>, Vec<f32>)>>>,
}

impl Counters {
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn live_tensors(&self) -> usize {
        self.live_tensors.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<(String, Vec<usize>, Vec<f32>)> {
        self.last_input.lock().expect("counters lock").clone()
    }
}

/// Engine that replays canned outputs.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    pub counters: Counters,
    pub outputs: Vec<CannedOutput>,
    /// Output names the session registers; defaults to the canned names.
    pub registered: Option<Vec<String>>,
    pub fail_open: bool,
    pub fail_run: bool,
}

impl ScriptedEngine {
    pub fn with_outputs(outputs: Vec<CannedOutput>) -> Self {
        Self {
            outputs,
            ..Self::default()
        }
    }
}

impl InferenceEngine for ScriptedEngine {
    type Session = ScriptedSession;

    fn open(&self, path: &Path) -> Result<ScriptedSession> {
        if self.fail_open {
            return Err(BridgeError::model_load("scripted open failure"));
        }
        if !path.is_file() {
            return Err(BridgeError::model_load(format!(
                "no model at {}",
                path.display()
            )));
        }
        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        let registered = self
            .registered
            .clone()
            .unwrap_or_else(|| self.outputs.iter().map(|o| o.name.clone()).collect());
        Ok(ScriptedSession {
            counters: self.counters.clone(),
            outputs: self.outputs.clone(),
            registered,
            fail_run: self.fail_run,
        })
    }
}

pub struct ScriptedSession {
    counters: Counters,
    outputs: Vec<CannedOutput>,
    registered: Vec<String>,
    fail_run: bool,
}

impl ModelSession for ScriptedSession {
    type Outputs<'s> = ScriptedOutputs where Self: 's;

    fn output_names(&self) -> Vec<String> {
        self.registered.clone()
    }

    fn run(&mut self, input_name: &str, input: InputTensor) -> Result<ScriptedOutputs> {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        let shape = input.shape().to_vec();
        let (_, values) = input.into_parts();
        *self.counters.last_input.lock().expect("counters lock") =
            Some((input_name.to_string(), shape, values));

        if self.fail_run {
            return Err(BridgeError::inference("scripted run failure"));
        }

        self.counters
            .live_tensors
            .fetch_add(self.outputs.len(), Ordering::SeqCst);
        Ok(ScriptedOutputs {
            counters: self.counters.clone(),
            outputs: self.outputs.clone(),
        })
    }
}

pub struct ScriptedOutputs {
    counters: Counters,
    outputs: Vec<CannedOutput>,
}

impl OutputSet for ScriptedOutputs {
    fn float_output(&self, name: &str) -> Option<Result<OutputView<'_>>> {
        let output = self.outputs.iter().find(|o| o.name == name)?;
        if output.unreadable {
            return Some(Err(BridgeError::inference(format!(
                "Output '{}' is not an f32 tensor",
                name
            ))));
        }
        Some(Ok(match &output.shape {
            Some(shape) => OutputView::new(shape, &output.data),
            None => OutputView::without_shape(&output.data),
        }))
    }
}

impl Drop for ScriptedOutputs {
    fn drop(&mut self) {
        self.counters
            .live_tensors
            .fetch_sub(self.outputs.len(), Ordering::SeqCst);
    }
}

/// Row-major detections of shape (1, 300, 6).
pub fn detections() -> Vec<f32> {
    (0..1800).map(|i| i as f32 * 0.25).collect()
}
