//! Model artifact resolution.
//!
//! The model ships inside a read-only asset bundle. Before a session can be
//! created it is copied once into a writable cache directory, and the cached
//! copy is reused for the lifetime of the installation.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};

/// Read-only bundle the model artifact is copied from.
pub trait AssetSource {
    /// Open the asset at `relative` for reading.
    fn open(&self, relative: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// Asset bundle backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    /// Create a bundle rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the bundle.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirAssets {
    fn open(&self, relative: &str) -> io::Result<Box<dyn Read + '_>> {
        let path = self.root.join(relative);
        if !fs::metadata(&path)?.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }
        Ok(Box::new(File::open(path)?))
    }
}

/// The model file in the writable cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    path: PathBuf,
}

impl ModelArtifact {
    /// Locate the cached artifact, copying it out of `assets` if needed.
    ///
    /// An existing non-empty file at `cache_dir/file_name` is reused as is.
    /// Otherwise `candidates` are tried in order and the first one that opens
    /// and copies completely is used. A failed copy leaves no file behind and
    /// moves on to the next candidate.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ModelLoad`] if no candidate can be copied.
    pub fn resolve(
        assets: &dyn AssetSource,
        cache_dir: &Path,
        file_name: &str,
        candidates: &[String],
    ) -> Result<Self> {
        let path = cache_dir.join(file_name);
        debug!(path = %path.display(), "Model file path");

        if is_non_empty_file(&path) {
            debug!("Model file already exists, using cached version");
            return Ok(Self { path });
        }

        fs::create_dir_all(cache_dir).map_err(|e| {
            BridgeError::model_load(format!(
                "Failed to create cache directory {}: {}",
                cache_dir.display(),
                e
            ))
        })?;

        for candidate in candidates {
            debug!(asset = %candidate, "Trying asset path");
            let mut reader = match assets.open(candidate) {
                Ok(reader) => reader,
                Err(e) => {
                    debug!(asset = %candidate, error = %e, "Asset not available");
                    continue;
                }
            };

            let bytes = match copy_atomically(&mut reader, &path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(asset = %candidate, path = %path.display(), error = %e, "Failed to copy asset");
                    continue;
                }
            };
            info!(asset = %candidate, bytes, path = %path.display(), "Copied model from assets");
            return Ok(Self { path });
        }

        Err(BridgeError::model_load(format!(
            "Model file not found in any asset path. Tried: {}",
            candidates.join(", ")
        )))
    }

    /// Path of the cached model file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Copy into a sibling `.part` file and rename it over `dest` once complete.
fn copy_atomically(reader: &mut dyn Read, dest: &Path) -> io::Result<u64> {
    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let result = File::create(&part).and_then(|mut out| {
        let bytes = io::copy(reader, &mut out)?;
        out.sync_all()?;
        Ok(bytes)
    });

    match result {
        Ok(bytes) => {
            fs::rename(&part, dest)?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&part);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT: AtomicUsize = AtomicUsize::new(0);

    struct Scratch(PathBuf);

    impl Scratch {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!(
                "model-bridge-artifact-{}-{}",
                std::process::id(),
                NEXT.fetch_add(1, Ordering::Relaxed)
            ));
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn candidates() -> Vec<String> {
        vec![
            "flutter_assets/assets/best.onnx".into(),
            "assets/best.onnx".into(),
            "best.onnx".into(),
        ]
    }

    #[test]
    fn test_copies_first_available_candidate() {
        let scratch = Scratch::new();
        let bundle = scratch.0.join("bundle");
        fs::create_dir_all(bundle.join("assets")).unwrap();
        fs::write(bundle.join("assets/best.onnx"), b"second").unwrap();
        fs::write(bundle.join("best.onnx"), b"third").unwrap();

        let cache = scratch.0.join("cache");
        let artifact =
            ModelArtifact::resolve(&DirAssets::new(&bundle), &cache, "best.onnx", &candidates())
                .unwrap();

        assert_eq!(artifact.path(), cache.join("best.onnx"));
        assert_eq!(fs::read(artifact.path()).unwrap(), b"second");
        assert!(!cache.join("best.onnx.part").exists());
    }

    #[test]
    fn test_reuses_cached_file() {
        let scratch = Scratch::new();
        let cache = scratch.0.join("cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("best.onnx"), b"cached").unwrap();

        let empty_bundle = DirAssets::new(scratch.0.join("missing"));
        let artifact =
            ModelArtifact::resolve(&empty_bundle, &cache, "best.onnx", &candidates()).unwrap();
        assert_eq!(fs::read(artifact.path()).unwrap(), b"cached");
    }

    #[test]
    fn test_empty_cached_file_is_recopied() {
        let scratch = Scratch::new();
        let bundle = scratch.0.join("bundle");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("best.onnx"), b"fresh").unwrap();

        let cache = scratch.0.join("cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("best.onnx"), b"").unwrap();

        let artifact =
            ModelArtifact::resolve(&DirAssets::new(&bundle), &cache, "best.onnx", &candidates())
                .unwrap();
        assert_eq!(fs::read(artifact.path()).unwrap(), b"fresh");
    }

    #[test]
    fn test_missing_everywhere() {
        let scratch = Scratch::new();
        let err = ModelArtifact::resolve(
            &DirAssets::new(scratch.0.join("bundle")),
            &scratch.0.join("cache"),
            "best.onnx",
            &candidates(),
        )
        .unwrap_err();

        assert!(matches!(err, BridgeError::ModelLoad(_)));
        let msg = err.to_string();
        assert!(msg.contains("flutter_assets/assets/best.onnx"));
        assert!(msg.contains("assets/best.onnx"));
        assert!(!scratch.0.join("cache/best.onnx").exists());
    }

    #[test]
    fn test_directory_candidate_is_skipped() {
        let scratch = Scratch::new();
        let bundle = scratch.0.join("bundle");
        fs::create_dir_all(bundle.join("flutter_assets/assets/best.onnx")).unwrap();
        fs::create_dir_all(bundle.join("assets")).unwrap();
        fs::write(bundle.join("assets/best.onnx"), b"model").unwrap();

        let cache = scratch.0.join("cache");
        let artifact =
            ModelArtifact::resolve(&DirAssets::new(&bundle), &cache, "best.onnx", &candidates())
                .unwrap();
        assert_eq!(fs::read(artifact.path()).unwrap(), b"model");
    }

    /// Yields a few bytes, then fails.
    struct BrokenReader {
        sent: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated asset"));
            }
            self.sent = true;
            let chunk = b"partial";
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    /// Serves a truncated stream for `broken`, everything else from disk.
    struct FlakyAssets {
        broken: Vec<&'static str>,
        inner: DirAssets,
    }

    impl AssetSource for FlakyAssets {
        fn open(&self, relative: &str) -> io::Result<Box<dyn Read + '_>> {
            if self.broken.iter().any(|b| *b == relative) {
                return Ok(Box::new(BrokenReader { sent: false }));
            }
            self.inner.open(relative)
        }
    }

    #[test]
    fn test_interrupted_copy_leaves_nothing_behind() {
        let scratch = Scratch::new();
        let cache = scratch.0.join("cache");
        let assets = FlakyAssets {
            broken: vec!["flutter_assets/assets/best.onnx", "assets/best.onnx"],
            inner: DirAssets::new(scratch.0.join("bundle")),
        };

        let err = ModelArtifact::resolve(&assets, &cache, "best.onnx", &candidates()).unwrap_err();
        assert!(matches!(err, BridgeError::ModelLoad(_)));
        assert!(!cache.join("best.onnx").exists());
        assert!(!cache.join("best.onnx.part").exists());
    }

    #[test]
    fn test_interrupted_copy_moves_to_next_candidate() {
        let scratch = Scratch::new();
        let bundle = scratch.0.join("bundle");
        fs::create_dir_all(bundle.join("assets")).unwrap();
        fs::write(bundle.join("assets/best.onnx"), b"complete").unwrap();

        let cache = scratch.0.join("cache");
        let assets = FlakyAssets {
            broken: vec!["flutter_assets/assets/best.onnx"],
            inner: DirAssets::new(&bundle),
        };

        let artifact = ModelArtifact::resolve(&assets, &cache, "best.onnx", &candidates()).unwrap();
        assert_eq!(fs::read(artifact.path()).unwrap(), b"complete");
        assert!(!cache.join("best.onnx.part").exists());
    }
}
