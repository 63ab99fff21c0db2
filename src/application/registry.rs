// SPDX-License-Identifier: MPL-2.0
//! Lazily populated, per-modality model cache.
//!
//! Each modality owns one [`OnceCell`]. The first caller for a modality runs
//! the loader while concurrent callers for the same modality block on the
//! cell; callers for other modalities never contend. A failed load leaves
//! the cell empty so the next request retries. Loaded models are never
//! evicted.

use crate::application::port::ai::SuperResolver;
use crate::domain::modality::Modality;
use crate::error::{Error, Result};
use crate::model::{self, checkpoint_path, InferenceBackend};
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Creates a model instance for a modality.
///
/// Implementations must return a model that is already in inference mode.
pub trait ModelLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns [`Error::CheckpointNotFound`] if no weights exist for the
    /// modality, or another error if they cannot be deserialized.
    fn load(&self, modality: Modality) -> Result<Arc<dyn SuperResolver>>;
}

/// Loads checkpoints from `<dir>/<modality>/SRCNN_<modality>.<ext>`.
#[derive(Debug, Clone)]
pub struct CheckpointLoader {
    dir: PathBuf,
    backend: InferenceBackend,
    intra_threads: usize,
}

impl CheckpointLoader {
    pub fn new(dir: impl Into<PathBuf>, backend: InferenceBackend) -> Self {
        Self {
            dir: dir.into(),
            backend,
            intra_threads: 0,
        }
    }

    /// Sets the ONNX Runtime intra-op thread count (`0` = runtime default).
    #[must_use]
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolved checkpoint path for a modality.
    #[must_use]
    pub fn path_for(&self, modality: Modality) -> PathBuf {
        checkpoint_path(&self.dir, modality, self.backend)
    }
}

impl ModelLoader for CheckpointLoader {
    fn load(&self, modality: Modality) -> Result<Arc<dyn SuperResolver>> {
        let path = self.path_for(modality);
        if !path.is_file() {
            return Err(Error::CheckpointNotFound { modality, path });
        }

        let model = model::load_checkpoint(&path, self.backend, self.intra_threads)?;
        let caps = model.capabilities();
        info!(
            modality = %modality,
            backend = caps.backend,
            path = %path.display(),
            checksum = caps.checksum.as_deref().unwrap_or("-"),
            "loaded super-resolution model"
        );
        Ok(model)
    }
}

/// Per-modality cache of loaded models.
pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    slots: [OnceCell<Arc<dyn SuperResolver>>; 3],
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("loaded", &self.loaded())
            .finish_non_exhaustive()
    }
}

impl ModelRegistry {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            slots: [OnceCell::new(), OnceCell::new(), OnceCell::new()],
        }
    }

    /// Registry backed by a [`CheckpointLoader`].
    pub fn from_checkpoints(dir: impl Into<PathBuf>, backend: InferenceBackend) -> Self {
        Self::new(CheckpointLoader::new(dir, backend))
    }

    fn slot(&self, modality: Modality) -> &OnceCell<Arc<dyn SuperResolver>> {
        match modality {
            Modality::Xray => &self.slots[0],
            Modality::Ct => &self.slots[1],
            Modality::Mri => &self.slots[2],
        }
    }

    /// Returns the cached model for `modality`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error; nothing is cached in that case.
    pub fn get_or_load(&self, modality: Modality) -> Result<Arc<dyn SuperResolver>> {
        self.slot(modality)
            .get_or_try_init(|| self.loader.load(modality))
            .map(Arc::clone)
    }

    /// Returns the model if it has already been loaded.
    #[must_use]
    pub fn get(&self, modality: Modality) -> Option<Arc<dyn SuperResolver>> {
        self.slot(modality).get().cloned()
    }

    /// Modalities with a cached model.
    #[must_use]
    pub fn loaded(&self) -> Vec<Modality> {
        Modality::ALL
            .into_iter()
            .filter(|m| self.slot(*m).get().is_some())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::port::ai::{ModelCapabilities, ModelResult};
    use crate::model::initial_state_dict;
    use ndarray::{Array4, ArrayView4};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct Identity;

    impl SuperResolver for Identity {
        fn enhance(&self, input: ArrayView4<'_, f32>) -> ModelResult<Array4<f32>> {
            Ok(input.to_owned())
        }

        fn capabilities(&self) -> ModelCapabilities {
            ModelCapabilities::new("identity", "test")
        }
    }

    #[derive(Clone, Default)]
    struct CountingLoader {
        calls: Arc<AtomicUsize>,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, _modality: Modality) -> Result<Arc<dyn SuperResolver>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Widen the window in which other threads arrive mid-load.
            thread::sleep(Duration::from_millis(50));
            Ok(Arc::new(Identity))
        }
    }

    struct FailingOnceLoader {
        calls: AtomicUsize,
    }

    impl ModelLoader for FailingOnceLoader {
        fn load(&self, modality: Modality) -> Result<Arc<dyn SuperResolver>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(Error::CheckpointNotFound {
                    modality,
                    path: PathBuf::from("missing"),
                });
            }
            Ok(Arc::new(Identity))
        }
    }

    #[test]
    fn concurrent_first_access_loads_once() {
        let loader = CountingLoader::default();
        let calls = Arc::clone(&loader.calls);
        let registry = Arc::new(ModelRegistry::new(loader));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.get_or_load(Modality::Mri).unwrap()
                })
            })
            .collect();
        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for model in &models[1..] {
            assert!(Arc::ptr_eq(&models[0], model));
        }
    }

    #[test]
    fn modalities_are_cached_independently() {
        let loader = CountingLoader::default();
        let calls = Arc::clone(&loader.calls);
        let registry = ModelRegistry::new(loader);

        registry.get_or_load(Modality::Xray).unwrap();
        registry.get_or_load(Modality::Ct).unwrap();
        registry.get_or_load(Modality::Xray).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.loaded(), vec![Modality::Xray, Modality::Ct]);
        assert!(registry.get(Modality::Mri).is_none());
    }

    #[test]
    fn failed_load_is_retried() {
        let registry = ModelRegistry::new(FailingOnceLoader {
            calls: AtomicUsize::new(0),
        });

        assert!(registry.get_or_load(Modality::Ct).is_err());
        assert!(registry.get(Modality::Ct).is_none());
        assert!(registry.get_or_load(Modality::Ct).is_ok());
    }

    #[test]
    fn missing_checkpoint_is_not_found() {
        let dir = tempdir().expect("failed to create temp dir");
        let registry = ModelRegistry::from_checkpoints(dir.path(), InferenceBackend::Native);

        let err = registry.get_or_load(Modality::Xray).unwrap_err();
        assert!(matches!(err, Error::CheckpointNotFound { modality: Modality::Xray, .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn checkpoint_loader_reads_native_weights() {
        let dir = tempdir().expect("failed to create temp dir");
        let loader = CheckpointLoader::new(dir.path(), InferenceBackend::Native);
        initial_state_dict(3)
            .save(&loader.path_for(Modality::Ct))
            .unwrap();
        assert!(loader
            .path_for(Modality::Ct)
            .ends_with("ct/SRCNN_ct.cbor"));

        let registry = ModelRegistry::new(loader);
        let model = registry.get_or_load(Modality::Ct).unwrap();
        assert_eq!(model.capabilities().backend, "native");
        assert!(model.capabilities().checksum.is_some());
    }
}
