//! Genre classifier abstraction and the shared model handle.
//!
//! - **[`GenreClassifier`]** — one text in, one [`Prediction`] out. Label
//!   strings are returned directly; callers never see class indices.
//! - **[`LazyClassifier`]** — a thread-safe handle that loads an expensive
//!   classifier at most once and shares it between requests.
//! - **`TractClassifier`** — the local ONNX model (feature `local-model-tract`).
//!
//! Use [`shared_classifier`] to build the handle for the configured model.

#[cfg(feature = "local-model-tract")]
mod local_tract;

#[cfg(feature = "local-model-tract")]
pub use local_tract::TractClassifier;

use std::sync::{Arc, Mutex, RwLock};

use tracing::info;

use crate::config::ModelConfig;

/// Output of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// The highest-scoring label.
    pub label: String,
    /// One score per label, in the model's label order.
    pub scores: Vec<(String, f32)>,
}

/// Failures of the classification resource.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    #[error("classification model unavailable: {0}")]
    Unavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// A text-genre classifier.
///
/// Implementations are called from blocking worker threads and must be
/// shareable across them.
pub trait GenreClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Prediction, ClassifierError>;

    /// Whether the underlying model is resident in memory.
    fn is_loaded(&self) -> bool {
        true
    }
}

impl<C: GenreClassifier + ?Sized> GenreClassifier for Arc<C> {
    fn classify(&self, text: &str) -> Result<Prediction, ClassifierError> {
        (**self).classify(text)
    }

    fn is_loaded(&self) -> bool {
        (**self).is_loaded()
    }
}

type Loader<C> = Box<dyn Fn() -> Result<C, ClassifierError> + Send + Sync>;

/// Loads a classifier on first use and keeps it until [`release`](Self::release).
///
/// Concurrent first callers wait for a single load. A failed load is not
/// cached: the next call tries again. [`is_loaded`](GenreClassifier::is_loaded)
/// never waits on a load in progress.
pub struct LazyClassifier<C> {
    loader: Loader<C>,
    /// Serializes loads. Held for the whole load.
    loading: Mutex<()>,
    /// Only ever locked briefly.
    slot: RwLock<Option<Arc<C>>>,
}

impl<C: GenreClassifier> LazyClassifier<C> {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<C, ClassifierError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            loading: Mutex::new(()),
            slot: RwLock::new(None),
        }
    }

    // The slot only ever holds a fully loaded model, so a poisoned lock is still consistent.
    fn loaded(&self) -> Option<Arc<C>> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn store(&self, model: Option<Arc<C>>) -> Option<Arc<C>> {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *slot, model)
    }

    /// Return the loaded classifier, loading it if needed.
    pub fn acquire(&self) -> Result<Arc<C>, ClassifierError> {
        if let Some(model) = self.loaded() {
            return Ok(model);
        }
        let _loading = self.loading.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have finished loading while we waited.
        if let Some(model) = self.loaded() {
            return Ok(model);
        }
        let model = Arc::new((self.loader)()?);
        self.store(Some(Arc::clone(&model)));
        Ok(model)
    }

    /// Drop the cached classifier. In-flight calls keep their own reference.
    pub fn release(&self) {
        if self.store(None).is_some() {
            info!("released classification model");
        }
    }
}

impl<C: GenreClassifier> GenreClassifier for LazyClassifier<C> {
    fn classify(&self, text: &str) -> Result<Prediction, ClassifierError> {
        self.acquire()?.classify(text)
    }

    fn is_loaded(&self) -> bool {
        self.loaded().is_some()
    }
}

/// The handle type used by the server and CLI.
#[cfg(feature = "local-model-tract")]
pub type SharedClassifier = LazyClassifier<TractClassifier>;

/// Build the lazily-loaded handle for the configured model.
#[cfg(feature = "local-model-tract")]
pub fn shared_classifier(config: &ModelConfig) -> SharedClassifier {
    let config = config.clone();
    LazyClassifier::new(move || TractClassifier::load(&config))
}

/// Without a model backend every classification fails.
#[cfg(not(feature = "local-model-tract"))]
pub struct NoBackend;

#[cfg(not(feature = "local-model-tract"))]
impl GenreClassifier for NoBackend {
    fn classify(&self, _text: &str) -> Result<Prediction, ClassifierError> {
        Err(ClassifierError::Unavailable(
            "built without a model backend; enable --features local-model-tract".to_string(),
        ))
    }
}

#[cfg(not(feature = "local-model-tract"))]
pub type SharedClassifier = LazyClassifier<NoBackend>;

#[cfg(not(feature = "local-model-tract"))]
pub fn shared_classifier(_config: &ModelConfig) -> SharedClassifier {
    LazyClassifier::new(|| NoBackend.classify("").map(|_| NoBackend))
}

/// Index of the largest score; the first one wins on ties.
pub(crate) fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}
