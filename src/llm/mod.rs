//! Summarization model abstraction.
//!
//! A [`ModelLoader`] knows how to bring a model up; a [`ModelProvider`]
//! memoizes the loaded handle so the load happens once per process, no
//! matter how many requests race for it.

pub mod extractive;
pub mod inference;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::config::{Backend, Config};
use crate::error::{AppError, Result};

pub use extractive::{ExtractiveLoader, ExtractiveModel};
pub use inference::{InferenceLoader, InferenceModel};

/// Decoding bounds passed with every model call.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
    pub max_length: usize,
    pub min_length: usize,
    pub do_sample: bool,
    /// Oversized inputs are cut at the model's input limit instead of erroring.
    pub truncation: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams {
            max_length: 150,
            min_length: 50,
            do_sample: false,
            truncation: true,
        }
    }
}

#[async_trait]
pub trait SummaryModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, text: &str, params: &GenerationParams) -> Result<String>;
}

#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn SummaryModel>>;
}

pub type ModelHandle = Arc<dyn SummaryModel>;

/// Lazily loads and caches a [`ModelHandle`].
///
/// Concurrent first callers wait on the same load. A failed load leaves the
/// cell empty so a later call retries.
pub struct ModelProvider {
    loader: Box<dyn ModelLoader>,
    handle: OnceCell<ModelHandle>,
    attempts: AtomicUsize,
}

impl ModelProvider {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        ModelProvider {
            loader: Box::new(loader),
            handle: OnceCell::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        match config.backend {
            Backend::Inference => ModelProvider::new(InferenceLoader::new(config)),
            Backend::Extractive => ModelProvider::new(ExtractiveLoader),
        }
    }

    pub async fn get(&self) -> Result<ModelHandle> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!(attempt, "Loading summarization model");
                match self.loader.load().await {
                    Ok(model) => {
                        tracing::info!(model = model.name(), "Model loaded successfully");
                        Ok(model)
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "Failed to load summarization model");
                        Err(match err {
                            AppError::ModelUnavailable(msg) => AppError::ModelUnavailable(msg),
                            other => AppError::ModelUnavailable(other.to_string()),
                        })
                    }
                }
            })
            .await?;
        Ok(Arc::clone(handle))
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.initialized()
    }

    /// Number of load attempts made so far, successful or not.
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl SummaryModel for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, text: &str, _params: &GenerationParams) -> Result<String> {
            Ok(text.to_string())
        }
    }

    struct SlowLoader {
        loads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ModelLoader for SlowLoader {
        async fn load(&self) -> Result<Arc<dyn SummaryModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Arc::new(Echo))
        }
    }

    struct FlakyLoader {
        failed_once: AtomicBool,
    }

    #[async_trait]
    impl ModelLoader for FlakyLoader {
        async fn load(&self) -> Result<Arc<dyn SummaryModel>> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(AppError::Internal("weights missing".into()));
            }
            Ok(Arc::new(Echo))
        }
    }

    #[tokio::test]
    async fn concurrent_first_use_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(ModelProvider::new(SlowLoader { loads: loads.clone() }));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move { provider.get().await.map(|m| m.name().to_string()) })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "echo");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(provider.is_loaded());
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let provider = ModelProvider::new(FlakyLoader {
            failed_once: AtomicBool::new(false),
        });

        let err = provider.get().await.err().unwrap();
        assert!(matches!(err, AppError::ModelUnavailable(_)));
        assert!(!provider.is_loaded());

        let model = provider.get().await.unwrap();
        assert_eq!(model.name(), "echo");
        assert_eq!(provider.load_attempts(), 2);
    }

    #[test]
    fn default_params_are_deterministic() {
        let params = GenerationParams::default();
        assert_eq!((params.max_length, params.min_length), (150, 50));
        assert!(!params.do_sample);
        assert!(params.truncation);
    }
}
