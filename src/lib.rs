pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod scraper;
pub mod summarizer;

use std::sync::Arc;
use crate::config::Config;
use crate::error::Result;
use crate::llm::ModelProvider;
use crate::scraper::Fetcher;
use crate::summarizer::{Summarizer, SummarizerSettings};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<Fetcher>,
    pub summarizer: Arc<Summarizer>,
}

impl AppState {
    /// Wires the fetcher and the backend chosen in `config`. The model itself
    /// is not loaded until the first summary is requested.
    pub fn from_config(config: Config) -> Result<Self> {
        let provider = Arc::new(ModelProvider::from_config(&config));
        Self::with_provider(config, provider)
    }

    pub fn with_provider(config: Config, provider: Arc<ModelProvider>) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        let summarizer = Summarizer::new(provider, SummarizerSettings::from_config(&config));

        Ok(AppState {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            summarizer: Arc::new(summarizer),
        })
    }
}
