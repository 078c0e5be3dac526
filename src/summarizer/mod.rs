//! Chunk-and-combine summarization.
//!
//! Long text is packed into model-sized chunks, each chunk is summarized on
//! its own, and the partial summaries are merged. When the merge is still
//! long it goes through the model one more time.

pub mod chunker;

use std::sync::Arc;

pub use chunker::{Chunker, estimate_tokens};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::llm::{GenerationParams, ModelProvider, SummaryModel};

pub const MIN_SUMMARIZABLE_CHARS: usize = 100;
pub const COMBINE_THRESHOLD_CHARS: usize = 1000;
pub const FALLBACK_CHARS: usize = 500;
pub const TOO_SHORT_MESSAGE: &str =
    "The provided content is too short to generate a meaningful summary.";

#[derive(Clone, Debug)]
pub struct SummarizerSettings {
    pub chunk_token_budget: usize,
    pub max_chunks: usize,
    pub params: GenerationParams,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        SummarizerSettings {
            chunk_token_budget: 900,
            max_chunks: 5,
            params: GenerationParams::default(),
        }
    }
}

impl SummarizerSettings {
    pub fn from_config(config: &Config) -> Self {
        SummarizerSettings {
            chunk_token_budget: config.chunk_token_budget,
            max_chunks: config.max_chunks,
            ..SummarizerSettings::default()
        }
    }
}

pub struct Summarizer {
    provider: Arc<ModelProvider>,
    chunker: Chunker,
    max_chunks: usize,
    params: GenerationParams,
}

impl Summarizer {
    pub fn new(provider: Arc<ModelProvider>, settings: SummarizerSettings) -> Self {
        Summarizer {
            provider,
            chunker: Chunker::new(settings.chunk_token_budget),
            max_chunks: settings.max_chunks,
            params: settings.params,
        }
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn provider(&self) -> &Arc<ModelProvider> {
        &self.provider
    }

    pub async fn summarize(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.chars().count() < MIN_SUMMARIZABLE_CHARS {
            tracing::debug!(chars = text.chars().count(), "Content too short, skipping model");
            return Ok(TOO_SHORT_MESSAGE.to_string());
        }

        let model = self.provider.get().await?;

        let chunks = self.chunker.split(text);
        if chunks.len() > self.max_chunks {
            tracing::debug!(
                total = chunks.len(),
                kept = self.max_chunks,
                "Dropping chunks beyond the cap"
            );
        }
        let chunks = &chunks[..chunks.len().min(self.max_chunks)];

        let outcomes = self.summarize_chunks(model.as_ref(), chunks).await;
        let summaries: Vec<String> = outcomes.into_iter().filter_map(Result::ok).collect();
        if summaries.is_empty() {
            tracing::error!(chunks = chunks.len(), "Every chunk failed to summarize");
            return Err(AppError::NoSummaryGenerated);
        }

        let summary = self.combine(model.as_ref(), summaries).await;
        tracing::info!(chars = summary.chars().count(), "Summary generated successfully");
        Ok(summary)
    }

    /// One outcome per chunk, in order. Failures are logged, not raised.
    async fn summarize_chunks(
        &self,
        model: &dyn SummaryModel,
        chunks: &[String],
    ) -> Vec<Result<String>> {
        let mut outcomes = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            tracing::info!("Summarizing chunk {}/{}", i + 1, chunks.len());
            let outcome = match model.generate(chunk, &self.params).await {
                Ok(summary) if summary.trim().is_empty() => {
                    Err(AppError::InferenceFailed("model returned an empty summary".to_string()))
                }
                Ok(summary) => Ok(summary.trim().to_string()),
                Err(err) => Err(err),
            };
            if let Err(err) = &outcome {
                tracing::warn!(chunk = i + 1, error = %err, "Failed to summarize chunk");
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn combine(&self, model: &dyn SummaryModel, mut summaries: Vec<String>) -> String {
        if summaries.len() == 1 {
            return summaries.remove(0);
        }

        let combined = summaries.join(" ");
        if combined.chars().count() <= COMBINE_THRESHOLD_CHARS {
            return combined;
        }

        tracing::info!(
            parts = summaries.len(),
            chars = combined.chars().count(),
            "Re-summarizing combined summaries"
        );
        match model.generate(&combined, &self.params).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => {
                tracing::warn!("Combining pass returned nothing, truncating instead");
                truncate_with_ellipsis(&combined, FALLBACK_CHARS)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Combining pass failed, truncating instead");
                truncate_with_ellipsis(&combined, FALLBACK_CHARS)
            }
        }
    }
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => format!("{text}..."),
    }
}
