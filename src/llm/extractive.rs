use std::sync::Arc;

use async_trait::async_trait;

use super::{GenerationParams, ModelLoader, SummaryModel};
use crate::error::Result;

const SHORT_TEXT_CHARS: usize = 500;
const MAX_SUMMARY_CHARS: usize = 800;

/// Naive extractive summarizer: keeps the opening sentences and one from
/// the middle. Needs no weights and never fails.
pub struct ExtractiveModel;

impl ExtractiveModel {
    pub fn pick_sentences(text: &str) -> String {
        let sentences: Vec<&str> = text.split(". ").collect();

        if sentences.len() <= 3 {
            return format!("{}...", prefix(text, SHORT_TEXT_CHARS));
        }

        let mut picked = sentences[..2].to_vec();
        if sentences.len() > 5 {
            picked.push(sentences[sentences.len() / 2]);
        }

        let summary = picked.join(". ");
        if summary.chars().count() > MAX_SUMMARY_CHARS {
            format!("{}...", prefix(&summary, MAX_SUMMARY_CHARS))
        } else {
            summary
        }
    }
}

fn prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl SummaryModel for ExtractiveModel {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, text: &str, _params: &GenerationParams) -> Result<String> {
        Ok(Self::pick_sentences(text.trim()))
    }
}

pub struct ExtractiveLoader;

#[async_trait]
impl ModelLoader for ExtractiveLoader {
    async fn load(&self) -> Result<Arc<dyn SummaryModel>> {
        Ok(Arc::new(ExtractiveModel))
    }
}
