/// Rough characters-to-tokens ratio (one token per four characters).
pub const CHARS_TO_TOKENS: f64 = 0.25;

/// Estimated model token count for `text`.
///
/// A character heuristic, not a real tokenizer; it under- or over-counts on
/// unusual text and can cause chunks to be cut at the model's input limit.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() as f64 * CHARS_TO_TOKENS) as usize
}

/// Greedy sentence packer.
#[derive(Clone, Copy)]
pub struct Chunker {
    budget: usize,
    estimate: fn(&str) -> usize,
}

impl Chunker {
    pub fn new(budget: usize) -> Self {
        Chunker {
            budget,
            estimate: estimate_tokens,
        }
    }

    /// Swaps the token estimator, e.g. for a real tokenizer length check.
    pub fn with_estimator(mut self, estimate: fn(&str) -> usize) -> Self {
        self.estimate = estimate;
        self
    }

    /// Packs sentences into chunks whose estimated size stays under the
    /// budget. A single sentence larger than the budget becomes its own chunk.
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in sentences(text) {
            let candidate_tokens = (self.estimate)(&format!("{current}{sentence}"));
            if candidate_tokens < self.budget {
                current.push_str(&sentence);
                current.push(' ');
            } else {
                if !current.trim().is_empty() {
                    chunks.push(current.trim().to_string());
                }
                current = format!("{sentence} ");
            }
        }

        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }

        chunks
    }
}

/// Splits on `". "`, putting back the period each split removed.
fn sentences(text: &str) -> Vec<String> {
    let flat = text.replace('\n', " ");
    let pieces: Vec<&str> = flat.split(". ").collect();
    let last = pieces.len().saturating_sub(1);

    pieces
        .iter()
        .enumerate()
        .filter_map(|(i, piece)| {
            let piece = piece.trim();
            if piece.is_empty() {
                None
            } else if i < last {
                Some(format!("{piece}."))
            } else {
                Some(piece.to_string())
            }
        })
        .collect()
}
