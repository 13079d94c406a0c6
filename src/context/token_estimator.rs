//! Prompt size estimation using tiktoken

use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::warn;

const FALLBACK_TOKENS_PER_WORD: f64 = 1.3;

/// Token estimator with a word-count fallback when the BPE vocabulary
/// cannot be loaded
pub struct TokenEstimator {
    bpe: Option<Arc<CoreBPE>>,
}

impl TokenEstimator {
    pub fn new() -> Self {
        let bpe = match cl100k_base() {
            Ok(bpe) => Some(Arc::new(bpe)),
            Err(e) => {
                warn!("Falling back to word-based token estimation: {}", e);
                None
            }
        };
        Self { bpe }
    }

    pub fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => {
                let words = text.split_whitespace().count();
                (words as f64 * FALLBACK_TOKENS_PER_WORD).ceil() as usize
            }
        }
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}
