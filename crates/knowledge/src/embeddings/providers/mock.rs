//! Deterministic offline embedding provider.

use crate::embeddings::provider::EmbeddingProvider;
use insights_core::AppResult;

const STOP_WORDS: [&str; 24] = [
    "the", "is", "at", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of", "in",
    "and", "or", "with", "by", "from", "this", "that", "be", "it", "its",
];

/// Feature-hashing provider for tests and offline runs.
///
/// Each non-stop word contributes its whole-word hash and the hashes of its
/// character trigrams to a fixed number of buckets; the result is L2
/// normalized. Texts sharing vocabulary (tickers, company names) land close
/// together, which is enough to exercise retrieval ranking without a model.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, feature: &str, seed: u64) -> usize {
        let hash = feature
            .bytes()
            .fold(seed, |acc, b| acc.wrapping_mul(0x100_0000_01b3) ^ b as u64);
        (hash % self.dimensions as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let words = lower
            .split(|c: char| !(c.is_alphanumeric() || c == '.'))
            .map(|w| w.trim_matches('.'))
            .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w));

        for word in words {
            embedding[self.bucket(word, 0xcbf2_9ce4_8422_2325)] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[self.bucket(&trigram, 0x8422_2325_cbf2_9ce4)] += 0.5;
            }
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "hashed-trigram"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}
