//! Static per-word importance scores derived from the frequency tables.

use ahash::AHashMap;

use crate::model::frequency::FrequencyStore;

/// Saturating scale factor applied to the unigram probability.
const FREQUENCY_SCALE: f64 = 10_000.0;

/// Per-character penalty in the length term.
const LENGTH_FACTOR: f64 = 0.1;

/// Distinct left-context count at which the context term saturates.
const CONTEXT_SATURATION: f64 = 1_000.0;

/// Precomputed word → importance lookup.
///
/// Derived once from the frequency store when a model is installed; ranking
/// reads it without recomputation. Importance is the sum of a saturating
/// frequency term, a length term favoring short words, and a saturating
/// left-context density term.
#[derive(Debug, Clone)]
pub struct ImportanceTable {
    scores: AHashMap<String, f64>,
}

impl ImportanceTable {
    /// Compute the table for every word in the store's vocabulary.
    pub fn build(store: &FrequencyStore) -> Self {
        let scores = store
            .vocabulary()
            .iter()
            .map(|word| (word.clone(), Self::compute(store, word)))
            .collect();

        ImportanceTable { scores }
    }

    fn compute(store: &FrequencyStore, word: &str) -> f64 {
        let frequency = (store.unigram_probability(word) * FREQUENCY_SCALE).min(1.0);
        let length = 1.0 / (1.0 + LENGTH_FACTOR * word.chars().count() as f64);
        let context = (store.left_context_count(word) as f64 / CONTEXT_SATURATION).min(1.0);
        frequency + length + context
    }

    /// Importance of a word, 0.0 for words outside the vocabulary.
    pub fn importance(&self, word: &str) -> f64 {
        self.scores.get(word).copied().unwrap_or(0.0)
    }

    /// Number of scored words.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
