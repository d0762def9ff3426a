//! Vocabulary matching by weighted edit distance.

use ahash::AHashSet;
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::matching::confusable::ConfusableClasses;
use crate::matching::levenshtein::{adjusted_distance, levenshtein_distance, similarity_score};

/// A vocabulary word scored against the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// The candidate word.
    pub word: String,
    /// Similarity score in (0.0, 1.0], higher is more similar.
    pub score: f64,
    /// Unweighted edit distance to the query.
    pub raw_distance: usize,
}

/// Scores vocabulary words against a query by confusable-weighted edit
/// distance.
#[derive(Debug, Clone)]
pub struct EditDistanceMatcher {
    classes: ConfusableClasses,
    max_length_difference: usize,
}

impl EditDistanceMatcher {
    /// Create a matcher from the engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        EditDistanceMatcher {
            classes: ConfusableClasses::new(&config.confusable_classes),
            max_length_difference: config.max_length_difference,
        }
    }

    /// Rank vocabulary words by similarity to `query`.
    ///
    /// Words whose length differs from the query by more than the configured
    /// threshold are skipped before any distance is computed. The result is
    /// ordered by score descending, ties broken by smaller raw distance and
    /// then lexicographically, and truncated to `max_candidates`. An empty
    /// query yields no candidates; a query that is itself a vocabulary word is
    /// scored (distance 0, score 1.0) and included.
    pub fn rank(
        &self,
        query: &str,
        vocabulary: &AHashSet<String>,
        max_candidates: usize,
    ) -> Vec<ScoredCandidate> {
        if query.is_empty() {
            return Vec::new();
        }

        let query_len = query.chars().count();

        let mut candidates: Vec<ScoredCandidate> = vocabulary
            .par_iter()
            .filter(|word| {
                word.chars().count().abs_diff(query_len) <= self.max_length_difference
            })
            .map(|word| {
                let raw_distance = levenshtein_distance(query, word);
                let adjusted = adjusted_distance(query, word, &self.classes);
                ScoredCandidate {
                    word: word.clone(),
                    score: similarity_score(adjusted),
                    raw_distance,
                }
            })
            .collect();

        candidates.sort_unstable_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.raw_distance.cmp(&b.raw_distance))
                .then_with(|| a.word.cmp(&b.word))
        });
        candidates.truncate(max_candidates);
        candidates
    }
}
