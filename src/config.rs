//! Configuration for the suggestion engine.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SibylError};

/// Weights applied to the individual ranking signals when composing the final
/// candidate score.
///
/// The composite score is a ranking key, not a probability: weight sums above
/// 1.0 are accepted and no upper bound on the result is enforced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight for the edit-distance similarity score.
    pub edit_distance: f64,
    /// Weight for the static word-importance score.
    pub frequency: f64,
    /// Weight for the collocation (PMI) score.
    pub collocation: f64,
    /// Weight for the per-user personalization bonus.
    pub personalization: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            edit_distance: 0.5,
            frequency: 0.2,
            collocation: 0.2,
            personalization: 0.1,
        }
    }
}

/// A class of mutually confusable characters with an associated weight.
///
/// Substituting one member of a class for another during edit-distance
/// matching earns a bonus proportional to the class weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusableClass {
    /// The characters belonging to this class.
    pub chars: String,
    /// Class weight in [0.0, 1.0].
    pub weight: f64,
}

impl ConfusableClass {
    /// Create a new confusable class.
    pub fn new<S: Into<String>>(chars: S, weight: f64) -> Self {
        ConfusableClass {
            chars: chars.into(),
            weight,
        }
    }

    /// Default classes: vowels at weight 0.8, common consonant confusions at 0.9.
    pub fn default_classes() -> Vec<ConfusableClass> {
        vec![
            ConfusableClass::new("aeiou", 0.8),
            ConfusableClass::new("bdpq", 0.9),
            ConfusableClass::new("mn", 0.9),
            ConfusableClass::new("ij", 0.9),
            ConfusableClass::new("uv", 0.9),
        ]
    }
}

/// Configuration for the suggestion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of candidates kept after edit-distance matching.
    pub max_candidates: usize,
    /// Maximum number of entries in the suggestion cache.
    pub cache_capacity: usize,
    /// Default number of suggestions returned to the caller.
    pub top_k: usize,
    /// Words whose length differs from the query by more than this are skipped.
    pub max_length_difference: usize,
    /// Weights for composing the final candidate score.
    pub weights: ScoreWeights,
    /// Ordered confusable character classes; earlier classes win on overlap.
    pub confusable_classes: Vec<ConfusableClass>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_candidates: 20,
            cache_capacity: 10_000,
            top_k: 10,
            max_length_difference: 2,
            weights: ScoreWeights::default(),
            confusable_classes: ConfusableClass::default_classes(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    ///
    /// Weights are only checked for finiteness and non-negativity; their sum
    /// is deliberately unconstrained.
    pub fn validate(&self) -> Result<()> {
        if self.max_candidates == 0 {
            return Err(SibylError::invalid_argument(
                "max_candidates must be greater than zero",
            ));
        }
        if self.cache_capacity == 0 {
            return Err(SibylError::invalid_argument(
                "cache_capacity must be greater than zero",
            ));
        }
        if self.top_k == 0 {
            return Err(SibylError::invalid_argument(
                "top_k must be greater than zero",
            ));
        }

        let weights = [
            self.weights.edit_distance,
            self.weights.frequency,
            self.weights.collocation,
            self.weights.personalization,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SibylError::invalid_argument(
                "score weights must be finite and non-negative",
            ));
        }

        for class in &self.confusable_classes {
            if class.chars.is_empty() {
                return Err(SibylError::invalid_argument(
                    "confusable class charset must not be empty",
                ));
            }
            if !class.weight.is_finite() || !(0.0..=1.0).contains(&class.weight) {
                return Err(SibylError::invalid_argument(
                    "confusable class weight must be in [0.0, 1.0]",
                ));
            }
        }

        Ok(())
    }
}
