//! Weighted edit-distance matching against the vocabulary.

pub mod confusable;
pub mod levenshtein;
pub mod matcher;

pub use confusable::{CONFUSABLE_BONUS_FACTOR, ConfusableClasses};
pub use levenshtein::{adjusted_distance, levenshtein_distance, similarity_score};
pub use matcher::{EditDistanceMatcher, ScoredCandidate};
