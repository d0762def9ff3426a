//! # Sibyl
//!
//! A context-aware spelling and word-suggestion engine for Rust.
//!
//! ## Features
//!
//! - Confusable-weighted edit-distance matching
//! - Unigram/bigram probability model with PMI collocation scoring
//! - Static word-importance scoring precomputed per model
//! - Per-user personalization learned from accepted corrections
//! - Bounded single-flight suggestion cache

pub mod cache;
pub mod collocation;
pub mod config;
pub mod engine;
pub mod error;
pub mod matching;
pub mod model;
pub mod personalization;

pub mod prelude {
    pub use crate::config::{ConfusableClass, EngineConfig, ScoreWeights};
    pub use crate::engine::{Suggestion, SuggestionEngine, SuggestionSource};
    pub use crate::error::{Result, SibylError};
    pub use crate::model::SuggestionModel;
    pub use crate::model::frequency::{FrequencyStore, ModelBuilder};
    pub use crate::personalization::PersonalizationStore;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
