//! The suggestion engine: candidate generation, scoring, ranking, caching.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, SuggestionCache, cache_key, context_signature};
use crate::collocation::CollocationScorer;
use crate::config::EngineConfig;
use crate::error::{Result, SibylError};
use crate::matching::matcher::EditDistanceMatcher;
use crate::model::SuggestionModel;
use crate::model::frequency::FrequencyStore;
use crate::personalization::PersonalizationStore;

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestionSource {
    /// Produced by edit-distance matching alone.
    EditDistance,
    /// An edit-distance match the user has previously accepted.
    Personalized,
    /// A shortcut expansion.
    Shortcut,
}

/// A ranked suggestion with its composite score.
///
/// The composite score is a ranking key, not a probability; callers must not
/// assume an upper bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// The suggested word.
    pub word: String,
    /// Composite score, higher is better.
    pub score: f64,
    /// Where the suggestion came from.
    pub source: SuggestionSource,
}

/// Per-candidate signal terms, kept only while ranking.
#[derive(Debug, Clone)]
struct Candidate {
    word: String,
    edit_score: f64,
    frequency_term: f64,
    collocation_term: f64,
    personalization_term: f64,
    source: SuggestionSource,
}

impl Candidate {
    fn composite(&self, weights: &crate::config::ScoreWeights) -> f64 {
        weights.edit_distance * self.edit_score
            + weights.frequency * self.frequency_term
            + weights.collocation * self.collocation_term
            + weights.personalization * self.personalization_term
    }

    fn source_rank(&self) -> u8 {
        match self.source {
            SuggestionSource::Personalized => 0,
            _ => 1,
        }
    }
}

/// Context-aware suggestion engine.
///
/// Composes the edit-distance matcher, the importance and collocation
/// scorers, and the personalization store into a ranked candidate list, with
/// a bounded result cache in front. All methods take `&self`; the engine is
/// shared freely across threads.
///
/// # Examples
///
/// ```
/// use sibyl::config::EngineConfig;
/// use sibyl::engine::SuggestionEngine;
/// use sibyl::model::frequency::ModelBuilder;
///
/// let engine = SuggestionEngine::new(EngineConfig::default()).unwrap();
/// let store = ModelBuilder::from_corpus("to the store and to the park")
///     .build()
///     .unwrap();
/// engine.install_model(store);
///
/// let context = ["to".to_string()];
/// let suggestions = engine.suggest("teh", &context, None, 5).unwrap();
/// assert_eq!(suggestions[0].word, "the");
/// ```
pub struct SuggestionEngine {
    config: EngineConfig,
    matcher: EditDistanceMatcher,
    cache: SuggestionCache<Vec<Suggestion>>,
    personalization: Arc<PersonalizationStore>,
    shortcuts: RwLock<AHashMap<String, String>>,
    model: RwLock<Option<Arc<SuggestionModel>>>,
}

impl SuggestionEngine {
    /// Create an engine with the given configuration and a fresh
    /// personalization store.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_personalization(config, Arc::new(PersonalizationStore::new()))
    }

    /// Create an engine sharing an externally owned personalization store.
    pub fn with_personalization(
        config: EngineConfig,
        personalization: Arc<PersonalizationStore>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(SuggestionEngine {
            matcher: EditDistanceMatcher::new(&config),
            cache: SuggestionCache::new(config.cache_capacity),
            personalization,
            shortcuts: RwLock::new(AHashMap::new()),
            model: RwLock::new(None),
            config,
        })
    }

    /// Install an immutable model snapshot, replacing any previous one.
    ///
    /// Derives the importance table and flushes the cache so no stale
    /// rankings survive the swap.
    pub fn install_model(&self, store: FrequencyStore) {
        let model = Arc::new(SuggestionModel::new(store));
        *self.model.write() = Some(model);
        self.cache.clear();
    }

    /// Whether a model has been installed.
    pub fn is_initialized(&self) -> bool {
        self.model.read().is_some()
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The personalization store backing this engine.
    pub fn personalization(&self) -> &Arc<PersonalizationStore> {
        &self.personalization
    }

    /// Produce up to `top_k` ranked suggestions for `query` given the words
    /// preceding it.
    ///
    /// Fails with `InvalidArgument` when `top_k` is zero and with
    /// `NotInitialized` before a model is installed. An empty query yields an
    /// empty list, not an error.
    pub fn suggest(
        &self,
        query: &str,
        preceding_context: &[String],
        user_id: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<Suggestion>> {
        if top_k == 0 {
            return Err(SibylError::invalid_argument(
                "top_k must be greater than zero",
            ));
        }

        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(expansion) = self.shortcut_expansion(&query) {
            return Ok(vec![Suggestion {
                word: expansion,
                score: 1.0,
                source: SuggestionSource::Shortcut,
            }]);
        }

        let model = self
            .model
            .read()
            .clone()
            .ok_or_else(|| SibylError::not_initialized("no model installed"))?;

        let context: Vec<String> = preceding_context
            .iter()
            .map(|token| token.trim().to_lowercase())
            .collect();

        let key = cache_key(&query, &context);
        let ranked = self.cache.get_or_compute(key, || {
            Ok(self.rank(&model, &query, &context, user_id))
        })?;

        Ok(ranked.into_iter().take(top_k).collect())
    }

    /// [`suggest`](Self::suggest) with the configured default `top_k`.
    pub fn suggest_default(
        &self,
        query: &str,
        preceding_context: &[String],
        user_id: Option<&str>,
    ) -> Result<Vec<Suggestion>> {
        self.suggest(query, preceding_context, user_id, self.config.top_k)
    }

    /// Score and order candidates for a cache miss.
    ///
    /// The full ranked list (up to `max_candidates`) is what gets cached;
    /// truncation to the caller's `top_k` happens on the way out so differing
    /// `top_k` values share one entry.
    fn rank(
        &self,
        model: &SuggestionModel,
        query: &str,
        context: &[String],
        user_id: Option<&str>,
    ) -> Vec<Suggestion> {
        let matches = self.matcher.rank(
            query,
            model.store().vocabulary(),
            self.config.max_candidates,
        );

        let accepted = user_id
            .map(|user| self.personalization.lookup(user, query))
            .unwrap_or_default();

        let collocation = CollocationScorer::new(model.store());
        let preceding = context.last().map(|s| s.as_str());
        let weights = &self.config.weights;

        let mut candidates: Vec<(f64, Candidate)> = matches
            .into_iter()
            .map(|scored| {
                let accepted_count = accepted.get(&scored.word).copied().unwrap_or(0);
                let candidate = Candidate {
                    edit_score: scored.score,
                    frequency_term: model.importance().importance(&scored.word),
                    collocation_term: collocation.score(&scored.word, preceding),
                    personalization_term: PersonalizationStore::personalization_term(
                        accepted_count,
                    ),
                    source: if accepted_count > 0 {
                        SuggestionSource::Personalized
                    } else {
                        SuggestionSource::EditDistance
                    },
                    word: scored.word,
                };
                (candidate.composite(weights), candidate)
            })
            .collect();

        candidates.sort_unstable_by(|(score_a, a), (score_b, b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| a.source_rank().cmp(&b.source_rank()))
                .then_with(|| a.word.cmp(&b.word))
        });

        candidates
            .into_iter()
            .map(|(composite, candidate)| Suggestion {
                word: candidate.word,
                score: composite,
                source: candidate.source,
            })
            .collect()
    }

    /// Record that a user accepted `selected` as the correction of
    /// `original` in the given context. The only external mutation entry
    /// point.
    pub fn record_feedback(
        &self,
        user_id: &str,
        original: &str,
        selected: &str,
        preceding_context: &[String],
    ) -> Result<()> {
        let original = original.trim().to_lowercase();
        let selected = selected.trim().to_lowercase();
        let context: Vec<String> = preceding_context
            .iter()
            .map(|token| token.trim().to_lowercase())
            .collect();

        self.personalization
            .record(user_id, &original, &selected, context_signature(&context))
    }

    /// Register a shortcut expansion, e.g. `bcz` → `because`.
    pub fn add_shortcut(&self, shortcut: &str, expansion: &str) -> Result<()> {
        let shortcut = shortcut.trim().to_lowercase();
        let expansion = expansion.trim().to_lowercase();
        if shortcut.is_empty() || expansion.is_empty() {
            return Err(SibylError::invalid_argument(
                "shortcut and expansion must not be empty",
            ));
        }

        self.shortcuts.write().insert(shortcut, expansion);
        Ok(())
    }

    /// Remove a shortcut. Returns whether it existed.
    pub fn remove_shortcut(&self, shortcut: &str) -> bool {
        self.shortcuts
            .write()
            .remove(&shortcut.trim().to_lowercase())
            .is_some()
    }

    /// The expansion registered for a shortcut, if any.
    pub fn shortcut_expansion(&self, shortcut: &str) -> Option<String> {
        self.shortcuts
            .read()
            .get(&shortcut.trim().to_lowercase())
            .cloned()
    }

    /// Drop all personalization history for a user. Returns whether the user
    /// existed.
    pub fn reset_user(&self, user_id: &str) -> bool {
        self.personalization.reset_user(user_id)
    }

    /// Export the personalization store as JSON.
    pub fn export_personalization(&self) -> Result<String> {
        self.personalization.export_json()
    }

    /// Replace the personalization store contents from exported JSON.
    pub fn import_personalization(&self, json: &str) -> Result<()> {
        self.personalization.import_json(json)
    }

    /// Get statistics about the engine.
    pub fn stats(&self) -> EngineStats {
        let model = self.model.read().clone();
        let (vocabulary_words, unigram_entries, bigram_entries) = model
            .map(|m| {
                (
                    m.store().word_count(),
                    m.store().unigram_count(),
                    m.store().bigram_count(),
                )
            })
            .unwrap_or((0, 0, 0));

        EngineStats {
            initialized: self.is_initialized(),
            vocabulary_words,
            unigram_entries,
            bigram_entries,
            shortcut_count: self.shortcuts.read().len(),
            user_count: self.personalization.user_count(),
            cache: self.cache.stats(),
        }
    }
}

/// Statistics about the engine and its model.
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Whether a model has been installed.
    pub initialized: bool,
    /// Number of vocabulary words.
    pub vocabulary_words: usize,
    /// Number of unigram table entries.
    pub unigram_entries: usize,
    /// Number of bigram table entries.
    pub bigram_entries: usize,
    /// Number of registered shortcuts.
    pub shortcut_count: usize,
    /// Number of users with personalization history.
    pub user_count: usize,
    /// Suggestion cache statistics.
    pub cache: CacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::frequency::ModelBuilder;

    fn small_model() -> FrequencyStore {
        ModelBuilder::new()
            .unigram("the", 0.05)
            .unigram("teh", 0.000001)
            .unigram("ten", 0.00001)
            .unigram("ted", 0.00001)
            .unigram("to", 0.04)
            .bigram("to", "the", 0.01)
            .bigram("of", "the", 0.012)
            .build()
            .unwrap()
    }

    fn engine_with_model() -> SuggestionEngine {
        let engine = SuggestionEngine::new(EngineConfig::default()).unwrap();
        engine.install_model(small_model());
        engine
    }

    fn ctx(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_suggest_before_install_fails() {
        let engine = SuggestionEngine::new(EngineConfig::default()).unwrap();
        let result = engine.suggest("teh", &[], None, 10);

        assert!(matches!(result, Err(SibylError::NotInitialized(_))));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let engine = engine_with_model();
        let result = engine.suggest("cat", &[], None, 0);

        assert!(matches!(result, Err(SibylError::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_query_yields_empty_list() {
        let engine = engine_with_model();

        assert!(engine.suggest("", &[], None, 10).unwrap().is_empty());
        assert!(engine.suggest("   ", &[], None, 10).unwrap().is_empty());
    }

    #[test]
    fn test_vocabulary_word_suggests_itself() {
        let engine = engine_with_model();
        let suggestions = engine.suggest("ten", &[], None, 10).unwrap();

        assert!(suggestions.iter().any(|s| s.word == "ten"));
    }

    #[test]
    fn test_context_ranks_the_above_ten_and_ted() {
        let engine = engine_with_model();
        let suggestions = engine.suggest("teh", &ctx(&["to"]), None, 10).unwrap();

        let position = |word: &str| suggestions.iter().position(|s| s.word == word).unwrap();
        assert!(position("the") < position("ten"));
        assert!(position("the") < position("ted"));
    }

    #[test]
    fn test_personalization_promotes_accepted_word() {
        let engine = engine_with_model();
        let context = ctx(&["to"]);

        // Saturate the personalization bonus for "ted".
        for _ in 0..10 {
            engine
                .record_feedback("alice", "teh", "ted", &context)
                .unwrap();
        }

        let personalized = engine.suggest("teh", &context, Some("alice"), 10).unwrap();
        let ted = personalized.iter().find(|s| s.word == "ted").unwrap();
        assert_eq!(ted.source, SuggestionSource::Personalized);

        let ted_index = personalized.iter().position(|s| s.word == "ted").unwrap();
        let ten_index = personalized.iter().position(|s| s.word == "ten").unwrap();
        assert!(ted_index < ten_index);
    }

    #[test]
    fn test_shortcut_short_circuits_matching() {
        let engine = engine_with_model();
        engine.add_shortcut("bcz", "because").unwrap();

        let suggestions = engine.suggest("bcz", &[], None, 10).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].word, "because");
        assert_eq!(suggestions[0].score, 1.0);
        assert_eq!(suggestions[0].source, SuggestionSource::Shortcut);

        assert!(engine.remove_shortcut("bcz"));
        assert!(!engine.remove_shortcut("bcz"));
        let suggestions = engine.suggest("bcz", &[], None, 10).unwrap();
        assert!(suggestions.iter().all(|s| s.word != "because"));
    }

    #[test]
    fn test_empty_shortcut_rejected() {
        let engine = engine_with_model();
        assert!(engine.add_shortcut("", "because").is_err());
        assert!(engine.add_shortcut("bcz", " ").is_err());
    }

    #[test]
    fn test_cache_idempotence() {
        let engine = engine_with_model();
        let context = ctx(&["to"]);

        let first = engine.suggest("teh", &context, None, 10).unwrap();
        let second = engine.suggest("teh", &context, None, 10).unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.stats().cache.hits, 1);
    }

    #[test]
    fn test_top_k_truncates_shared_entry() {
        let engine = engine_with_model();

        let five = engine.suggest("teh", &[], None, 5).unwrap();
        let two = engine.suggest("teh", &[], None, 2).unwrap();

        assert!(five.len() >= two.len());
        assert_eq!(&five[..two.len()], &two[..]);
        // Both calls share one cache entry.
        assert_eq!(engine.stats().cache.entries, 1);
    }

    #[test]
    fn test_install_model_flushes_cache() {
        let engine = engine_with_model();
        engine.suggest("teh", &[], None, 10).unwrap();
        assert_eq!(engine.stats().cache.entries, 1);

        engine.install_model(small_model());
        assert_eq!(engine.stats().cache.entries, 0);
    }

    #[test]
    fn test_reset_user_clears_history() {
        let engine = engine_with_model();
        engine.record_feedback("alice", "teh", "the", &[]).unwrap();

        assert!(engine.reset_user("alice"));
        assert!(engine.personalization().lookup("alice", "teh").is_empty());
    }

    #[test]
    fn test_stats_shape() {
        let engine = engine_with_model();
        engine.add_shortcut("mrn", "morning").unwrap();
        engine.record_feedback("alice", "teh", "the", &[]).unwrap();
        engine.suggest("teh", &[], None, 10).unwrap();

        let stats = engine.stats();
        assert!(stats.initialized);
        assert_eq!(stats.vocabulary_words, 6);
        assert_eq!(stats.unigram_entries, 5);
        assert_eq!(stats.bigram_entries, 2);
        assert_eq!(stats.shortcut_count, 1);
        assert_eq!(stats.user_count, 1);
        assert_eq!(stats.cache.misses, 1);
    }

    #[test]
    fn test_suggest_default_uses_configured_top_k() {
        let config = EngineConfig {
            top_k: 2,
            ..Default::default()
        };
        let engine = SuggestionEngine::new(config).unwrap();
        engine.install_model(small_model());

        let suggestions = engine.suggest_default("teh", &[], None).unwrap();
        assert_eq!(suggestions.len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = EngineConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(SuggestionEngine::new(config).is_err());
    }

    #[test]
    fn test_composite_terms_are_finite() {
        let engine = engine_with_model();
        for suggestion in engine.suggest("teh", &ctx(&["to"]), None, 10).unwrap() {
            assert!(suggestion.score.is_finite());
        }
    }
}
