//! Immutable unigram/bigram frequency tables and the vocabulary.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SibylError};

/// Floor probability substituted for missing table entries so that ratios and
/// logarithms stay defined.
pub const FLOOR_PROBABILITY: f64 = 1e-9;

/// Probability assigned to custom words merged in at build time.
pub const CUSTOM_WORD_PROBABILITY: f64 = 0.001;

/// Immutable snapshot of the vocabulary and n-gram probability tables.
///
/// Built once by [`ModelBuilder`] (or loaded from a snapshot) and shared
/// read-only across concurrent requests. Every word referenced by the unigram
/// or bigram table is guaranteed to be in the vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyStore {
    vocabulary: AHashSet<String>,
    unigrams: AHashMap<String, f64>,
    bigrams: AHashMap<(String, String), f64>,
    /// Distinct bigrams in which a word appears as the second element.
    left_context_counts: AHashMap<String, u32>,
}

impl FrequencyStore {
    /// Check whether a word is in the vocabulary.
    pub fn contains(&self, word: &str) -> bool {
        self.vocabulary.contains(word)
    }

    /// The full vocabulary set.
    pub fn vocabulary(&self) -> &AHashSet<String> {
        &self.vocabulary
    }

    /// Unigram probability of a word, 0.0 when absent.
    pub fn unigram_probability(&self, word: &str) -> f64 {
        self.unigrams.get(word).copied().unwrap_or(0.0)
    }

    /// Unigram probability with the floor applied, suitable for ratios.
    pub fn unigram_probability_or_floor(&self, word: &str) -> f64 {
        self.unigram_probability(word).max(FLOOR_PROBABILITY)
    }

    /// Bigram probability of `(first, second)`, 0.0 when absent.
    pub fn bigram_probability(&self, first: &str, second: &str) -> f64 {
        self.bigrams
            .get(&(first.to_string(), second.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Bigram probability with the floor applied.
    pub fn bigram_probability_or_floor(&self, first: &str, second: &str) -> f64 {
        self.bigram_probability(first, second).max(FLOOR_PROBABILITY)
    }

    /// Number of distinct bigrams in which `word` is the second element.
    pub fn left_context_count(&self, word: &str) -> u32 {
        self.left_context_counts.get(word).copied().unwrap_or(0)
    }

    /// Number of words in the vocabulary.
    pub fn word_count(&self) -> usize {
        self.vocabulary.len()
    }

    /// Number of unigram table entries.
    pub fn unigram_count(&self) -> usize {
        self.unigrams.len()
    }

    /// Number of bigram table entries.
    pub fn bigram_count(&self) -> usize {
        self.bigrams.len()
    }

    /// Whether the store holds any vocabulary at all.
    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Write the store to a binary snapshot file.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, self)
            .map_err(|e| SibylError::serialization(e.to_string()))
    }

    /// Load a store from a binary snapshot file.
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        bincode::deserialize_from(reader).map_err(|e| SibylError::serialization(e.to_string()))
    }
}

/// Builder for [`FrequencyStore`].
///
/// Accepts pre-built probability tables from an offline batch job, extra
/// vocabulary, custom words with a boosted probability, or derives the tables
/// directly from corpus text.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    unigrams: AHashMap<String, f64>,
    bigrams: AHashMap<(String, String), f64>,
    extra_words: AHashSet<String>,
}

impl ModelBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        ModelBuilder::default()
    }

    /// Set the unigram probability of a word.
    pub fn unigram<S: Into<String>>(mut self, word: S, probability: f64) -> Self {
        self.unigrams.insert(word.into().to_lowercase(), probability);
        self
    }

    /// Set the bigram probability of `(first, second)`.
    pub fn bigram<S: Into<String>>(mut self, first: S, second: S, probability: f64) -> Self {
        self.bigrams.insert(
            (first.into().to_lowercase(), second.into().to_lowercase()),
            probability,
        );
        self
    }

    /// Add words to the vocabulary without assigning probabilities.
    pub fn vocabulary_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for word in words {
            self.extra_words.insert(word.into().to_lowercase());
        }
        self
    }

    /// Add custom words with the boosted [`CUSTOM_WORD_PROBABILITY`].
    ///
    /// Words already carrying a table probability keep it.
    pub fn custom_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for word in words {
            let word = word.into().to_lowercase();
            self.unigrams
                .entry(word.clone())
                .or_insert(CUSTOM_WORD_PROBABILITY);
            self.extra_words.insert(word);
        }
        self
    }

    /// Load unigram probabilities from a text file with `word probability`
    /// per line. Blank lines are skipped; malformed lines are an error.
    pub fn unigram_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 2 {
                return Err(SibylError::model(format!(
                    "malformed unigram line: {line}"
                )));
            }
            let probability: f64 = parts[1]
                .parse()
                .map_err(|_| SibylError::model(format!("malformed probability: {}", parts[1])))?;
            self.unigrams.insert(parts[0].to_lowercase(), probability);
        }

        Ok(self)
    }

    /// Load bigram probabilities from a text file with
    /// `first second probability` per line.
    pub fn bigram_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 3 {
                return Err(SibylError::model(format!("malformed bigram line: {line}")));
            }
            let probability: f64 = parts[2]
                .parse()
                .map_err(|_| SibylError::model(format!("malformed probability: {}", parts[2])))?;
            self.bigrams.insert(
                (parts[0].to_lowercase(), parts[1].to_lowercase()),
                probability,
            );
        }

        Ok(self)
    }

    /// Derive unigram and bigram probabilities from raw corpus text.
    ///
    /// Tokens are lowercased alphabetic runs; consecutive tokens form the
    /// bigrams. Intended for tests and small hosts, not as an ingestion
    /// pipeline.
    pub fn from_corpus(text: &str) -> Self {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphabetic())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        let mut unigram_counts: AHashMap<String, u64> = AHashMap::new();
        for token in &tokens {
            *unigram_counts.entry(token.clone()).or_insert(0) += 1;
        }

        let mut bigram_counts: AHashMap<(String, String), u64> = AHashMap::new();
        for pair in tokens.windows(2) {
            *bigram_counts
                .entry((pair[0].clone(), pair[1].clone()))
                .or_insert(0) += 1;
        }

        let total_tokens = tokens.len().max(1) as f64;
        let total_bigrams = tokens.len().saturating_sub(1).max(1) as f64;

        let mut builder = ModelBuilder::new();
        builder.unigrams = unigram_counts
            .into_iter()
            .map(|(w, c)| (w, c as f64 / total_tokens))
            .collect();
        builder.bigrams = bigram_counts
            .into_iter()
            .map(|(k, c)| (k, c as f64 / total_bigrams))
            .collect();
        builder
    }

    /// Build the immutable store.
    ///
    /// Table keys are unioned into the vocabulary, maintaining the invariant
    /// that every referenced word is a vocabulary member. Probabilities
    /// outside [0, 1] are rejected.
    pub fn build(self) -> Result<FrequencyStore> {
        for (word, p) in &self.unigrams {
            if !p.is_finite() || !(0.0..=1.0).contains(p) {
                return Err(SibylError::model(format!(
                    "unigram probability for '{word}' out of range: {p}"
                )));
            }
        }
        for ((first, second), p) in &self.bigrams {
            if !p.is_finite() || !(0.0..=1.0).contains(p) {
                return Err(SibylError::model(format!(
                    "bigram probability for '({first}, {second})' out of range: {p}"
                )));
            }
        }

        let mut vocabulary = self.extra_words;
        vocabulary.extend(self.unigrams.keys().cloned());
        for (first, second) in self.bigrams.keys() {
            vocabulary.insert(first.clone());
            vocabulary.insert(second.clone());
        }

        let mut left_context_counts: AHashMap<String, u32> = AHashMap::new();
        for (_, second) in self.bigrams.keys() {
            *left_context_counts.entry(second.clone()).or_insert(0) += 1;
        }

        Ok(FrequencyStore {
            vocabulary,
            unigrams: self.unigrams,
            bigrams: self.bigrams,
            left_context_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builder_basic() {
        let store = ModelBuilder::new()
            .unigram("the", 0.05)
            .unigram("cat", 0.001)
            .bigram("the", "cat", 0.0005)
            .build()
            .unwrap();

        assert!(store.contains("the"));
        assert!(store.contains("cat"));
        assert_eq!(store.word_count(), 2);
        assert!((store.unigram_probability("the") - 0.05).abs() < 1e-12);
        assert!((store.bigram_probability("the", "cat") - 0.0005).abs() < 1e-12);
        assert_eq!(store.unigram_probability("dog"), 0.0);
        assert_eq!(store.bigram_probability("a", "dog"), 0.0);
    }

    #[test]
    fn test_vocabulary_covers_table_keys() {
        let store = ModelBuilder::new()
            .bigram("quick", "fox", 0.01)
            .build()
            .unwrap();

        // Bigram-only words still land in the vocabulary.
        assert!(store.contains("quick"));
        assert!(store.contains("fox"));
    }

    #[test]
    fn test_floor_probability() {
        let store = ModelBuilder::new().unigram("the", 0.05).build().unwrap();

        assert_eq!(store.unigram_probability_or_floor("unknown"), FLOOR_PROBABILITY);
        assert_eq!(
            store.bigram_probability_or_floor("unknown", "pair"),
            FLOOR_PROBABILITY
        );
        assert!(store.unigram_probability_or_floor("the") > FLOOR_PROBABILITY);
    }

    #[test]
    fn test_out_of_range_probability_rejected() {
        assert!(ModelBuilder::new().unigram("the", 1.5).build().is_err());
        assert!(ModelBuilder::new().unigram("the", -0.1).build().is_err());
        assert!(
            ModelBuilder::new()
                .bigram("the", "cat", f64::NAN)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_custom_words() {
        let store = ModelBuilder::new()
            .unigram("the", 0.05)
            .custom_words(["Rustacean", "the"])
            .build()
            .unwrap();

        assert!(store.contains("rustacean"));
        assert!((store.unigram_probability("rustacean") - CUSTOM_WORD_PROBABILITY).abs() < 1e-12);
        // An existing table probability wins over the custom-word boost.
        assert!((store.unigram_probability("the") - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_left_context_counts() {
        let store = ModelBuilder::new()
            .bigram("to", "the", 0.01)
            .bigram("of", "the", 0.02)
            .bigram("the", "cat", 0.001)
            .build()
            .unwrap();

        assert_eq!(store.left_context_count("the"), 2);
        assert_eq!(store.left_context_count("cat"), 1);
        assert_eq!(store.left_context_count("to"), 0);
    }

    #[test]
    fn test_from_corpus() {
        let builder = ModelBuilder::from_corpus("the quick fox and the lazy dog saw the fox");
        let store = builder.build().unwrap();

        assert!(store.contains("the"));
        assert!(store.contains("fox"));
        // "the" occurs 3 times out of 10 tokens.
        assert!((store.unigram_probability("the") - 0.3).abs() < 1e-12);
        // ("the", "fox") occurs 2 times out of 9 bigrams.
        assert!((store.bigram_probability("the", "fox") - 2.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_unigram_file_loading() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "the 0.05").unwrap();
        writeln!(file, "cat 0.001").unwrap();
        writeln!(file).unwrap();
        file.flush().unwrap();

        let store = ModelBuilder::new()
            .unigram_file(file.path())
            .unwrap()
            .build()
            .unwrap();

        assert!((store.unigram_probability("the") - 0.05).abs() < 1e-12);
        assert!((store.unigram_probability("cat") - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_bigram_file_loading() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "to the 0.01").unwrap();
        writeln!(file, "the cat 0.002").unwrap();
        file.flush().unwrap();

        let store = ModelBuilder::new()
            .bigram_file(file.path())
            .unwrap()
            .build()
            .unwrap();

        assert!((store.bigram_probability("to", "the") - 0.01).abs() < 1e-12);
        assert_eq!(store.left_context_count("the"), 1);
    }

    #[test]
    fn test_malformed_table_file_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "the not-a-number").unwrap();
        file.flush().unwrap();

        assert!(ModelBuilder::new().unigram_file(file.path()).is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = ModelBuilder::new()
            .unigram("the", 0.05)
            .bigram("to", "the", 0.01)
            .custom_words(["rustacean"])
            .build()
            .unwrap();

        let file = NamedTempFile::new().unwrap();
        store.save_snapshot(file.path()).unwrap();

        let restored = FrequencyStore::load_snapshot(file.path()).unwrap();
        assert_eq!(restored.word_count(), store.word_count());
        assert!((restored.unigram_probability("the") - 0.05).abs() < 1e-12);
        assert!((restored.bigram_probability("to", "the") - 0.01).abs() < 1e-12);
        assert_eq!(restored.left_context_count("the"), 1);
    }
}
