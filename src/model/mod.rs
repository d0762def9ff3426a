//! Language model snapshot: vocabulary, n-gram tables, and derived importance.

pub mod frequency;
pub mod importance;

use std::path::Path;

use crate::error::Result;
use crate::model::frequency::FrequencyStore;
use crate::model::importance::ImportanceTable;

/// An installed model: the immutable frequency store plus the importance
/// table derived from it.
///
/// The importance table is computed exactly once here; it only changes when a
/// new model is installed.
#[derive(Debug)]
pub struct SuggestionModel {
    store: FrequencyStore,
    importance: ImportanceTable,
}

impl SuggestionModel {
    /// Wrap a frequency store, deriving the importance table.
    pub fn new(store: FrequencyStore) -> Self {
        let importance = ImportanceTable::build(&store);
        SuggestionModel { store, importance }
    }

    /// Load a model from a binary snapshot produced by the offline table job.
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(SuggestionModel::new(FrequencyStore::load_snapshot(path)?))
    }

    /// The underlying frequency store.
    pub fn store(&self) -> &FrequencyStore {
        &self.store
    }

    /// The derived importance table.
    pub fn importance(&self) -> &ImportanceTable {
        &self.importance
    }
}
