//! Per-user correction history and the personalization bonus derived from it.

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SibylError};

/// Maximum context signatures retained per pattern; oldest dropped first.
pub const CONTEXT_HISTORY_CAP: usize = 50;

/// Acceptance count at which the personalization bonus saturates.
pub const SATURATION_COUNT: u32 = 10;

/// One accepted correction pattern for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPatternRecord {
    /// The token the user originally typed.
    pub original: String,
    /// The suggestion the user accepted.
    pub selected: String,
    /// How many times the user accepted this correction.
    pub count: u32,
    /// Bounded FIFO of context signatures seen with this pattern.
    pub contexts: VecDeque<u64>,
    /// When this pattern was last reinforced.
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct UserHistory {
    /// original → selected → record
    patterns: AHashMap<String, AHashMap<String, UserPatternRecord>>,
}

impl UserHistory {
    fn record(&mut self, original: &str, selected: &str, context_signature: u64) {
        let record = self
            .patterns
            .entry(original.to_string())
            .or_default()
            .entry(selected.to_string())
            .or_insert_with(|| UserPatternRecord {
                original: original.to_string(),
                selected: selected.to_string(),
                count: 0,
                contexts: VecDeque::new(),
                last_used: Utc::now(),
            });

        record.count += 1;
        record.contexts.push_back(context_signature);
        while record.contexts.len() > CONTEXT_HISTORY_CAP {
            record.contexts.pop_front();
        }
        record.last_used = Utc::now();
    }

    fn export(&self) -> Vec<UserPatternRecord> {
        let mut records: Vec<UserPatternRecord> = self
            .patterns
            .values()
            .flat_map(|selections| selections.values().cloned())
            .collect();
        records.sort_by(|a, b| {
            a.original
                .cmp(&b.original)
                .then_with(|| a.selected.cmp(&b.selected))
        });
        records
    }
}

/// Store of accepted-correction patterns, keyed by user identity.
///
/// Updates to one user are totally ordered through a per-user lock; distinct
/// users mutate independently. Nothing decays or expires automatically;
/// `last_used` is exposed so a host can apply its own staleness policy
/// through the reset hook.
#[derive(Debug, Default)]
pub struct PersonalizationStore {
    users: RwLock<AHashMap<String, Arc<Mutex<UserHistory>>>>,
}

impl PersonalizationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        PersonalizationStore::default()
    }

    /// Record that `user_id` accepted `selected` as the correction of
    /// `original` in the context identified by `context_signature`.
    pub fn record(
        &self,
        user_id: &str,
        original: &str,
        selected: &str,
        context_signature: u64,
    ) -> Result<()> {
        if user_id.is_empty() {
            return Err(SibylError::invalid_argument("user_id must not be empty"));
        }
        if original.is_empty() || selected.is_empty() {
            return Err(SibylError::invalid_argument(
                "original and selected words must not be empty",
            ));
        }

        let history = {
            let users = self.users.read();
            users.get(user_id).cloned()
        };
        let history = match history {
            Some(history) => history,
            None => {
                let mut users = self.users.write();
                users
                    .entry(user_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(UserHistory::default())))
                    .clone()
            }
        };

        history.lock().record(original, selected, context_signature);
        Ok(())
    }

    /// Accepted corrections of `original` for `user_id`, as selected word →
    /// acceptance count. Empty when there is no history.
    pub fn lookup(&self, user_id: &str, original: &str) -> AHashMap<String, u32> {
        let history = {
            let users = self.users.read();
            users.get(user_id).cloned()
        };
        let Some(history) = history else {
            return AHashMap::new();
        };

        let history = history.lock();
        history
            .patterns
            .get(original)
            .map(|selections| {
                selections
                    .iter()
                    .map(|(word, record)| (word.clone(), record.count))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Personalization bonus for an acceptance count, saturating at 1.0.
    pub fn personalization_term(count: u32) -> f64 {
        (count as f64 / SATURATION_COUNT as f64).min(1.0)
    }

    /// Drop all history for a user. Returns whether the user existed.
    pub fn reset_user(&self, user_id: &str) -> bool {
        self.users.write().remove(user_id).is_some()
    }

    /// Number of users with recorded history.
    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    /// Export every user's pattern records as JSON.
    pub fn export_json(&self) -> Result<String> {
        let users: Vec<(String, Arc<Mutex<UserHistory>>)> = {
            let users = self.users.read();
            users
                .iter()
                .map(|(id, history)| (id.clone(), history.clone()))
                .collect()
        };

        let mut export: Vec<(String, Vec<UserPatternRecord>)> = users
            .into_iter()
            .map(|(id, history)| {
                let records = history.lock().export();
                (id, records)
            })
            .collect();
        export.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Replace the store contents with a previously exported payload.
    pub fn import_json(&self, json: &str) -> Result<()> {
        let imported: Vec<(String, Vec<UserPatternRecord>)> = serde_json::from_str(json)?;

        let mut users = AHashMap::new();
        for (user_id, records) in imported {
            if user_id.is_empty() {
                return Err(SibylError::invalid_argument(
                    "imported user_id must not be empty",
                ));
            }
            let mut history = UserHistory::default();
            for record in records {
                if record.count == 0 {
                    return Err(SibylError::invalid_argument(format!(
                        "imported record for '{}' has zero count",
                        record.original
                    )));
                }
                history
                    .patterns
                    .entry(record.original.clone())
                    .or_default()
                    .insert(record.selected.clone(), record);
            }
            users.insert(user_id, Arc::new(Mutex::new(history)));
        }

        *self.users.write() = users;
        Ok(())
    }
}
