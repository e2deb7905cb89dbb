//! Saved-run persistence.
//!
//! [`RunStore`] owns the list of saved runs and mirrors it into an
//! [`eframe::Storage`] under [`RUNS_STORAGE_KEY`]. Every mutation applies the
//! retention caps immediately, so the in-memory list always equals what the
//! next write puts into storage; the write itself is debounced and only
//! happens once the store has been idle for [`PERSIST_DEBOUNCE_SECS`].

use crate::constants::{
    EMERGENCY_SAVED_RUNS, MAX_RUNS_STORAGE_BYTES, MAX_SAVED_RUNS, PERSIST_DEBOUNCE_SECS,
    RUNS_EXPORT_VERSION, RUNS_STORAGE_KEY,
};
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while encoding or decoding runs.
#[derive(Debug, Error)]
pub enum RunStoreError {
    /// The runs could not be serialized or the input is not valid run JSON
    #[error("invalid run data: {0}")]
    Json(#[from] serde_json::Error),
    /// The export file was written by a newer version of the tool
    #[error("unsupported run file version {0}")]
    UnsupportedVersion(u32),
}

/// Retention limits applied on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Maximum number of runs kept
    pub max_runs: usize,
    /// Smaller cap used when the serialized list is too large
    pub emergency_runs: usize,
    /// Serialized size that triggers the emergency cap
    pub max_bytes: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_runs: MAX_SAVED_RUNS,
            emergency_runs: EMERGENCY_SAVED_RUNS,
            max_bytes: MAX_RUNS_STORAGE_BYTES,
        }
    }
}

/// Versioned envelope used by exported run files.
#[derive(Debug, Serialize, Deserialize)]
struct RunsFile {
    version: u32,
    runs: Vec<SavedRun>,
}

/// Stored layouts accepted when reading runs back.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRuns {
    /// Plain array, as written to eframe storage
    Bare(Vec<SavedRun>),
    /// Export envelope
    Versioned(RunsFile),
}

/// Parses runs from either the storage layout or an export file.
pub fn parse_runs(text: &str) -> Result<Vec<SavedRun>, RunStoreError> {
    match serde_json::from_str::<StoredRuns>(text) {
        Ok(StoredRuns::Bare(runs)) => Ok(runs),
        Ok(StoredRuns::Versioned(file)) if file.version <= RUNS_EXPORT_VERSION => Ok(file.runs),
        Ok(StoredRuns::Versioned(file)) => Err(RunStoreError::UnsupportedVersion(file.version)),
        // Re-parse as the plain layout to get a meaningful error message.
        Err(_) => Ok(serde_json::from_str::<Vec<SavedRun>>(text)?),
    }
}

/// The saved runs of the tool plus their pending storage write.
#[derive(Debug, Default)]
pub struct RunStore {
    runs: Vec<SavedRun>,
    limits: RunLimits,
    /// Time the last unflushed mutation happened and the JSON it produced
    pending: Option<(f64, String)>,
}

impl RunStore {
    /// Creates an empty store with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with custom limits.
    pub fn with_limits(limits: RunLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Loads runs from `storage`. Missing or corrupt data yields an empty store.
    pub fn load(storage: Option<&dyn eframe::Storage>) -> Self {
        let mut store = Self::new();
        let Some(text) = storage.and_then(|s| s.get_string(RUNS_STORAGE_KEY)) else {
            return store;
        };
        match parse_runs(&text) {
            Ok(runs) => {
                store.runs = runs;
                store.runs.truncate(store.limits.max_runs);
                log::info!("Loaded {} saved runs", store.runs.len());
            }
            Err(err) => {
                log::warn!("Ignoring unreadable saved runs: {err}");
            }
        }
        store
    }

    /// All runs, most recent first.
    pub fn runs(&self) -> &[SavedRun] {
        &self.runs
    }

    /// Runs currently marked visible.
    pub fn visible_runs(&self) -> impl Iterator<Item = &SavedRun> {
        self.runs.iter().filter(|r| r.visible)
    }

    /// Looks up a run by id.
    pub fn get(&self, id: RunId) -> Option<&SavedRun> {
        self.runs.iter().find(|r| r.id == id)
    }

    /// Number of stored runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns true if there are no stored runs.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Returns true while a write is waiting for the debounce delay.
    pub fn has_pending_write(&self) -> bool {
        self.pending.is_some()
    }

    /// Saves a new visible run at the front of the list.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name
    /// * `result` - The computation to snapshot
    /// * `custom_points` - Custom points to store alongside the sequence
    /// * `created_at` - Timestamp recorded on the run
    /// * `now` - Current UI time in seconds, used for debouncing
    pub fn save_run(
        &mut self,
        name: String,
        result: &SequenceResult,
        custom_points: Vec<CustomPoint>,
        created_at: DateTime<Utc>,
        now: f64,
    ) -> RunId {
        let run = SavedRun::new(
            name,
            result.statistics,
            result.sequence.clone(),
            custom_points,
            created_at,
        );
        let id = run.id;
        self.runs.insert(0, run);
        self.commit(now);
        id
    }

    /// Flips the overlay visibility of a run. Returns false if the id is unknown.
    pub fn toggle_visibility(&mut self, id: RunId, now: f64) -> bool {
        let Some(run) = self.runs.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        run.visible = !run.visible;
        self.commit(now);
        true
    }

    /// Renames a run. Returns false if the id is unknown.
    pub fn rename(&mut self, id: RunId, name: String, now: f64) -> bool {
        let Some(run) = self.runs.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        run.name = name;
        self.commit(now);
        true
    }

    /// Deletes a run. Returns false if the id is unknown.
    pub fn delete(&mut self, id: RunId, now: f64) -> bool {
        let before = self.runs.len();
        self.runs.retain(|r| r.id != id);
        if self.runs.len() == before {
            return false;
        }
        self.commit(now);
        true
    }

    /// Removes every run.
    pub fn clear(&mut self, now: f64) {
        self.runs.clear();
        self.commit(now);
    }

    /// Serializes the runs into the versioned export format.
    pub fn export_json(&self) -> Result<String, RunStoreError> {
        let file = RunsFile {
            version: RUNS_EXPORT_VERSION,
            runs: self.runs.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Merges runs from an export file (or a bare run array) into the store.
    ///
    /// Runs whose id is already present are skipped. Imported runs are placed
    /// at the front in file order, then the retention caps apply. Returns the
    /// number of runs added.
    pub fn import_json(&mut self, text: &str, now: f64) -> Result<usize, RunStoreError> {
        let incoming = parse_runs(text)?;
        let mut seen: HashSet<RunId> = self.runs.iter().map(|r| r.id).collect();
        let mut added: Vec<SavedRun> = incoming
            .into_iter()
            .filter(|run| seen.insert(run.id))
            .collect();
        let count = added.len();
        if count > 0 {
            added.append(&mut self.runs);
            self.runs = added;
            self.commit(now);
        }
        Ok(count)
    }

    /// Applies the retention caps and returns the JSON to persist.
    fn enforce_limits(&mut self) -> Result<String, RunStoreError> {
        self.runs.truncate(self.limits.max_runs);
        let json = serde_json::to_string(&self.runs)?;
        if json.len() <= self.limits.max_bytes {
            return Ok(json);
        }
        log::warn!(
            "Saved runs take {} bytes (limit {}), keeping only the {} most recent",
            json.len(),
            self.limits.max_bytes,
            self.limits.emergency_runs
        );
        self.runs.truncate(self.limits.emergency_runs);
        Ok(serde_json::to_string(&self.runs)?)
    }

    fn commit(&mut self, now: f64) {
        match self.enforce_limits() {
            Ok(json) => self.pending = Some((now, json)),
            Err(err) => log::error!("Failed to serialize saved runs: {err}"),
        }
    }

    /// Seconds until the pending write is due, if there is one.
    pub fn next_flush_in(&self, now: f64) -> Option<f64> {
        self.pending
            .as_ref()
            .map(|(since, _)| (since + PERSIST_DEBOUNCE_SECS - now).max(0.0))
    }

    /// Writes the pending runs once the debounce delay has elapsed. Returns true if written.
    pub fn flush_if_due(&mut self, now: f64, storage: &mut dyn eframe::Storage) -> bool {
        match &self.pending {
            Some((since, _)) if now - since >= PERSIST_DEBOUNCE_SECS => self.flush(storage),
            _ => false,
        }
    }

    /// Writes any pending runs immediately. Returns true if something was written.
    pub fn flush(&mut self, storage: &mut dyn eframe::Storage) -> bool {
        let Some((_, json)) = self.pending.take() else {
            return false;
        };
        storage.set_string(RUNS_STORAGE_KEY, json);
        storage.flush();
        log::debug!("Persisted {} saved runs", self.runs.len());
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory stand-in for eframe's key-value storage.
    #[derive(Default)]
    pub(crate) struct MemoryStorage {
        pub values: HashMap<String, String>,
        pub flushes: usize,
    }

    impl eframe::Storage for MemoryStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.values.get(key).cloned()
        }

        fn set_string(&mut self, key: &str, value: String) {
            self.values.insert(key.to_string(), value);
        }

        fn flush(&mut self) {
            self.flushes += 1;
        }
    }

    fn result(x: f64) -> SequenceResult {
        SequenceResult {
            statistics: FineTuneStatistics {
                count: 1,
                mean_x: x,
                ..Default::default()
            },
            sequence: vec![GeneratedPoint { x, y: 0.0, heading: 0.0 }],
        }
    }

    fn stored(storage: &MemoryStorage) -> Vec<SavedRun> {
        parse_runs(&storage.values[RUNS_STORAGE_KEY]).unwrap()
    }

    #[test]
    fn test_save_prepends_and_debounces() {
        let mut store = RunStore::new();
        let mut storage = MemoryStorage::default();
        let first = store.save_run("a".into(), &result(1.0), Vec::new(), Utc::now(), 0.0);
        let second = store.save_run("b".into(), &result(2.0), Vec::new(), Utc::now(), 0.1);
        assert_eq!(store.runs()[0].id, second);
        assert_eq!(store.runs()[1].id, first);
        assert!(store.runs().iter().all(|r| r.visible));

        assert!(!store.flush_if_due(0.2, &mut storage));
        assert!(storage.values.is_empty());
        assert!(store.flush_if_due(1.0, &mut storage));
        assert_eq!(stored(&storage), store.runs());
        assert!(!store.has_pending_write());
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let mut store = RunStore::new();
        let mut storage = MemoryStorage::default();
        let ids: Vec<RunId> = (0..MAX_SAVED_RUNS + 5)
            .map(|i| store.save_run(format!("run {i}"), &result(i as f64), Vec::new(), Utc::now(), 0.0))
            .collect();
        assert_eq!(store.len(), MAX_SAVED_RUNS);
        let expected: Vec<RunId> = ids.iter().rev().take(MAX_SAVED_RUNS).copied().collect();
        let actual: Vec<RunId> = store.runs().iter().map(|r| r.id).collect();
        assert_eq!(actual, expected);
        store.flush(&mut storage);
        assert_eq!(stored(&storage).len(), MAX_SAVED_RUNS);
    }

    #[test]
    fn test_oversized_runs_fall_back_to_emergency_cap() {
        let limits = RunLimits {
            max_runs: 10,
            emergency_runs: 2,
            max_bytes: 800,
        };
        let mut store = RunStore::with_limits(limits);
        let mut storage = MemoryStorage::default();
        for i in 0..6 {
            store.save_run(format!("run {i}"), &result(i as f64), Vec::new(), Utc::now(), 0.0);
        }
        assert_eq!(store.len(), 2);
        assert_eq!(store.runs()[0].name, "run 5");
        store.flush(&mut storage);
        assert_eq!(stored(&storage), store.runs());
    }

    #[test]
    fn test_toggle_rename_delete() {
        let mut store = RunStore::new();
        let id = store.save_run("a".into(), &result(1.0), Vec::new(), Utc::now(), 0.0);
        assert!(store.toggle_visibility(id, 0.0));
        assert!(!store.get(id).unwrap().visible);
        assert_eq!(store.visible_runs().count(), 0);
        assert!(store.rename(id, "renamed".into(), 0.0));
        assert_eq!(store.get(id).unwrap().name, "renamed");
        assert!(store.delete(id, 0.0));
        assert!(store.is_empty());
        assert!(!store.delete(id, 0.0));
        assert!(!store.toggle_visibility(RunId::nil(), 0.0));
    }

    #[test]
    fn test_corrupt_storage_is_empty() {
        let mut storage = MemoryStorage::default();
        storage.values.insert(RUNS_STORAGE_KEY.into(), "{not json".into());
        let store = RunStore::load(Some(&storage as &dyn eframe::Storage));
        assert!(store.is_empty());

        storage.values.insert(RUNS_STORAGE_KEY.into(), r#"{"foreign": true}"#.into());
        assert!(RunStore::load(Some(&storage as &dyn eframe::Storage)).is_empty());
        assert!(RunStore::load(None).is_empty());
    }

    #[test]
    fn test_load_round_trips_storage() {
        let mut store = RunStore::new();
        let mut storage = MemoryStorage::default();
        store.save_run("kept".into(), &result(3.0), vec![CustomPoint::new("p".into(), 0, 5.0)], Utc::now(), 0.0);
        store.flush(&mut storage);
        let loaded = RunStore::load(Some(&storage as &dyn eframe::Storage));
        assert_eq!(loaded.runs(), store.runs());
        assert_eq!(storage.flushes, 1);
    }

    #[test]
    fn test_export_import_merges_new_runs() {
        let mut source = RunStore::new();
        source.save_run("one".into(), &result(1.0), Vec::new(), Utc::now(), 0.0);
        source.save_run("two".into(), &result(2.0), Vec::new(), Utc::now(), 0.0);
        let exported = source.export_json().unwrap();
        assert!(exported.contains("\"version\": 1"));

        let mut target = RunStore::new();
        target.save_run("local".into(), &result(9.0), Vec::new(), Utc::now(), 0.0);
        assert_eq!(target.import_json(&exported, 1.0).unwrap(), 2);
        let names: Vec<&str> = target.runs().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["two", "one", "local"]);
        // Importing again adds nothing.
        assert_eq!(target.import_json(&exported, 2.0).unwrap(), 0);
    }

    #[test]
    fn test_import_skips_repeated_ids_within_file() {
        let mut source = RunStore::new();
        source.save_run("a".into(), &result(1.0), Vec::new(), Utc::now(), 0.0);
        source.save_run("b".into(), &result(2.0), Vec::new(), Utc::now(), 0.0);
        let mut runs = source.runs().to_vec();
        runs.push(runs[0].clone());
        let text = serde_json::to_string(&runs).unwrap();

        let mut target = RunStore::new();
        assert_eq!(target.import_json(&text, 0.0).unwrap(), 2);
        let repeated = runs[0].id;
        assert_eq!(target.runs().iter().filter(|r| r.id == repeated).count(), 1);

        assert!(target.delete(repeated, 1.0));
        assert!(target.get(repeated).is_none());
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn test_import_rejects_bad_input() {
        let mut store = RunStore::new();
        assert!(matches!(store.import_json("[1, 2]", 0.0), Err(RunStoreError::Json(_))));
        assert!(matches!(
            store.import_json(r#"{"version": 99, "runs": []}"#, 0.0),
            Err(RunStoreError::UnsupportedVersion(99))
        ));
        assert!(store.is_empty());
        assert!(!store.has_pending_write());
    }
}
