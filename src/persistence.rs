//! Persistence adapter: the task collection and settings records on top of a
//! [`KeyValueStore`].
//!
//! Persistence mirrors the store's state and is never the source of truth
//! during a session, only at startup. Every operation here is best-effort:
//! failures are logged and swallowed so a user-facing mutation never fails
//! because storage did. `import_data` is the one operation that reports an
//! outcome, and only for input that is not JSON at all.
//!
//! Records are decoded into typed structs. A record with any shape mismatch
//! reads exactly like a missing one.

use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::kv::KeyValueStore;
use crate::task::{Settings, Task};

/// Storage key of the task collection
pub const TASKS_KEY: &str = "todos";

/// Storage key of the settings record
pub const SETTINGS_KEY: &str = "appSettings";

/// Older export documents used `tasks` for the collection.
const LEGACY_TASKS_FIELD: &str = "tasks";

pub trait Persistence {
    /// Stored tasks; empty when absent, malformed or unavailable
    fn read_tasks(&self) -> Vec<Task>;

    /// Overwrite the stored collection
    fn write_tasks(&self, tasks: &[Task]);

    /// Stored settings; defaults when absent, malformed or unavailable
    fn read_settings(&self) -> Settings;

    /// Overwrite the stored settings record
    fn write_settings(&self, settings: &Settings);

    /// Remove both records
    fn clear_all(&self);

    /// Pretty-printed `{ "todos": [...], "settings": {...} }`
    fn export_data(&self) -> String;

    /// Apply an export document; false only when `doc` cannot be parsed
    fn import_data(&self, doc: &str) -> bool;
}

impl<P: Persistence + ?Sized> Persistence for &P {
    fn read_tasks(&self) -> Vec<Task> {
        (**self).read_tasks()
    }
    fn write_tasks(&self, tasks: &[Task]) {
        (**self).write_tasks(tasks)
    }
    fn read_settings(&self) -> Settings {
        (**self).read_settings()
    }
    fn write_settings(&self, settings: &Settings) {
        (**self).write_settings(settings)
    }
    fn clear_all(&self) {
        (**self).clear_all()
    }
    fn export_data(&self) -> String {
        (**self).export_data()
    }
    fn import_data(&self, doc: &str) -> bool {
        (**self).import_data(doc)
    }
}

impl<P: Persistence + ?Sized> Persistence for Rc<P> {
    fn read_tasks(&self) -> Vec<Task> {
        (**self).read_tasks()
    }
    fn write_tasks(&self, tasks: &[Task]) {
        (**self).write_tasks(tasks)
    }
    fn read_settings(&self) -> Settings {
        (**self).read_settings()
    }
    fn write_settings(&self, settings: &Settings) {
        (**self).write_settings(settings)
    }
    fn clear_all(&self) {
        (**self).clear_all()
    }
    fn export_data(&self) -> String {
        (**self).export_data()
    }
    fn import_data(&self, doc: &str) -> bool {
        (**self).import_data(doc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageStatus {
    Available,
    Unavailable,
}

/// Export document shape
#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    todos: &'a [Task],
    settings: &'a Settings,
}

/// [`Persistence`] over a key-value backend, or over nothing at all.
#[derive(Debug)]
pub struct LocalPersistence<S> {
    backend: Option<S>,
}

impl<S: KeyValueStore> LocalPersistence<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// No durable store: reads return empty/default, writes are no-ops
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn storage_status(&self) -> StorageStatus {
        if self.backend.is_some() {
            StorageStatus::Available
        } else {
            StorageStatus::Unavailable
        }
    }

    fn backend_or_err(&self) -> Result<&S> {
        self.backend
            .as_ref()
            .ok_or_else(|| Error::StorageUnavailable("no durable store attached".to_string()))
    }

    /// Typed read of the task record; `Ok(None)` when absent
    pub fn load_tasks(&self) -> Result<Option<Vec<Task>>> {
        let Some(raw) = self.backend_or_err()?.get(TASKS_KEY)? else {
            return Ok(None);
        };
        decode_tasks(&raw).map(Some)
    }

    /// Typed read of the settings record; `Ok(None)` when absent
    pub fn load_settings(&self) -> Result<Option<Settings>> {
        let Some(raw) = self.backend_or_err()?.get(SETTINGS_KEY)? else {
            return Ok(None);
        };
        decode_settings(&raw).map(Some)
    }

    fn store_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let backend = self.backend_or_err()?;
        let json = serde_json::to_string(value)?;
        backend.set(key, &json)
    }

    fn clear_records(&self) -> Result<()> {
        let backend = self.backend_or_err()?;
        backend.remove(TASKS_KEY)?;
        backend.remove(SETTINGS_KEY)?;
        Ok(())
    }
}

impl<S: KeyValueStore> Persistence for LocalPersistence<S> {
    fn read_tasks(&self) -> Vec<Task> {
        match self.load_tasks() {
            Ok(Some(tasks)) => {
                debug!(count = tasks.len(), "loaded tasks");
                tasks
            }
            Ok(None) => Vec::new(),
            Err(Error::StorageUnavailable(reason)) => {
                debug!(%reason, "tasks read skipped");
                Vec::new()
            }
            Err(err) => {
                warn!(key = TASKS_KEY, error = %err, "discarding unreadable tasks record");
                Vec::new()
            }
        }
    }

    fn write_tasks(&self, tasks: &[Task]) {
        if let Err(err) = self.store_json(TASKS_KEY, tasks) {
            report_write_failure(TASKS_KEY, &err);
        }
    }

    fn read_settings(&self) -> Settings {
        match self.load_settings() {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(Error::StorageUnavailable(reason)) => {
                debug!(%reason, "settings read skipped");
                Settings::default()
            }
            Err(err) => {
                warn!(key = SETTINGS_KEY, error = %err, "discarding unreadable settings record");
                Settings::default()
            }
        }
    }

    fn write_settings(&self, settings: &Settings) {
        if let Err(err) = self.store_json(SETTINGS_KEY, settings) {
            report_write_failure(SETTINGS_KEY, &err);
        }
    }

    fn clear_all(&self) {
        if let Err(err) = self.clear_records() {
            report_write_failure("*", &err);
        }
    }

    fn export_data(&self) -> String {
        let todos = self.read_tasks();
        let settings = self.read_settings();
        let document = ExportDocument {
            todos: &todos,
            settings: &settings,
        };
        match serde_json::to_string_pretty(&document) {
            Ok(json) => json,
            Err(err) => {
                error!(error = %err, "failed to serialize export document");
                String::from("{}")
            }
        }
    }

    fn import_data(&self, doc: &str) -> bool {
        let parsed: Value = match serde_json::from_str(doc) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "import rejected: not JSON");
                return false;
            }
        };
        if parsed.is_null() {
            warn!("import rejected: document is null");
            return false;
        }

        let todos = parsed
            .get(TASKS_KEY)
            .or_else(|| parsed.get(LEGACY_TASKS_FIELD));
        match todos {
            Some(value) if value.is_array() => match decode_tasks_value(value.clone()) {
                Ok(tasks) => {
                    debug!(count = tasks.len(), "importing tasks");
                    self.write_tasks(&tasks);
                }
                Err(err) => warn!(error = %err, "import skipped tasks"),
            },
            Some(Value::Null) | None => {}
            Some(_) => warn!("import skipped tasks: not an array"),
        }

        match parsed.get("settings") {
            Some(value) if value.is_object() => match decode_settings_value(value.clone()) {
                Ok(settings) => self.write_settings(&settings),
                Err(err) => warn!(error = %err, "import skipped settings"),
            },
            Some(Value::Null) | Some(Value::Bool(false)) | None => {}
            Some(_) => warn!("import skipped settings: not an object"),
        }

        true
    }
}

fn report_write_failure(key: &str, err: &Error) {
    match err {
        Error::StorageUnavailable(reason) => debug!(key, %reason, "write skipped"),
        other => error!(key, error = %other, "failed to persist record"),
    }
}

/// Decode and validate a stored task collection
pub fn decode_tasks(raw: &str) -> Result<Vec<Task>> {
    let tasks: Vec<Task> = serde_json::from_str(raw).map_err(|err| malformed(TASKS_KEY, err))?;
    validate_tasks(&tasks)?;
    Ok(tasks)
}

fn decode_tasks_value(value: Value) -> Result<Vec<Task>> {
    let tasks: Vec<Task> =
        serde_json::from_value(value).map_err(|err| malformed(TASKS_KEY, err))?;
    validate_tasks(&tasks)?;
    Ok(tasks)
}

/// Decode a stored settings record
pub fn decode_settings(raw: &str) -> Result<Settings> {
    serde_json::from_str(raw).map_err(|err| malformed(SETTINGS_KEY, err))
}

fn decode_settings_value(value: Value) -> Result<Settings> {
    serde_json::from_value(value).map_err(|err| malformed(SETTINGS_KEY, err))
}

fn validate_tasks(tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::new();
    for task in tasks {
        if task.id.trim().is_empty() {
            return Err(malformed(TASKS_KEY, "task with empty id"));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(malformed(TASKS_KEY, format!("duplicate task id {}", task.id)));
        }
        if task.title.trim().is_empty() {
            return Err(malformed(TASKS_KEY, format!("task {} has an empty title", task.id)));
        }
        if task.updated_at < task.created_at {
            return Err(malformed(
                TASKS_KEY,
                format!("task {} was updated before it was created", task.id),
            ));
        }
    }
    Ok(())
}

fn malformed(key: &str, reason: impl ToString) -> Error {
    Error::MalformedRecord {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use crate::task::{NewTask, Priority, Theme};
    use chrono::{TimeZone, Utc};

    fn sample_task(title: &str) -> Task {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Task::create(NewTask::new(title, Priority::Medium), now).unwrap()
    }

    #[test]
    fn missing_records_read_as_defaults() {
        let persistence = LocalPersistence::new(MemoryStore::new());
        assert!(persistence.read_tasks().is_empty());
        assert_eq!(persistence.read_settings(), Settings::default());
    }

    #[test]
    fn unavailable_storage_is_a_silent_no_op() {
        let persistence = LocalPersistence::<MemoryStore>::unavailable();
        persistence.write_tasks(&[sample_task("a")]);
        persistence.write_settings(&Settings {
            is_admin: true,
            theme: Theme::Dark,
        });
        persistence.clear_all();
        assert!(persistence.read_tasks().is_empty());
        assert_eq!(persistence.read_settings(), Settings::default());
        assert_eq!(persistence.storage_status(), StorageStatus::Unavailable);
    }

    #[test]
    fn tasks_round_trip_with_dates() {
        let persistence = LocalPersistence::new(MemoryStore::new());
        let mut task = sample_task("with due");
        task.due_date = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        persistence.write_tasks(&[task.clone()]);
        assert_eq!(persistence.read_tasks(), vec![task]);
    }

    #[test]
    fn malformed_json_reads_as_empty() {
        let store = MemoryStore::new()
            .with_entry(TASKS_KEY, "{not json")
            .with_entry(SETTINGS_KEY, "[]");
        let persistence = LocalPersistence::new(store);
        assert!(persistence.read_tasks().is_empty());
        assert_eq!(persistence.read_settings(), Settings::default());
    }

    #[test]
    fn shape_mismatch_rejects_whole_record() {
        let good = serde_json::to_value(sample_task("ok")).unwrap();
        let mut bad = serde_json::to_value(sample_task("bad")).unwrap();
        bad["priority"] = Value::from("urgent");
        let raw = serde_json::to_string(&vec![good, bad]).unwrap();
        assert!(matches!(
            decode_tasks(&raw),
            Err(Error::MalformedRecord { .. })
        ));
    }

    #[test]
    fn duplicate_ids_are_malformed() {
        let task = sample_task("twice");
        let raw = serde_json::to_string(&vec![task.clone(), task]).unwrap();
        assert!(decode_tasks(&raw).is_err());
    }

    #[test]
    fn settings_fill_missing_fields() {
        let settings = decode_settings(r#"{"isAdmin":true}"#).unwrap();
        assert!(settings.is_admin);
        assert_eq!(settings.theme, Theme::Light);
        assert!(decode_settings(r#"{"isAdmin":"yes"}"#).is_err());
        assert!(decode_settings(r#"{"theme":"sepia"}"#).is_err());
    }

    #[test]
    fn failed_write_keeps_previous_record() {
        let store = Rc::new(MemoryStore::new());
        let persistence = LocalPersistence::new(Rc::clone(&store));
        persistence.write_tasks(&[sample_task("kept")]);
        store.set_fail_writes(true);
        persistence.write_tasks(&[]);
        assert_eq!(persistence.read_tasks().len(), 1);
    }

    #[test]
    fn import_rejects_non_json_without_writing() {
        let store = Rc::new(MemoryStore::new());
        let persistence = LocalPersistence::new(Rc::clone(&store));
        assert!(!persistence.import_data("not json"));
        assert!(!persistence.import_data("null"));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn import_applies_partial_documents() {
        let store = Rc::new(MemoryStore::new());
        let persistence = LocalPersistence::new(Rc::clone(&store));
        persistence.write_tasks(&[sample_task("existing")]);

        assert!(persistence.import_data(r#"{"settings":{"isAdmin":true,"theme":"dark"}}"#));
        assert_eq!(persistence.read_tasks().len(), 1);
        assert!(persistence.read_settings().is_admin);

        assert!(persistence.import_data(r#"{"todos":[],"extra":1}"#));
        assert!(persistence.read_tasks().is_empty());
        assert_eq!(persistence.read_settings().theme, Theme::Dark);
    }

    #[test]
    fn import_accepts_legacy_tasks_field() {
        let persistence = LocalPersistence::new(MemoryStore::new());
        let doc = serde_json::json!({ "tasks": [sample_task("legacy")] }).to_string();
        assert!(persistence.import_data(&doc));
        assert_eq!(persistence.read_tasks()[0].title, "legacy");
    }

    #[test]
    fn import_skips_invalid_parts() {
        let persistence = LocalPersistence::new(MemoryStore::new());
        persistence.write_tasks(&[sample_task("stays")]);
        assert!(persistence.import_data(r#"{"todos":[{"id":1}],"settings":"dark"}"#));
        assert_eq!(persistence.read_tasks()[0].title, "stays");
        assert_eq!(persistence.read_settings(), Settings::default());
    }

    #[test]
    fn export_is_pretty_with_two_space_indent() {
        let persistence = LocalPersistence::new(MemoryStore::new());
        persistence.write_tasks(&[sample_task("exported")]);
        let doc = persistence.export_data();
        assert!(doc.starts_with("{\n  \"todos\": [\n    {"));
        let value: Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(value["settings"]["isAdmin"], false);
        assert_eq!(value["settings"]["theme"], "light");
    }

    #[test]
    fn export_then_import_is_stable() {
        let store = Rc::new(MemoryStore::new());
        let persistence = LocalPersistence::new(Rc::clone(&store));
        persistence.write_tasks(&[sample_task("one"), sample_task("two")]);
        persistence.write_settings(&Settings {
            is_admin: true,
            theme: Theme::Dark,
        });
        let tasks_before: Value = serde_json::from_str(&store.raw(TASKS_KEY).unwrap()).unwrap();
        let settings_before: Value =
            serde_json::from_str(&store.raw(SETTINGS_KEY).unwrap()).unwrap();

        assert!(persistence.import_data(&persistence.export_data()));

        let tasks_after: Value = serde_json::from_str(&store.raw(TASKS_KEY).unwrap()).unwrap();
        let settings_after: Value =
            serde_json::from_str(&store.raw(SETTINGS_KEY).unwrap()).unwrap();
        assert_eq!(tasks_before, tasks_after);
        assert_eq!(settings_before, settings_after);
    }

    #[test]
    fn clear_all_removes_both_records() {
        let store = Rc::new(MemoryStore::new());
        let persistence = LocalPersistence::new(Rc::clone(&store));
        persistence.write_tasks(&[sample_task("x")]);
        persistence.write_settings(&Settings::default());
        persistence.clear_all();
        assert!(store.raw(TASKS_KEY).is_none());
        assert!(store.raw(SETTINGS_KEY).is_none());
    }
}
