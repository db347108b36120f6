//! Per-invocation session: data directory, config and the task store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use directories::ProjectDirs;
use tracing::warn;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::kv::FileStore;
use crate::lock::FileLock;
use crate::persistence::{LocalPersistence, StorageStatus};
use crate::store::TaskStore;
use crate::task::timestamp;

pub(crate) type CliStore = TaskStore<LocalPersistence<FileStore>>;

pub(crate) struct Context {
    pub store: CliStore,
    pub config: Config,
    pub data_dir: Option<PathBuf>,
    /// Problems worth surfacing alongside the command's own output
    pub warnings: Vec<String>,
    /// Held until the command finishes so sessions on one directory run
    /// one at a time
    _session: Option<FileLock>,
}

impl Context {
    pub fn storage_status(&self) -> StorageStatus {
        self.store.persistence().storage_status()
    }
}

/// Open the session for `dir`, falling back to the platform data directory.
///
/// A data directory that cannot be opened does not fail the command: the
/// store runs without durable storage and a warning is recorded.
pub(crate) fn load_context(dir: Option<PathBuf>) -> Result<Context> {
    let data_dir = dir.or_else(default_data_dir);
    let mut warnings = Vec::new();

    let Some(data_dir) = data_dir else {
        warnings.push("no data directory available; changes will not be saved".to_string());
        return Ok(Context {
            store: TaskStore::open(LocalPersistence::unavailable()),
            config: Config::default(),
            data_dir: None,
            warnings,
            _session: None,
        });
    };

    let config = load_config(&data_dir, &mut warnings);
    let (persistence, session) = match FileStore::open(&data_dir) {
        Ok(files) => {
            let files = files.with_lock_timeout(config.storage.lock_timeout_ms);
            // Taken before the store loads, so the read is part of the session.
            let session = files.lock_session()?;
            (LocalPersistence::new(files), Some(session))
        }
        Err(err) => {
            warn!(dir = %data_dir.display(), error = %err, "running without durable storage");
            warnings.push(format!("{err}; changes will not be saved"));
            (LocalPersistence::unavailable(), None)
        }
    };

    let mut store = TaskStore::open(persistence);
    store.set_filter(config.view.filter);
    store.set_sort_by(config.view.sort_by);

    Ok(Context {
        store,
        config,
        data_dir: Some(data_dir),
        warnings,
        _session: session,
    })
}

fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "todo").map(|dirs| dirs.data_dir().to_path_buf())
}

fn load_config(data_dir: &Path, warnings: &mut Vec<String>) -> Config {
    Config::load_from_dir(data_dir).unwrap_or_else(|err| {
        warn!(dir = %data_dir.display(), error = %err, "ignoring invalid config");
        warnings.push(format!("{err}; using defaults"));
        Config::default()
    })
}

/// Parse a `--due` value: RFC 3339, or `YYYY-MM-DD` at local midnight.
pub(crate) fn parse_due(value: &str) -> Result<DateTime<Utc>> {
    parse_due_in(value, &Local)
}

pub(crate) fn parse_due_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = timestamp::parse(value) {
        return Ok(parsed);
    }
    let invalid = || {
        Error::InvalidArgument(format!(
            "invalid due date '{value}' (expected YYYY-MM-DD or RFC 3339)"
        ))
    };
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    // Midnight can fall in a DST gap; take the first minute of the day that exists.
    (0..24 * 60)
        .map(|minute| midnight + Duration::minutes(minute))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(invalid)
}
