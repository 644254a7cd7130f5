//! Durable state that carries an import across the reload boundary.
//!
//! The state is written right before the host is asked to reload and read back, exactly once,
//! when the reload completes. It lives in a process-wide key/value [`StateStore`], so it also
//! survives the process being restarted in between.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// The keys used in the [`StateStore`].
pub mod keys {
    /// Whether an import is waiting for the reload to complete.
    pub const IS_PROCESSING: &str = "is_processing";
    /// The record type name.
    pub const SO_NAME: &str = "so_name";
    /// The normalized output folder.
    pub const OUTPUT_FOLDER: &str = "output_folder";
    /// The fetched CSV text. Deleted once consumed.
    pub const CSV_CONTENT: &str = "csv_content";
    /// When the import was suspended.
    pub const STARTED_AT: &str = "started_at";

    pub const ALL: &[&str] = &[IS_PROCESSING, SO_NAME, OUTPUT_FOLDER, CSV_CONTENT, STARTED_AT];
}

/// A durable key/value store.
pub trait StateStore {
    /// Gets the value for a key.
    fn get(&self, key: &str) -> Option<JsonValue>;

    /// Sets the value for a key.
    fn set(&mut self, key: &str, value: JsonValue) -> anyhow::Result<()>;

    /// Removes a key. Removing a missing key is not an error.
    fn delete(&mut self, key: &str) -> anyhow::Result<()>;

    /// Gets a boolean value. Missing or non-boolean values read as `false`.
    fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Gets a string value.
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn set_bool(&mut self, key: &str, value: bool) -> anyhow::Result<()> {
        self.set(key, JsonValue::Bool(value))
    }

    fn set_string(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.set(key, JsonValue::String(value.to_owned()))
    }
}

impl<S: StateStore + ?Sized> StateStore for &mut S {
    fn get(&self, key: &str) -> Option<JsonValue> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: JsonValue) -> anyhow::Result<()> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        (**self).delete(key)
    }
}

/// A [`StateStore`] that only lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, JsonValue>,
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: JsonValue) -> anyhow::Result<()> {
        self.values.insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// A [`StateStore`] backed by a JSON file. Every change is written through immediately.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, JsonValue>,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is treated as an empty store.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("state file {} is not valid", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!("cannot read state file {}", path.display())));
            },
        };

        Ok(Self { path, values })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }

        // the state file is only ever replaced whole
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, serde_json::to_vec_pretty(&self.values)?)
            .with_context(|| format!("cannot write {}", temp.display()))?;
        fs::rename(&temp, &self.path)
            .with_context(|| format!("cannot replace {}", self.path.display()))?;

        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: JsonValue) -> anyhow::Result<()> {
        self.values.insert(key.to_owned(), value);
        self.save()
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }

        Ok(())
    }
}

utils::define_simple_error!(
    /// The pending flag is set but the rest of the state is missing.
    IncompleteState:
    "pending import state is incomplete"
);

/// An import suspended while waiting for the reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    pub record_type_name: String,
    pub output_folder: String,
    pub csv_content: String,
    pub started_at: Option<DateTime<Utc>>,
}

impl PendingImport {
    /// Creates pending state stamped with the current time.
    #[must_use]
    pub fn new(record_type_name: impl Into<String>, output_folder: impl Into<String>, csv_content: impl Into<String>) -> Self {
        Self {
            record_type_name: record_type_name.into(),
            output_folder: output_folder.into(),
            csv_content: csv_content.into(),
            started_at: Some(Utc::now()),
        }
    }

    /// Writes the state and sets the pending flag. The flag is written last.
    pub fn save<S: StateStore + ?Sized>(&self, store: &mut S) -> anyhow::Result<()> {
        store.set_string(keys::SO_NAME, &self.record_type_name)?;
        store.set_string(keys::OUTPUT_FOLDER, &self.output_folder)?;
        store.set_string(keys::CSV_CONTENT, &self.csv_content)?;
        match self.started_at {
            Some(at) => store.set_string(keys::STARTED_AT, &at.to_rfc3339())?,
            None => store.delete(keys::STARTED_AT)?,
        }

        store.set_bool(keys::IS_PROCESSING, true)
    }

    /// Whether an import is pending.
    #[must_use]
    pub fn is_pending<S: StateStore + ?Sized>(store: &S) -> bool {
        store.get_bool(keys::IS_PROCESSING)
    }

    /// Reads the pending state without consuming it.
    pub fn peek<S: StateStore + ?Sized>(store: &S) -> Result<Option<Self>, IncompleteState> {
        if !Self::is_pending(store) {
            return Ok(None);
        }

        let started_at = store.get_string(keys::STARTED_AT)
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(Some(Self {
            record_type_name: store.get_string(keys::SO_NAME).ok_or(IncompleteState)?,
            output_folder: store.get_string(keys::OUTPUT_FOLDER).ok_or(IncompleteState)?,
            csv_content: store.get_string(keys::CSV_CONTENT).ok_or(IncompleteState)?,
            started_at,
        }))
    }

    /// Clears the pending flag and returns the state, if an import was pending.
    ///
    /// The flag is cleared even if the rest of the state turns out to be incomplete,
    /// so a broken state is only reported once.
    pub fn take<S: StateStore + ?Sized>(store: &mut S) -> anyhow::Result<Option<Self>> {
        if !Self::is_pending(store) {
            return Ok(None);
        }

        let pending = Self::peek(store);
        store.set_bool(keys::IS_PROCESSING, false)?;
        Ok(pending?)
    }

    /// Deletes the consumed CSV content.
    pub fn finish<S: StateStore + ?Sized>(store: &mut S) -> anyhow::Result<()> {
        store.delete(keys::CSV_CONTENT)
    }

    /// Removes every pending key.
    pub fn clear<S: StateStore + ?Sized>(store: &mut S) -> anyhow::Result<()> {
        for key in keys::ALL {
            store.delete(key)?;
        }

        Ok(())
    }
}
