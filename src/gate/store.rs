//! Persistence for the settings record and the site salt.

use super::{settings::Settings, token::SiteSalt};
use anyhow::{Context, Result, anyhow};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Mutex, RwLock},
};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// Backing store for the single settings record.
///
/// Reads never take a lock. Writes are last-writer-wins. `site_salt_or_insert`
/// must be an atomic insert-if-absent: every caller gets back the salt that
/// ended up persisted.
pub trait SettingsStore: Send + Sync {
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self) -> Result<Option<Settings>>;

    /// Persisted salt, if one was ever stored.
    ///
    /// # Errors
    /// Returns an error if the storage fails or holds a corrupt salt.
    fn site_salt(&self) -> Result<Option<SiteSalt>>;

    /// Settings and salt from a single read of the record.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn read_record(&self) -> Result<(Option<Settings>, Option<SiteSalt>)> {
        Ok((self.get()?, self.site_salt()?))
    }

    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn put(&self, settings: &Settings) -> Result<()>;

    /// Return the persisted salt, storing `candidate` first if none exists.
    ///
    /// # Errors
    /// Returns an error if the storage fails or holds a corrupt salt.
    fn site_salt_or_insert(&self, candidate: SiteSalt) -> Result<SiteSalt>;
}

/// Settings with defaults applied when no record was ever saved.
///
/// # Errors
/// Returns an error if the store itself fails.
pub fn load_settings(store: &dyn SettingsStore) -> Result<Settings> {
    Ok(settings_or_default(store.get()?))
}

pub(super) fn settings_or_default(settings: Option<Settings>) -> Settings {
    if let Some(settings) = settings {
        settings.normalized()
    } else {
        debug!("No settings record saved yet, using defaults");
        Settings::default()
    }
}

/// Load the salt, generating and persisting one only when none is stored yet.
///
/// # Errors
/// Returns an error if salt generation or the store fails.
pub fn load_site_salt(store: &dyn SettingsStore) -> Result<SiteSalt> {
    if let Some(salt) = store.site_salt()? {
        return Ok(salt);
    }
    store.site_salt_or_insert(SiteSalt::generate()?)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    site_salt: Option<String>,
}

impl Record {
    fn salt(&self) -> Result<Option<SiteSalt>> {
        self.site_salt
            .as_deref()
            .map(|encoded| SiteSalt::from_encoded(encoded).context("stored site salt is corrupt"))
            .transpose()
    }

    fn salt_or_insert(&mut self, candidate: SiteSalt) -> Result<(SiteSalt, bool)> {
        if let Some(salt) = self.salt()? {
            return Ok((salt, false));
        }
        self.site_salt = Some(candidate.encode());
        Ok((candidate, true))
    }
}

/// Process-local store, used by tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    record: RwLock<Record>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            record: RwLock::new(Record {
                settings: Some(settings),
                site_salt: None,
            }),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self) -> Result<Option<Settings>> {
        let record = self
            .record
            .read()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        Ok(record.settings.clone())
    }

    fn site_salt(&self) -> Result<Option<SiteSalt>> {
        self.record
            .read()
            .map_err(|_| anyhow!("settings lock poisoned"))?
            .salt()
    }

    fn read_record(&self) -> Result<(Option<Settings>, Option<SiteSalt>)> {
        let record = self
            .record
            .read()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        Ok((record.settings.clone(), record.salt()?))
    }

    fn put(&self, settings: &Settings) -> Result<()> {
        let mut record = self
            .record
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        record.settings = Some(settings.clone());
        Ok(())
    }

    fn site_salt_or_insert(&self, candidate: SiteSalt) -> Result<SiteSalt> {
        let mut record = self
            .record
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        record.salt_or_insert(candidate).map(|(salt, _)| salt)
    }
}

/// JSON file store. Each write goes to a uniquely named temporary sibling that
/// is renamed over the record, so readers never observe a half written file.
///
/// Read-modify-write cycles hold an exclusive advisory lock on `<path>.lock`,
/// which serializes writers across processes (`blogpass password` next to a
/// running `blogpass serve`). Reads take no lock.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    // Serializes writers within this process before the file lock is taken.
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("settings"));
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn read(&self) -> Result<Record> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Invalid settings file: {}", self.path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Record::default()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read settings file: {}", self.path.display())),
        }
    }

    /// Run `update` on the current record under both locks and persist the
    /// result when it reports a change.
    fn modify<T>(&self, update: impl FnOnce(&mut Record) -> Result<(T, bool)>) -> Result<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("settings lock poisoned"))?;

        let dir = self.parent_dir();
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open {}", lock_path.display()))?;
        // Released when `lock_file` is dropped.
        FileExt::lock_exclusive(&lock_file)
            .with_context(|| format!("Failed to lock {}", lock_path.display()))?;

        let mut record = self.read()?;
        let (value, changed) = update(&mut record)?;
        if changed {
            self.write(&record)?;
        }
        Ok(value)
    }

    fn write(&self, record: &Record) -> Result<()> {
        let dir = self.parent_dir();
        let bytes = serde_json::to_vec_pretty(record).context("Failed to encode settings")?;
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        tmp.write_all(&bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .with_context(|| format!("Failed to write {}", tmp.path().display()))?;
        restrict_permissions(tmp.path())?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn get(&self) -> Result<Option<Settings>> {
        Ok(self.read()?.settings)
    }

    fn site_salt(&self) -> Result<Option<SiteSalt>> {
        self.read()?.salt()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn read_record(&self) -> Result<(Option<Settings>, Option<SiteSalt>)> {
        let record = self.read()?;
        let salt = record.salt()?;
        Ok((record.settings, salt))
    }

    #[instrument(skip(self, settings), fields(path = %self.path.display()))]
    fn put(&self, settings: &Settings) -> Result<()> {
        self.modify(|record| {
            record.settings = Some(settings.clone());
            Ok(((), true))
        })?;
        info!("Settings saved");
        Ok(())
    }

    #[instrument(skip(self, candidate), fields(path = %self.path.display()))]
    fn site_salt_or_insert(&self, candidate: SiteSalt) -> Result<SiteSalt> {
        let (salt, inserted) = self.modify(|record| {
            let (salt, inserted) = record.salt_or_insert(candidate)?;
            Ok(((salt, inserted), inserted))
        })?;
        if inserted {
            info!("Generated new site salt");
        }
        Ok(salt)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
