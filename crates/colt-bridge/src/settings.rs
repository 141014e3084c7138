//! Persisted user state: the security token and the auto-run preference.

use std::fs;
use std::io;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Values remembered between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Token issued by `obtainAuthToken`; absent until authorised.
    pub security_token: Option<String>,
    /// Start a live compilation right after opening a project.
    pub auto_run: bool,
}

/// Errors raised while loading or saving [`Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the settings file failed.
    #[error("failed to access settings file {path}: {source}")]
    Io {
        /// Settings file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The settings file did not contain valid JSON.
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        /// Settings file path.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Loads and saves [`Settings`].
pub trait TokenStore {
    /// Reads the stored settings; missing storage yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when existing storage cannot be read.
    fn load(&self) -> Result<Settings, SettingsError>;

    /// Replaces the stored settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the storage cannot be written.
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Stores settings as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Utf8PathBuf,
}

impl JsonFileStore {
    /// Stores settings at `path`.
    #[must_use]
    pub const fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    /// Location of the settings file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for JsonFileStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(Settings::default());
            }
            Err(error) => return Err(self.io_error(error)),
        };
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| self.io_error(error))?;
        }
        let text = serde_json::to_string_pretty(settings).map_err(|source| {
            SettingsError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, text).map_err(|error| self.io_error(error))
    }
}

/// Keeps settings in memory; clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    settings: Arc<Mutex<Settings>>,
}

impl MemoryStore {
    /// Starts with `settings`.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(Mutex::new(settings)),
        }
    }

    /// Snapshot of the stored value.
    #[must_use]
    pub fn snapshot(&self) -> Settings {
        self.settings
            .lock()
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }
}

impl TokenStore for MemoryStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.snapshot())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Ok(mut stored) = self.settings.lock() {
            settings.clone_into(&mut stored);
        }
        Ok(())
    }
}
